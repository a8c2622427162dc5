//! 设备节点负载与设备表

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use kobject::{KobjError, Kobject};
use sync::SpinLock;

/// 单个设备节点的负载
#[derive(Debug)]
pub struct BtrfsDevice {
    label: String,
}

impl BtrfsDevice {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }

    /// 设备标签
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// 已挂接设备的表，`devices` 与 `info` 目录共享
#[derive(Default)]
pub struct DeviceTable {
    devices: SpinLock<BTreeMap<String, Arc<Kobject<BtrfsDevice>>>>,
}

impl DeviceTable {
    /// 创建空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 设备数
    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    /// 是否没有设备
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按标签查找
    pub fn get(&self, label: &str) -> Option<Arc<Kobject<BtrfsDevice>>> {
        self.devices.lock().get(label).cloned()
    }

    /// 按标签排序的全部标签
    pub fn labels(&self) -> Vec<String> {
        self.devices.lock().keys().cloned().collect()
    }

    /// 在锁内检查冲突并插入由 `create` 生成的设备
    pub(crate) fn insert_with<F>(
        &self,
        label: &str,
        create: F,
    ) -> Result<Arc<Kobject<BtrfsDevice>>, KobjError>
    where
        F: FnOnce() -> Result<Arc<Kobject<BtrfsDevice>>, KobjError>,
    {
        let mut devices = self.devices.lock();
        if devices.contains_key(label) {
            return Err(KobjError::RegistrationConflict);
        }
        let device = create()?;
        devices.insert(label.to_string(), device.clone());
        Ok(device)
    }

    pub(crate) fn remove(&self, label: &str) -> Option<Arc<Kobject<BtrfsDevice>>> {
        self.devices.lock().remove(label)
    }

    pub(crate) fn restore(&self, device: Arc<Kobject<BtrfsDevice>>) {
        let label = device.payload().label().to_string();
        self.devices.lock().insert(label, device);
    }

    /// 取出全部设备，按标签逆序
    pub(crate) fn drain(&self) -> Vec<Arc<Kobject<BtrfsDevice>>> {
        let mut devices = self.devices.lock();
        let drained = core::mem::take(&mut *devices);
        drained.into_values().rev().collect()
    }
}

/// 把调用者传入的原始标签转为节点名
///
/// 标签可以带 NUL 结尾（截断到第一个 NUL），必须是非空 UTF-8 且不含 `/`。
pub fn parse_label(raw: &[u8]) -> Result<&str, KobjError> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let label = core::str::from_utf8(&raw[..end]).map_err(|_| KobjError::InvalidArgument)?;
    if label.is_empty() || label.contains('/') {
        return Err(KobjError::InvalidArgument);
    }
    Ok(label)
}
