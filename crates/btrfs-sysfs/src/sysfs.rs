//! btrfs sysfs 的生命周期入口

use alloc::sync::Arc;
use alloc::vec::Vec;

use kobject::{
    KobjError, KobjHandle, Kobject, Kset, KsetState, RawKobject, Registry, TopologyBuilder,
    destroy_in_reverse, register_child, unregister_child,
};

use crate::config::SysfsConfig;
use crate::device::{BtrfsDevice, DeviceTable, parse_label};
use crate::ktypes::{
    BTRFS_KTYPE_DEVICE, BTRFS_KTYPE_DEVICES, BTRFS_KTYPE_HEALTH, BTRFS_KTYPE_INFO, DevicesDir,
    HealthDir, InfoDir,
};

/// 已初始化的 btrfs sysfs 子系统
///
/// 由 [`init`] 构造，由 [`BtrfsSysfs::shutdown`] 消耗；所有节点创建都经过它持有的 [`Kset`]。
pub struct BtrfsSysfs {
    kset: Kset,
    devices: Arc<Kobject<DevicesDir>>,
    health: Arc<Kobject<HealthDir>>,
    info: Arc<Kobject<InfoDir>>,
    statics: Vec<Arc<dyn RawKobject>>,
    table: Arc<DeviceTable>,
}

struct StaticTopology {
    devices: Arc<Kobject<DevicesDir>>,
    health: Arc<Kobject<HealthDir>>,
    info: Arc<Kobject<InfoDir>>,
    nodes: Vec<Arc<dyn RawKobject>>,
}

fn build_static(kset: &Kset, table: &Arc<DeviceTable>) -> Result<StaticTopology, KobjError> {
    let mut builder = TopologyBuilder::new(kset);
    let devices = builder.add("devices", &BTRFS_KTYPE_DEVICES, DevicesDir)?;
    let health = builder.add("health", &BTRFS_KTYPE_HEALTH, HealthDir)?;
    let info = builder.add(
        "info",
        &BTRFS_KTYPE_INFO,
        InfoDir {
            table: table.clone(),
        },
    )?;
    kset.mark_ready()?;
    Ok(StaticTopology {
        devices,
        health,
        info,
        nodes: builder.commit(),
    })
}

/// 创建根目录及 `devices`、`health`、`info` 三个子目录
///
/// 任一步失败时已创建的节点按逆序销毁、根目录被移除，宿主命名空间恢复原状。
pub fn init(registry: Arc<dyn Registry>, config: &SysfsConfig) -> Result<BtrfsSysfs, KobjError> {
    let kset = Kset::create_and_add(config.root_name, config.parent, registry)?;
    let table = Arc::new(DeviceTable::new());

    match build_static(&kset, &table) {
        Ok(topology) => {
            log::info!("btrfs: sysfs '{}' ready", kset.name());
            Ok(BtrfsSysfs {
                kset,
                devices: topology.devices,
                health: topology.health,
                info: topology.info,
                statics: topology.nodes,
                table,
            })
        }
        Err(err) => {
            log::warn!("btrfs: sysfs init failed: {}, rolling back", err);
            if let Err(root_err) = kset.unregister() {
                log::error!("btrfs: cannot remove root '{}': {}", kset.name(), root_err);
            }
            Err(err)
        }
    }
}

impl BtrfsSysfs {
    /// 子系统根
    pub fn kset(&self) -> &Kset {
        &self.kset
    }

    /// 根目录句柄
    pub fn root(&self) -> KobjHandle {
        self.kset.root()
    }

    /// `devices` 目录
    pub fn devices_dir(&self) -> &Arc<Kobject<DevicesDir>> {
        &self.devices
    }

    /// `health` 目录
    pub fn health_dir(&self) -> &Arc<Kobject<HealthDir>> {
        &self.health
    }

    /// `info` 目录
    pub fn info_dir(&self) -> &Arc<Kobject<InfoDir>> {
        &self.info
    }

    /// 已挂接的设备数
    pub fn num_devices(&self) -> usize {
        self.table.len()
    }

    /// 按标签查找设备节点
    pub fn device(&self, label: &str) -> Option<Arc<Kobject<BtrfsDevice>>> {
        self.table.get(label)
    }

    /// 已挂接设备的标签，按字典序
    pub fn device_labels(&self) -> Vec<alloc::string::String> {
        self.table.labels()
    }

    /// 在 `devices` 下为 `label` 创建设备节点
    pub fn create_device(&self, label: &[u8]) -> Result<Arc<Kobject<BtrfsDevice>>, KobjError> {
        let label = parse_label(label)?;
        let device = self.table.insert_with(label, || {
            register_child(
                &self.kset,
                &*self.devices,
                label,
                &BTRFS_KTYPE_DEVICE,
                BtrfsDevice::new(label),
            )
        })?;
        log::debug!("btrfs: device '{}' attached", label);
        Ok(device)
    }

    /// 移除 `label` 对应的设备节点
    pub fn kill_device(&self, label: &[u8]) -> Result<(), KobjError> {
        let label = parse_label(label)?;
        let device = self.table.remove(label).ok_or(KobjError::NotFound)?;
        if let Err(err) = unregister_child(&self.kset, &*device) {
            self.table.restore(device);
            return Err(err);
        }
        log::debug!("btrfs: device '{}' detached", label);
        Ok(())
    }

    /// 关闭子系统
    ///
    /// 依次销毁剩余设备、`info`、`health`、`devices`，最后移除根目录。
    /// 中途出错时仍继续清理，返回第一个错误。根已经处于关闭中（例如外部先调用了
    /// [`Kset::begin_shutdown`]）时照常完成清理。
    pub fn shutdown(self) -> Result<(), KobjError> {
        if let Err(err) = self.kset.begin_shutdown() {
            if self.kset.state() != KsetState::ShuttingDown {
                return Err(err);
            }
            log::warn!("btrfs: '{}' already shutting down", self.kset.name());
        }
        let mut first_err = None;

        for device in self.table.drain() {
            if let Err(err) = unregister_child(&self.kset, &*device) {
                log::error!("btrfs: cannot detach device '{}': {}", device.name(), err);
                first_err.get_or_insert(err);
            }
        }
        if let Err(err) = destroy_in_reverse(&self.kset, &self.statics) {
            first_err.get_or_insert(err);
        }
        if let Err(err) = self.kset.unregister() {
            log::error!("btrfs: cannot remove root '{}': {}", self.kset.name(), err);
            first_err.get_or_insert(err);
        }

        match first_err {
            None => {
                log::info!("btrfs: sysfs '{}' shut down", self.kset.name());
                Ok(())
            }
            Some(err) => Err(err),
        }
    }
}
