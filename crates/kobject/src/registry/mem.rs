//! 内存注册表
//!
//! 供没有真实虚拟文件系统的宿主以及测试使用：树结构保存在一张句柄表里，
//! 每个条目按名称有序地记录子项。

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use sync::RwLock;

use super::{KobjHandle, Registry};
use crate::attr::{AttrBuf, AttrMode, RawAttribute};
use crate::error::KobjError;
use crate::kobject::{KobjAction, KobjRef, RawKobject, try_clone_name};

const HOST_ROOT: u64 = 1;

struct Entry {
    name: String,
    parent: Option<KobjHandle>,
    children: BTreeMap<String, KobjHandle>,
    /// 根目录（kset）没有节点
    node: Option<Arc<dyn RawKobject>>,
    attrs: Vec<&'static dyn RawAttribute>,
}

impl Entry {
    fn dir(name: String, parent: Option<KobjHandle>) -> Self {
        Self {
            name,
            parent,
            children: BTreeMap::new(),
            node: None,
            attrs: Vec::new(),
        }
    }
}

/// 内存注册表
pub struct MemRegistry {
    next_handle: AtomicU64,
    entries: RwLock<HashMap<KobjHandle, Entry>>,
}

impl MemRegistry {
    /// 创建只含宿主根目录的注册表
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(Self::host_root_handle(), Entry::dir(String::new(), None));
        Self {
            next_handle: AtomicU64::new(HOST_ROOT + 1),
            entries: RwLock::new(entries),
        }
    }

    fn host_root_handle() -> KobjHandle {
        match KobjHandle::from_raw(HOST_ROOT) {
            Some(handle) => handle,
            None => unreachable!(),
        }
    }

    /// 宿主根目录
    pub fn host_root(&self) -> KobjHandle {
        Self::host_root_handle()
    }

    fn alloc_handle(&self) -> KobjHandle {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        KobjHandle::from_raw(raw).unwrap_or_else(Self::host_root_handle)
    }

    fn insert(
        &self,
        name: &str,
        parent: KobjHandle,
        node: Option<Arc<dyn RawKobject>>,
    ) -> Result<KobjHandle, KobjError> {
        let owned = try_clone_name(name)?;
        let attrs = node
            .as_ref()
            .map(|node| node.default_attrs())
            .unwrap_or_default();

        let mut entries = self.entries.write();
        // 父节点可能在调用者检查之后被并发销毁，这里在写锁内重新确认
        let parent_entry = match entries.get(&parent) {
            Some(entry) => entry,
            None if node.is_some() => return Err(KobjError::InvalidState),
            None => return Err(KobjError::NotFound),
        };
        if parent_entry
            .node
            .as_ref()
            .is_some_and(|parent_node| !parent_node.core().is_live())
        {
            return Err(KobjError::InvalidState);
        }
        if parent_entry.children.contains_key(name)
            || parent_entry.attrs.iter().any(|attr| attr.name() == name)
        {
            return Err(KobjError::RegistrationConflict);
        }

        let handle = self.alloc_handle();
        let mut entry = Entry::dir(owned.clone(), Some(parent));
        entry.node = node;
        entry.attrs = attrs;
        entries.insert(handle, entry);
        if let Some(parent_entry) = entries.get_mut(&parent) {
            parent_entry.children.insert(owned, handle);
        }
        Ok(handle)
    }

    fn remove(&self, handle: KobjHandle, expect_node: bool) -> Result<Entry, KobjError> {
        let mut entries = self.entries.write();
        let entry = entries.get(&handle).ok_or(KobjError::NotFound)?;
        if entry.node.is_some() != expect_node || entry.parent.is_none() {
            return Err(KobjError::InvalidArgument);
        }
        if !entry.children.is_empty() {
            return Err(KobjError::InvalidState);
        }
        let entry = entries.remove(&handle).ok_or(KobjError::NotFound)?;
        if let Some(parent) = entry.parent.and_then(|parent| entries.get_mut(&parent)) {
            parent.children.remove(&entry.name);
        }
        Ok(entry)
    }

    /// 按 `/` 分隔的相对路径（从宿主根开始）查找条目
    pub fn lookup(&self, path: &str) -> Option<KobjHandle> {
        let entries = self.entries.read();
        let mut cur = Self::host_root_handle();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            cur = *entries.get(&cur)?.children.get(component)?;
        }
        Some(cur)
    }

    /// 子目录名，按名称排序
    pub fn children(&self, handle: KobjHandle) -> Result<Vec<String>, KobjError> {
        let entries = self.entries.read();
        let entry = entries.get(&handle).ok_or(KobjError::NotFound)?;
        Ok(entry.children.keys().cloned().collect())
    }

    /// 属性文件及其权限位，按类型定义顺序
    pub fn attributes(
        &self,
        handle: KobjHandle,
    ) -> Result<Vec<(&'static str, AttrMode)>, KobjError> {
        let entries = self.entries.read();
        let entry = entries.get(&handle).ok_or(KobjError::NotFound)?;
        Ok(entry
            .attrs
            .iter()
            .map(|attr| (attr.name(), attr.mode()))
            .collect())
    }

    /// 取出条目对应的节点
    pub fn node(&self, handle: KobjHandle) -> Option<Arc<dyn RawKobject>> {
        self.entries.read().get(&handle)?.node.clone()
    }

    /// 除宿主根以外的条目数
    pub fn len(&self) -> usize {
        self.entries.read().len() - 1
    }

    /// 是否只剩宿主根
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pin(
        &self,
        handle: KobjHandle,
        attr_name: &str,
        write: bool,
    ) -> Result<(KobjRef, &'static dyn RawAttribute), KobjError> {
        let entries = self.entries.read();
        let entry = entries.get(&handle).ok_or(KobjError::NotFound)?;
        let node = entry.node.as_ref().ok_or(KobjError::NotFound)?;
        let attr = entry
            .attrs
            .iter()
            .copied()
            .find(|attr| attr.name() == attr_name)
            .ok_or(KobjError::NotFound)?;
        let allowed = if write {
            attr.mode().can_write()
        } else {
            attr.mode().can_read()
        };
        if !allowed {
            return Err(KobjError::PermissionDenied);
        }
        let pinned = KobjRef::try_get(node.clone()).ok_or(KobjError::NotFound)?;
        Ok((pinned, attr))
    }

    /// 读取属性：钉住节点后经节点的分发表调用 show
    pub fn show(&self, handle: KobjHandle, attr_name: &str) -> Result<String, KobjError> {
        let (node, attr) = self.pin(handle, attr_name, false)?;
        let mut buf = AttrBuf::new();
        node.show(attr, &mut buf)?;
        Ok(buf.into_string())
    }

    /// 写入属性：钉住节点后经节点的分发表调用 store
    pub fn store(
        &self,
        handle: KobjHandle,
        attr_name: &str,
        data: &[u8],
    ) -> Result<usize, KobjError> {
        let (node, attr) = self.pin(handle, attr_name, true)?;
        node.store(attr, data)
    }
}

impl Default for MemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for MemRegistry {
    fn create_root(&self, name: &str, parent: Option<KobjHandle>) -> Result<KobjHandle, KobjError> {
        self.insert(name, parent.unwrap_or_else(Self::host_root_handle), None)
    }

    fn remove_root(&self, handle: KobjHandle) -> Result<(), KobjError> {
        self.remove(handle, false).map(drop)
    }

    fn register(
        &self,
        name: &str,
        parent: KobjHandle,
        kobj: Arc<dyn RawKobject>,
    ) -> Result<KobjHandle, KobjError> {
        self.insert(name, parent, Some(kobj))
    }

    fn unregister(&self, handle: KobjHandle) -> Result<(), KobjError> {
        // 条目在锁外析构
        let removed = self.remove(handle, true)?;
        drop(removed);
        Ok(())
    }

    fn notify(&self, handle: KobjHandle, action: KobjAction) {
        log::trace!("registry: {:?} on handle {}", action, handle.raw());
    }
}
