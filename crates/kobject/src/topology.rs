//! 固定顶层拓扑的事务式构建
//!
//! [`TopologyBuilder`] 按顺序记录创建出的顶层节点。任一节点创建失败时，
//! 构建器被丢弃，之前的节点按后进先出的顺序销毁，顶层拓扑要么全部可见，要么全部不可见。

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::KobjError;
use crate::kobject::{Kobject, RawKobject, kobject_create, kobject_destroy};
use crate::kset::Kset;
use crate::ktype::KobjType;

/// 顶层拓扑构建器
pub struct TopologyBuilder<'a> {
    kset: &'a Kset,
    created: Vec<Arc<dyn RawKobject>>,
}

impl<'a> TopologyBuilder<'a> {
    /// 在 `kset` 根目录下开始构建
    pub fn new(kset: &'a Kset) -> Self {
        Self {
            kset,
            created: Vec::new(),
        }
    }

    /// 创建一个顶层节点并记录下来
    pub fn add<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        ktype: &'static KobjType<T>,
        payload: T,
    ) -> Result<Arc<Kobject<T>>, KobjError> {
        self.created
            .try_reserve(1)
            .map_err(|_| KobjError::OutOfMemory)?;
        let kobj = kobject_create(self.kset, name, ktype, None, payload)?;
        self.created.push(kobj.clone());
        Ok(kobj)
    }

    /// 已创建的节点数
    pub fn len(&self) -> usize {
        self.created.len()
    }

    /// 是否尚未创建任何节点
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// 提交拓扑，返回按创建顺序排列的节点
    pub fn commit(mut self) -> Vec<Arc<dyn RawKobject>> {
        core::mem::take(&mut self.created)
    }

    fn unwind(&mut self) {
        while let Some(kobj) = self.created.pop() {
            if let Err(err) = kobject_destroy(self.kset, &*kobj) {
                log::error!(
                    "topology: rollback of '{}' under '{}' failed: {}",
                    kobj.name(),
                    self.kset.name(),
                    err
                );
            }
        }
    }
}

impl Drop for TopologyBuilder<'_> {
    fn drop(&mut self) {
        if !self.created.is_empty() {
            log::warn!(
                "topology: rolling back {} node(s) under '{}'",
                self.created.len(),
                self.kset.name()
            );
            self.unwind();
        }
    }
}

/// 按创建顺序的逆序销毁一组顶层节点，返回遇到的第一个错误
pub fn destroy_in_reverse(kset: &Kset, nodes: &[Arc<dyn RawKobject>]) -> Result<(), KobjError> {
    let mut first_err = None;
    for kobj in nodes.iter().rev() {
        if let Err(err) = kobject_destroy(kset, &**kobj) {
            log::error!("topology: failed to destroy '{}': {}", kobj.name(), err);
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}
