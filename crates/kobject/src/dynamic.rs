//! 动态节点
//!
//! 运行期创建的节点（例如每个被发现的设备一个节点）与静态节点遵循同样的创建/销毁约定，
//! 但只能在子系统就绪之后、关闭开始之前挂到某个仍然存活的父节点下。

use alloc::sync::Arc;

use crate::error::KobjError;
use crate::kobject::{Kobject, RawKobject, kobject_create, kobject_destroy};
use crate::kset::{Kset, KsetState};
use crate::ktype::KobjType;

/// 在 `parent` 下注册一个动态子节点
///
/// 子系统未就绪、已开始关闭，或父节点正在销毁时返回 [`KobjError::InvalidState`]。
pub fn register_child<T: Send + Sync + 'static>(
    kset: &Kset,
    parent: &dyn RawKobject,
    label: &str,
    ktype: &'static KobjType<T>,
    payload: T,
) -> Result<Arc<Kobject<T>>, KobjError> {
    kset.ensure_ready()?;
    if !parent.core().is_live() {
        return Err(KobjError::InvalidState);
    }
    kobject_create(kset, label, ktype, Some(parent), payload)
}

/// 注销一个动态子节点
///
/// 关闭期间仍然允许，以便在移除静态拓扑前清理剩余的动态节点。
pub fn unregister_child(kset: &Kset, child: &dyn RawKobject) -> Result<(), KobjError> {
    if kset.state() == KsetState::Dead {
        return Err(KobjError::InvalidState);
    }
    kobject_destroy(kset, child)
}
