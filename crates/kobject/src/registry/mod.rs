//! 宿主命名空间注册表
//!
//! kobject 层不实现目录列举或路径解析，而是把节点交给实现了 [`Registry`] 的宿主服务。
//! 宿主负责把节点物化为目录、把默认属性物化为文件，并以自己的锁保护树结构。

mod mem;

use alloc::sync::Arc;
use core::num::NonZeroU64;

use crate::error::KobjError;
use crate::kobject::{KobjAction, RawKobject};

pub use mem::MemRegistry;

/// 注册表分配的不透明句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KobjHandle(NonZeroU64);

impl KobjHandle {
    /// 由原始值构造句柄，0 表示无效句柄
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// 原始值
    pub const fn raw(&self) -> u64 {
        self.0.get()
    }
}

/// 宿主注册表服务
///
/// 实现者需要自行保证树结构的并发安全；kobject 层只在持有节点引用时调用这些方法。
pub trait Registry: Send + Sync {
    /// 创建一个不带属性的根目录（kset），`parent` 为 `None` 时放在宿主根下
    fn create_root(&self, name: &str, parent: Option<KobjHandle>) -> Result<KobjHandle, KobjError>;

    /// 移除根目录，仍有子项时失败
    fn remove_root(&self, handle: KobjHandle) -> Result<(), KobjError>;

    /// 在 `parent` 下注册节点并物化其默认属性
    fn register(
        &self,
        name: &str,
        parent: KobjHandle,
        kobj: Arc<dyn RawKobject>,
    ) -> Result<KobjHandle, KobjError>;

    /// 把节点从命名空间中移除，仍有子项时失败
    ///
    /// 注册表放弃自己持有的节点引用；节点内存的回收推迟到最后一个引用释放。
    fn unregister(&self, handle: KobjHandle) -> Result<(), KobjError>;

    /// 尽力而为地通知外部观察者，默认不做任何事
    fn notify(&self, _handle: KobjHandle, _action: KobjAction) {}
}
