//! 子系统根
//!
//! [`Kset`] 是子系统在宿主命名空间中的根目录，同时记录子系统的生命周期状态。
//! 它由子系统的 `init` 构造、`shutdown` 销毁，并以参数形式传给每一次节点创建，
//! 因此不存在绕过它创建节点的路径。

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::error::KobjError;
use crate::kobject::{try_clone_name, validate_name};
use crate::registry::{KobjHandle, Registry};

/// 子系统状态
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KsetState {
    /// 根目录已创建，固定拓扑正在构建
    Initializing = 0,
    /// 固定拓扑完整，接受动态节点
    Ready = 1,
    /// 正在关闭，拒绝新节点
    ShuttingDown = 2,
    /// 根目录已移除
    Dead = 3,
}

impl KsetState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => KsetState::Initializing,
            1 => KsetState::Ready,
            2 => KsetState::ShuttingDown,
            _ => KsetState::Dead,
        }
    }
}

/// 子系统根目录
pub struct Kset {
    name: String,
    registry: Arc<dyn Registry>,
    root: KobjHandle,
    state: AtomicU8,
}

impl Kset {
    /// 在 `parent`（`None` 为宿主根）下创建根目录
    ///
    /// 失败时子系统保持未初始化，没有任何副作用。
    pub fn create_and_add(
        name: &str,
        parent: Option<KobjHandle>,
        registry: Arc<dyn Registry>,
    ) -> Result<Self, KobjError> {
        validate_name(name)?;
        let owned = try_clone_name(name)?;
        let root = registry.create_root(name, parent).map_err(|err| {
            log::error!("kset: cannot create root '{}': {}", name, err);
            err
        })?;
        log::info!("kset: '{}' created", name);
        Ok(Self {
            name: owned,
            registry,
            root,
            state: AtomicU8::new(KsetState::Initializing as u8),
        })
    }

    /// 根目录名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 根目录句柄
    pub fn root(&self) -> KobjHandle {
        self.root
    }

    /// 宿主注册表
    pub fn registry(&self) -> &dyn Registry {
        &*self.registry
    }

    /// 当前状态
    pub fn state(&self) -> KsetState {
        KsetState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: KsetState, to: KsetState) -> Result<(), KobjError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(drop)
            .map_err(|_| KobjError::InvalidState)
    }

    /// 固定拓扑构建完成：`Initializing → Ready`
    pub fn mark_ready(&self) -> Result<(), KobjError> {
        self.transition(KsetState::Initializing, KsetState::Ready)?;
        log::info!("kset: '{}' ready", self.name);
        Ok(())
    }

    /// 开始关闭：`Ready → ShuttingDown`，此后拒绝创建新节点
    pub fn begin_shutdown(&self) -> Result<(), KobjError> {
        self.transition(KsetState::Ready, KsetState::ShuttingDown)?;
        log::info!("kset: '{}' shutting down", self.name);
        Ok(())
    }

    /// 是否允许创建节点（构建期或就绪期）
    pub fn ensure_accepting(&self) -> Result<(), KobjError> {
        match self.state() {
            KsetState::Initializing | KsetState::Ready => Ok(()),
            KsetState::ShuttingDown | KsetState::Dead => Err(KobjError::InvalidState),
        }
    }

    /// 是否已就绪（动态节点只能在就绪后创建）
    pub fn ensure_ready(&self) -> Result<(), KobjError> {
        match self.state() {
            KsetState::Ready => Ok(()),
            _ => Err(KobjError::InvalidState),
        }
    }

    /// 移除根目录
    ///
    /// 根目录下仍有节点时失败并保持原状态，不会留下悬空子节点。
    pub fn unregister(&self) -> Result<(), KobjError> {
        let state = self.state();
        if state == KsetState::Dead {
            return Err(KobjError::InvalidState);
        }
        self.registry.remove_root(self.root)?;
        self.state.store(KsetState::Dead as u8, Ordering::Release);
        log::info!("kset: '{}' removed", self.name);
        Ok(())
    }
}

impl fmt::Debug for Kset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kset")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("state", &self.state())
            .finish()
    }
}
