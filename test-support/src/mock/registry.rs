//! 注册表的故障注入包装
//!
//! 所有请求都转发给内部的 [`MemRegistry`]，但可以按名称让 `register`
//! 或让下一次 `create_root` 返回指定错误，并记录调用次数与事件。

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Deref;
use core::sync::atomic::{AtomicUsize, Ordering};

use kobject::{KobjAction, KobjError, KobjHandle, MemRegistry, RawKobject, Registry};
use sync::SpinLock;

/// 可注入故障的注册表
pub struct FaultyRegistry {
    inner: MemRegistry,
    register_faults: SpinLock<Vec<(String, KobjError)>>,
    create_root_fault: SpinLock<Option<KobjError>>,
    register_calls: AtomicUsize,
    unregister_calls: AtomicUsize,
    events: SpinLock<Vec<(KobjHandle, KobjAction)>>,
}

impl FaultyRegistry {
    /// 创建不带任何故障的包装
    pub fn new() -> Self {
        Self {
            inner: MemRegistry::new(),
            register_faults: SpinLock::new(Vec::new()),
            create_root_fault: SpinLock::new(None),
            register_calls: AtomicUsize::new(0),
            unregister_calls: AtomicUsize::new(0),
            events: SpinLock::new(Vec::new()),
        }
    }

    /// 创建并包装为 `Arc`
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// 之后每次以 `name` 注册节点都返回 `err`
    pub fn fail_register(&self, name: &str, err: KobjError) {
        self.register_faults.lock().push((name.to_string(), err));
    }

    /// 下一次 `create_root` 返回 `err`
    pub fn fail_next_create_root(&self, err: KobjError) {
        *self.create_root_fault.lock() = Some(err);
    }

    /// 清除所有故障
    pub fn clear_faults(&self) {
        self.register_faults.lock().clear();
        *self.create_root_fault.lock() = None;
    }

    /// 内部注册表
    pub fn inner(&self) -> &MemRegistry {
        &self.inner
    }

    /// `register` 被调用的次数（含失败）
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// `unregister` 被调用的次数（含失败）
    pub fn unregister_calls(&self) -> usize {
        self.unregister_calls.load(Ordering::SeqCst)
    }

    /// 已收到的事件
    pub fn events(&self) -> Vec<(KobjHandle, KobjAction)> {
        self.events.lock().clone()
    }
}

impl Default for FaultyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for FaultyRegistry {
    type Target = MemRegistry;

    fn deref(&self) -> &MemRegistry {
        &self.inner
    }
}

impl Registry for FaultyRegistry {
    fn create_root(&self, name: &str, parent: Option<KobjHandle>) -> Result<KobjHandle, KobjError> {
        if let Some(err) = self.create_root_fault.lock().take() {
            return Err(err);
        }
        self.inner.create_root(name, parent)
    }

    fn remove_root(&self, handle: KobjHandle) -> Result<(), KobjError> {
        self.inner.remove_root(handle)
    }

    fn register(
        &self,
        name: &str,
        parent: KobjHandle,
        kobj: Arc<dyn RawKobject>,
    ) -> Result<KobjHandle, KobjError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let fault = self
            .register_faults
            .lock()
            .iter()
            .find(|(fault_name, _)| fault_name == name)
            .map(|(_, err)| *err);
        if let Some(err) = fault {
            return Err(err);
        }
        self.inner.register(name, parent, kobj)
    }

    fn unregister(&self, handle: KobjHandle) -> Result<(), KobjError> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.unregister(handle)
    }

    fn notify(&self, handle: KobjHandle, action: KobjAction) {
        self.events.lock().push((handle, action));
    }
}
