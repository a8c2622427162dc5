//! 暴露节点
//!
//! [`Kobject<T>`] 是可组合的基本单元：一个由注册表可见的公共头部 [`KobjCore`]
//! （名称、引用计数、状态、注册表句柄），加上类型描述符与类型专属负载。
//! 父子关系只记录在注册表中，节点本身不保存父指针。
//!
//! 注册表只持有 `Arc<dyn RawKobject>`；属性分发时节点自己完成向具体类型的还原，
//! 并在调用回调之前校验属性确实属于本类型。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::ops::Deref;
use core::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::attr::{AttrBuf, Attribute, RawAttribute};
use crate::config::NAME_MAX;
use crate::error::KobjError;
use crate::kref::Kref;
use crate::kset::Kset;
use crate::ktype::KobjType;
use crate::registry::KobjHandle;

/// 节点状态
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KobjState {
    /// 已分配，尚未出现在注册表中
    Unregistered = 0,
    /// 已注册，可接受分发和子节点
    Live = 1,
    /// 已请求销毁，不再接受新的子节点
    Dying = 2,
    /// release 已执行
    Released = 3,
}

impl KobjState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => KobjState::Unregistered,
            1 => KobjState::Live,
            2 => KobjState::Dying,
            _ => KobjState::Released,
        }
    }
}

/// 发往外部观察者的对象事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KobjAction {
    /// 对象已加入
    Add,
    /// 对象已移除
    Remove,
    /// 对象属性发生变化
    Change,
}

/// 所有节点共有的头部
#[derive(Debug)]
pub struct KobjCore {
    name: String,
    kref: Kref,
    state: AtomicU8,
    handle: AtomicU64,
}

impl KobjCore {
    fn new(name: String) -> Self {
        Self {
            name,
            kref: Kref::new(),
            state: AtomicU8::new(KobjState::Unregistered as u8),
            handle: AtomicU64::new(0),
        }
    }

    /// 节点名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 引用计数
    pub fn kref(&self) -> &Kref {
        &self.kref
    }

    /// 当前状态
    pub fn state(&self) -> KobjState {
        KobjState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 是否处于 [`KobjState::Live`]
    pub fn is_live(&self) -> bool {
        self.state() == KobjState::Live
    }

    /// 注册表句柄，注册成功前为 `None`
    pub fn handle(&self) -> Option<KobjHandle> {
        KobjHandle::from_raw(self.handle.load(Ordering::Acquire))
    }

    fn set_state(&self, state: KobjState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: KobjState, to: KobjState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// 注册表侧看到的无类型节点
pub trait RawKobject: Send + Sync + Any {
    /// 公共头部
    fn core(&self) -> &KobjCore;

    /// 类型名（来自 [`KobjType::name`]）
    fn type_name(&self) -> &'static str;

    /// 需要在命名空间中物化的默认属性
    fn default_attrs(&self) -> Vec<&'static dyn RawAttribute>;

    /// 读分发
    fn show(&self, attr: &dyn RawAttribute, buf: &mut AttrBuf) -> Result<(), KobjError>;

    /// 写分发
    fn store(&self, attr: &dyn RawAttribute, data: &[u8]) -> Result<usize, KobjError>;

    /// 执行类型的 release 回调
    ///
    /// 只应由 [`kobject_put`] 在引用计数归零时调用。
    fn release(&self);

    /// 向下转型为 &dyn Any，用于支持 downcast
    fn as_any(&self) -> &dyn Any;
}

impl dyn RawKobject {
    /// 节点名
    pub fn name(&self) -> &str {
        self.core().name()
    }

    /// 尝试获取具体类型的引用
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&Kobject<T>> {
        self.as_any().downcast_ref::<Kobject<T>>()
    }

    /// 尝试向下转型为具体的节点类型
    pub fn downcast_arc<T: Send + Sync + 'static>(
        self: Arc<Self>,
    ) -> Result<Arc<Kobject<T>>, Arc<Self>> {
        if (*self).as_any().is::<Kobject<T>>() {
            // SAFETY: 已经通过 is::<Kobject<T>>() 检查了类型
            unsafe {
                let ptr = Arc::into_raw(self);
                Ok(Arc::from_raw(ptr as *const Kobject<T>))
            }
        } else {
            Err(self)
        }
    }
}

/// 类型化的暴露节点
pub struct Kobject<T: 'static> {
    core: KobjCore,
    ktype: &'static KobjType<T>,
    payload: T,
}

impl<T: 'static> Kobject<T> {
    /// 节点名
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// 公共头部
    pub fn kobj_core(&self) -> &KobjCore {
        &self.core
    }

    /// 当前状态
    pub fn state(&self) -> KobjState {
        self.core.state()
    }

    /// 注册表句柄
    pub fn handle(&self) -> Option<KobjHandle> {
        self.core.handle()
    }

    /// 类型描述符
    pub fn ktype(&self) -> &'static KobjType<T> {
        self.ktype
    }

    /// 类型专属负载
    ///
    /// 调用 [`kobject_destroy`] 之后不应再访问负载：release 可能已经执行。
    pub fn payload(&self) -> &T {
        &self.payload
    }

    fn resolve_attr<'a>(&self, attr: &'a dyn RawAttribute) -> Result<&'a Attribute<T>, KobjError> {
        let typed = attr
            .as_any()
            .downcast_ref::<Attribute<T>>()
            .ok_or(KobjError::InvalidArgument)?;
        if !self
            .ktype
            .default_attrs
            .iter()
            .any(|own| core::ptr::eq(*own, typed))
        {
            return Err(KobjError::NotFound);
        }
        Ok(typed)
    }
}

impl<T: Send + Sync + 'static> RawKobject for Kobject<T> {
    fn core(&self) -> &KobjCore {
        &self.core
    }

    fn type_name(&self) -> &'static str {
        self.ktype.name
    }

    fn default_attrs(&self) -> Vec<&'static dyn RawAttribute> {
        self.ktype
            .default_attrs
            .iter()
            .map(|attr| *attr as &'static dyn RawAttribute)
            .collect()
    }

    fn show(&self, attr: &dyn RawAttribute, buf: &mut AttrBuf) -> Result<(), KobjError> {
        let attr = self.resolve_attr(attr)?;
        (self.ktype.sysfs_ops.show)(self, attr, buf)
    }

    fn store(&self, attr: &dyn RawAttribute, data: &[u8]) -> Result<usize, KobjError> {
        let attr = self.resolve_attr(attr)?;
        (self.ktype.sysfs_ops.store)(self, attr, data)
    }

    fn release(&self) {
        self.core.set_state(KobjState::Released);
        (self.ktype.release)(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 分发期间钉住节点的引用
///
/// 构造时增加引用计数，析构时释放；因此 release 一定发生在所有持有
/// `KobjRef` 的分发结束之后。
pub struct KobjRef {
    node: Arc<dyn RawKobject>,
}

impl KobjRef {
    /// 计数尚未归零时钉住节点
    pub fn try_get(node: Arc<dyn RawKobject>) -> Option<Self> {
        if node.core().kref().get_unless_zero() {
            Some(Self { node })
        } else {
            None
        }
    }
}

impl Deref for KobjRef {
    type Target = dyn RawKobject;

    fn deref(&self) -> &Self::Target {
        &*self.node
    }
}

impl Drop for KobjRef {
    fn drop(&mut self) {
        kobject_put(&*self.node);
    }
}

/// 增加节点引用
pub fn kobject_get(kobj: &dyn RawKobject) -> bool {
    kobj.core().kref().get()
}

/// 释放节点引用，最后一个引用释放时执行 release
pub fn kobject_put(kobj: &dyn RawKobject) {
    kobj.core().kref().put(|| kobj.release());
}

/// 向外部观察者发送对象事件
pub fn kobject_uevent(kset: &Kset, kobj: &dyn RawKobject, action: KobjAction) {
    let Some(handle) = kobj.core().handle() else {
        return;
    };
    log::debug!(
        "kobject: uevent {:?} for '{}/{}'",
        action,
        kset.name(),
        kobj.core().name()
    );
    kset.registry().notify(handle, action);
}

pub(crate) fn validate_name(name: &str) -> Result<(), KobjError> {
    if name.is_empty() || name.len() > NAME_MAX || name == "." || name == ".." {
        return Err(KobjError::InvalidArgument);
    }
    if name.bytes().any(|b| b == b'/' || b == 0) {
        return Err(KobjError::InvalidArgument);
    }
    Ok(())
}

pub(crate) fn try_clone_name(name: &str) -> Result<String, KobjError> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(name.len())
        .map_err(|_| KobjError::OutOfMemory)?;
    owned.push_str(name);
    Ok(owned)
}

/// 创建并注册一个节点
///
/// `parent` 为 `None` 时节点挂在 `kset` 的根目录下。成功返回时节点已经可以接受
/// 属性分发；失败时不会留下注册表条目，负载经由 release 回调回收。
pub fn kobject_create<T: Send + Sync + 'static>(
    kset: &Kset,
    name: &str,
    ktype: &'static KobjType<T>,
    parent: Option<&dyn RawKobject>,
    payload: T,
) -> Result<Arc<Kobject<T>>, KobjError> {
    kset.ensure_accepting()?;
    validate_name(name)?;

    let parent_handle = match parent {
        Some(parent) => {
            if !parent.core().is_live() {
                return Err(KobjError::InvalidState);
            }
            parent.core().handle().ok_or(KobjError::InvalidState)?
        }
        None => kset.root(),
    };

    let kobj = Arc::new(Kobject {
        core: KobjCore::new(try_clone_name(name)?),
        ktype,
        payload,
    });

    let erased: Arc<dyn RawKobject> = kobj.clone();
    match kset.registry().register(name, parent_handle, erased) {
        Ok(handle) => {
            kobj.core.handle.store(handle.raw(), Ordering::Release);
            kobj.core.set_state(KobjState::Live);
        }
        Err(err) => {
            log::warn!(
                "kobject: failed to register '{}' ({}): {}",
                name,
                ktype.name,
                err
            );
            kobject_put(&*kobj);
            return Err(err);
        }
    }

    log::debug!("kobject: created '{}' of type {}", name, ktype.name);
    kobject_uevent(kset, &*kobj, KobjAction::Add);
    Ok(kobj)
}

/// 请求销毁节点
///
/// 节点先从命名空间中移除，然后释放创建者的引用。若仍有分发在进行，
/// release 会推迟到最后一个分发结束时执行。仍有子节点的节点不能销毁。
pub fn kobject_destroy(kset: &Kset, kobj: &dyn RawKobject) -> Result<(), KobjError> {
    let core = kobj.core();
    if !core.transition(KobjState::Live, KobjState::Dying) {
        return Err(KobjError::InvalidState);
    }
    let handle = core.handle().ok_or(KobjError::InvalidState)?;

    if let Err(err) = kset.registry().unregister(handle) {
        log::warn!("kobject: failed to unregister '{}': {}", core.name(), err);
        core.set_state(KobjState::Live);
        return Err(err);
    }
    kobject_uevent(kset, kobj, KobjAction::Remove);

    log::debug!("kobject: destroyed '{}'", core.name());
    kobject_put(kobj);
    Ok(())
}
