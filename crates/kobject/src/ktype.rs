//! 类型描述符
//!
//! [`KobjType`] 把同一类节点（例如 "devices 目录"、"单个设备"）的行为打包在一起：
//! 属性读写所用的分发表、最后一个引用释放时的 release 回调，以及默认属性集合。
//! 类型描述符在进程内共享且不可变，通常以 `static` 定义。

use crate::attr::{AttrBuf, Attribute, ShowFn, StoreFn};
use crate::error::KobjError;
use crate::kobject::Kobject;

/// release 回调，在节点引用计数归零时恰好执行一次
pub type ReleaseFn<T> = fn(&Kobject<T>);

/// 属性读写分发表
pub struct SysfsOps<T: 'static> {
    /// 读分发
    pub show: ShowFn<T>,
    /// 写分发
    pub store: StoreFn<T>,
}

impl<T: 'static> SysfsOps<T> {
    /// 直接转发到属性自身回调的通用分发表
    pub const GENERIC: SysfsOps<T> = SysfsOps {
        show: kobject_attr_show::<T>,
        store: kobject_attr_store::<T>,
    };
}

/// 节点类型描述符
pub struct KobjType<T: 'static> {
    /// 类型名，仅用于日志
    pub name: &'static str,
    /// 属性读写分发表
    pub sysfs_ops: SysfsOps<T>,
    /// release 回调
    pub release: ReleaseFn<T>,
    /// 每个节点都会带上的默认属性
    pub default_attrs: &'static [&'static Attribute<T>],
}

impl<T: 'static> KobjType<T> {
    /// 使用通用分发表和默认 release 定义类型
    pub const fn new(name: &'static str, default_attrs: &'static [&'static Attribute<T>]) -> Self {
        Self {
            name,
            sysfs_ops: SysfsOps::GENERIC,
            release: kobject_release_default::<T>,
            default_attrs,
        }
    }

    /// 替换 release 回调
    pub const fn with_release(mut self, release: ReleaseFn<T>) -> Self {
        self.release = release;
        self
    }

    /// 按名称查找默认属性
    pub fn find_attr(&self, name: &str) -> Option<&'static Attribute<T>> {
        self.default_attrs.iter().copied().find(|attr| attr.name == name)
    }
}

/// 通用读分发：属性没有 show 回调时返回 [`KobjError::UnsupportedOperation`]
pub fn kobject_attr_show<T: 'static>(
    kobj: &Kobject<T>,
    attr: &Attribute<T>,
    buf: &mut AttrBuf,
) -> Result<(), KobjError> {
    match attr.show {
        Some(show) => show(kobj, attr, buf),
        None => Err(KobjError::UnsupportedOperation),
    }
}

/// 通用写分发：属性没有 store 回调时返回 [`KobjError::UnsupportedOperation`]
pub fn kobject_attr_store<T: 'static>(
    kobj: &Kobject<T>,
    attr: &Attribute<T>,
    buf: &[u8],
) -> Result<usize, KobjError> {
    match attr.store {
        Some(store) => store(kobj, attr, buf),
        None => Err(KobjError::UnsupportedOperation),
    }
}

/// 默认 release：负载随节点一起在最后一个 `Arc` 释放时回收，这里只记录日志
pub fn kobject_release_default<T: 'static>(kobj: &Kobject<T>) {
    log::debug!("kobject: '{}' released", kobj.name());
}
