//! 内核对象 (kobject) 层
//!
//! 此 crate 提供把一组活动对象以层次化、可内省的方式暴露到虚拟命名空间的通用机制：
//!
//! - [`Attribute`] - 带权限位的单个属性，可选 show/store 回调
//! - [`KobjType`] - 同类节点共享的分发表、release 回调和默认属性
//! - [`Kobject`] - 可注册到命名空间的节点，携带类型专属负载
//! - [`Kset`] - 子系统根目录，所有顶层节点都挂在它下面
//! - [`Registry`] - 宿主命名空间服务的抽象，[`MemRegistry`] 为内存实现
//! - [`TopologyBuilder`] - 固定顶层拓扑的事务式构建器（失败时后进先出回滚）
//!
//! 节点生命周期：创建 → 注册（属性在命名空间中出现）→ 若干次 show/store 分发
//! → 显式销毁 → 引用计数归零时 release 回调恰好执行一次。

#![no_std]
#![allow(clippy::module_inception)]

extern crate alloc;

pub mod attr;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod kobject;
pub mod kref;
pub mod kset;
pub mod ktype;
pub mod registry;
pub mod topology;

pub use attr::{AttrBuf, AttrMode, Attribute, RawAttribute, ShowFn, StoreFn, parse_str, parse_u64};
pub use dynamic::{register_child, unregister_child};
pub use error::KobjError;
pub use kobject::{
    KobjAction, KobjCore, KobjRef, KobjState, Kobject, RawKobject, kobject_create,
    kobject_destroy, kobject_get, kobject_put, kobject_uevent,
};
pub use kref::Kref;
pub use kset::{Kset, KsetState};
pub use ktype::{
    KobjType, ReleaseFn, SysfsOps, kobject_attr_show, kobject_attr_store, kobject_release_default,
};
pub use registry::{KobjHandle, MemRegistry, Registry};
pub use topology::{TopologyBuilder, destroy_in_reverse};
