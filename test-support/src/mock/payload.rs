//! 可计数的测试负载
//!
//! [`Tracked`] 保存一个整数值，并在 release 时递增共享计数，
//! 用于验证 release 恰好执行一次。

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use kobject::{kobj_attr, parse_u64, AttrBuf, Attribute, KobjError, KobjType, Kobject};

/// 测试负载
pub struct Tracked {
    /// 通过 `value` 属性读写的整数
    pub value: AtomicU64,
    releases: Arc<AtomicUsize>,
}

impl Tracked {
    /// 创建初值为 0 的负载，release 时递增 `releases`
    pub fn new(releases: &Arc<AtomicUsize>) -> Self {
        Self::with_value(releases, 0)
    }

    /// 创建指定初值的负载
    pub fn with_value(releases: &Arc<AtomicUsize>, value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
            releases: releases.clone(),
        }
    }
}

/// 新的 release 计数器
pub fn release_counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn show_value(
    kobj: &Kobject<Tracked>,
    _attr: &Attribute<Tracked>,
    buf: &mut AttrBuf,
) -> Result<(), KobjError> {
    buf.emit(format_args!("{}\n", kobj.payload().value.load(Ordering::SeqCst)))
}

fn store_value(
    kobj: &Kobject<Tracked>,
    _attr: &Attribute<Tracked>,
    data: &[u8],
) -> Result<usize, KobjError> {
    let value = parse_u64(data)?;
    kobj.payload().value.store(value, Ordering::SeqCst);
    Ok(data.len())
}

fn release_tracked(kobj: &Kobject<Tracked>) {
    kobj.payload().releases.fetch_add(1, Ordering::SeqCst);
}

kobj_attr!(pub static ATTR_VALUE: Tracked = "value", 0o666, Some(show_value), Some(store_value));
kobj_attr!(pub static ATTR_RO: Tracked = "ro", 0o444, Some(show_value), None);
kobj_attr!(pub static ATTR_WO: Tracked = "wo", 0o200, None, Some(store_value));
kobj_attr!(pub static ATTR_PLACEHOLDER: Tracked = "placeholder", 0o444, None, None);
// 类型正确但不属于 TRACKED_KTYPE
kobj_attr!(pub static ATTR_STRAY: Tracked = "stray", 0o444, Some(show_value), None);

/// `tracked` 类型的默认属性
pub static TRACKED_ATTRS: [&Attribute<Tracked>; 4] =
    [&ATTR_VALUE, &ATTR_RO, &ATTR_WO, &ATTR_PLACEHOLDER];

/// 测试用类型描述符
pub static TRACKED_KTYPE: KobjType<Tracked> =
    KobjType::new("tracked", &TRACKED_ATTRS).with_release(release_tracked);

/// 不带属性的目录类型
pub static TRACKED_DIR_KTYPE: KobjType<Tracked> =
    KobjType::new("tracked-dir", &[]).with_release(release_tracked);
