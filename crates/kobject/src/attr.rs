//! 属性描述符
//!
//! 一个 [`Attribute`] 描述节点上的一个命名值槽：名称、权限位以及可选的 show/store 回调。
//! 属性定义后不可变，由同一 [`crate::KobjType`] 的所有节点共享。

use alloc::string::String;
use core::any::Any;
use core::fmt;

use crate::config::PAGE_SIZE;
use crate::error::KobjError;
use crate::kobject::Kobject;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// 属性文件的权限位（与 POSIX 兼容）
    pub struct AttrMode: u16 {
        /// 用户读
        const S_IRUSR = 0o400;
        /// 用户写
        const S_IWUSR = 0o200;
        /// 组读
        const S_IRGRP = 0o040;
        /// 组写
        const S_IWGRP = 0o020;
        /// 其他读
        const S_IROTH = 0o004;
        /// 其他写
        const S_IWOTH = 0o002;
    }
}

impl AttrMode {
    /// 0444，所有人只读
    pub const RO: AttrMode = AttrMode::from_bits_truncate(0o444);
    /// 0644，属主可写
    pub const RW: AttrMode = AttrMode::from_bits_truncate(0o644);
    /// 0666，所有人可读写
    pub const RW_ALL: AttrMode = AttrMode::from_bits_truncate(0o666);
    /// 0200，属主只写
    pub const WO: AttrMode = AttrMode::from_bits_truncate(0o200);

    /// 检查是否有读权限（暂时只检查用户权限）
    pub fn can_read(&self) -> bool {
        self.contains(AttrMode::S_IRUSR)
    }

    /// 检查是否有写权限
    pub fn can_write(&self) -> bool {
        self.contains(AttrMode::S_IWUSR)
    }
}

/// show 回调：把属性值以文本写入 `buf`
pub type ShowFn<T> = fn(&Kobject<T>, &Attribute<T>, &mut AttrBuf) -> Result<(), KobjError>;

/// store 回调：解析 `buf`，返回消耗的字节数
pub type StoreFn<T> = fn(&Kobject<T>, &Attribute<T>, &[u8]) -> Result<usize, KobjError>;

/// 类型化的属性描述符
///
/// `T` 是所属节点的负载类型，回调因此可以直接访问负载而无需再做类型转换。
pub struct Attribute<T: 'static> {
    /// 属性文件名
    pub name: &'static str,
    /// 权限位
    pub mode: AttrMode,
    /// 读回调，`None` 表示只写或占位属性
    pub show: Option<ShowFn<T>>,
    /// 写回调，`None` 表示只读属性
    pub store: Option<StoreFn<T>>,
}

impl<T: 'static> Attribute<T> {
    /// 定义一个属性，可用于 `static` 初始化
    pub const fn new(
        name: &'static str,
        mode: AttrMode,
        show: Option<ShowFn<T>>,
        store: Option<StoreFn<T>>,
    ) -> Self {
        Self {
            name,
            mode,
            show,
            store,
        }
    }
}

/// 定义一个 `static` 属性描述符
///
/// ```ignore
/// kobj_attr!(static ATTR_LABEL: BtrfsDevice = "label", 0o444, Some(show_label), None);
/// ```
#[macro_export]
macro_rules! kobj_attr {
    ($vis:vis static $ident:ident : $ty:ty = $name:literal, $mode:expr, $show:expr, $store:expr) => {
        $vis static $ident: $crate::Attribute<$ty> = $crate::Attribute::new(
            $name,
            $crate::AttrMode::from_bits_truncate($mode),
            $show,
            $store,
        );
    };
}

/// 注册表侧看到的无类型属性句柄
///
/// 注册表只认识 (节点句柄, 属性句柄) 对，分发前由节点把它还原为 [`Attribute<T>`]。
pub trait RawAttribute: Send + Sync + Any {
    /// 属性文件名
    fn name(&self) -> &'static str;

    /// 权限位
    fn mode(&self) -> AttrMode;

    /// 向下转型为 &dyn Any
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> RawAttribute for Attribute<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn mode(&self) -> AttrMode {
        self.mode
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// show 输出缓冲区，容量上限为 [`PAGE_SIZE`]
#[derive(Debug, Default)]
pub struct AttrBuf {
    buf: String,
}

impl AttrBuf {
    /// 创建空缓冲区
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    /// 追加格式化文本，超过一页时返回 [`KobjError::BufferOverflow`] 且不写入任何内容
    pub fn emit(&mut self, args: fmt::Arguments<'_>) -> Result<(), KobjError> {
        let mark = self.buf.len();
        if fmt::Write::write_fmt(self, args).is_err() {
            self.buf.truncate(mark);
            return Err(KobjError::BufferOverflow);
        }
        Ok(())
    }

    /// 已写入的文本
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// 已写入的字节数
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// 取出内容
    pub fn into_string(self) -> String {
        self.buf
    }
}

impl fmt::Write for AttrBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > PAGE_SIZE {
            return Err(fmt::Error);
        }
        self.buf.try_reserve(s.len()).map_err(|_| fmt::Error)?;
        self.buf.push_str(s);
        Ok(())
    }
}

/// 把 store 输入解析为 UTF-8 文本，去掉至多一个结尾换行
pub fn parse_str(buf: &[u8]) -> Result<&str, KobjError> {
    let text = core::str::from_utf8(buf).map_err(|_| KobjError::InvalidArgument)?;
    Ok(text.strip_suffix('\n').unwrap_or(text))
}

/// 把 store 输入解析为单个无符号整数
pub fn parse_u64(buf: &[u8]) -> Result<u64, KobjError> {
    parse_str(buf)?
        .trim()
        .parse::<u64>()
        .map_err(|_| KobjError::InvalidArgument)
}
