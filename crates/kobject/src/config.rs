//! kobject 层配置常量

/// show 回调输出的上限（一页）
pub const PAGE_SIZE: usize = 4096;

/// 节点名与属性名的最大长度
pub const NAME_MAX: usize = 255;
