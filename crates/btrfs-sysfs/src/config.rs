//! btrfs sysfs 配置

use kobject::KobjHandle;

/// 根目录默认名
pub const DEFAULT_ROOT_NAME: &str = "btrfs";

/// [`crate::init`] 的参数
#[derive(Debug, Clone, Copy)]
pub struct SysfsConfig {
    /// 根目录名
    pub root_name: &'static str,
    /// 根目录的父目录（宿主的 `fs` 目录），`None` 表示宿主根
    pub parent: Option<KobjHandle>,
}

impl SysfsConfig {
    /// 挂在 `parent` 下的默认配置
    pub const fn under(parent: KobjHandle) -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME,
            parent: Some(parent),
        }
    }
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME,
            parent: None,
        }
    }
}
