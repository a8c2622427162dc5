//! kobject 层错误类型
//!
//! 可通过 [`KobjError::to_errno()`] 转换为负数错误码，供宿主命名空间回传给读者。

use core::fmt;

/// kobject 层错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KobjError {
    /// 内存分配失败，状态未改变 (-ENOMEM)
    OutOfMemory,
    /// 同一父节点下名称重复 (-EEXIST)
    RegistrationConflict,
    /// 节点正在销毁，或子系统尚未初始化/已开始关闭 (-EBUSY)
    InvalidState,
    /// 属性缺少被请求的 show/store 回调 (-EIO)
    UnsupportedOperation,
    /// 宿主注册表拒绝了请求，不可重试 (-EINVAL)
    RegistryRejected,
    /// 参数无效：句柄类型不符、输入无法解析、名称非法 (-EINVAL)
    InvalidArgument,
    /// 节点或属性不存在 (-ENOENT)
    NotFound,
    /// show 输出超过一页 (-EFBIG)
    BufferOverflow,
    /// 属性权限位不允许此访问 (-EACCES)
    PermissionDenied,
}

impl KobjError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            KobjError::NotFound => -2,
            KobjError::UnsupportedOperation => -5,
            KobjError::OutOfMemory => -12,
            KobjError::PermissionDenied => -13,
            KobjError::InvalidState => -16,
            KobjError::RegistrationConflict => -17,
            KobjError::RegistryRejected | KobjError::InvalidArgument => -22,
            KobjError::BufferOverflow => -27,
        }
    }
}

impl fmt::Display for KobjError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KobjError::OutOfMemory => "out of memory",
            KobjError::RegistrationConflict => "name already registered under this parent",
            KobjError::InvalidState => "object is not in a state that allows this operation",
            KobjError::UnsupportedOperation => "attribute does not support this operation",
            KobjError::RegistryRejected => "registry rejected the request",
            KobjError::InvalidArgument => "invalid argument",
            KobjError::NotFound => "no such object or attribute",
            KobjError::BufferOverflow => "attribute output exceeds one page",
            KobjError::PermissionDenied => "permission denied",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values() {
        assert_eq!(KobjError::OutOfMemory.to_errno(), -12);
        assert_eq!(KobjError::RegistrationConflict.to_errno(), -17);
        assert_eq!(KobjError::UnsupportedOperation.to_errno(), -5);
        assert_eq!(KobjError::RegistryRejected.to_errno(), -22);
    }
}
