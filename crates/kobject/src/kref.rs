//! 引用计数
//!
//! [`Kref`] 在计数归零时触发一次性的收尾闭包。计数本身是原子的，
//! 收尾由 [`sync::CallOnce`] 保护，因此并发的最后两次 `put` 也不会让它执行两次。

use core::sync::atomic::{AtomicUsize, Ordering, fence};

use sync::CallOnce;

/// 带一次性 release 的引用计数
#[derive(Debug)]
pub struct Kref {
    refcount: AtomicUsize,
    released: CallOnce,
}

impl Kref {
    /// 创建计数为 1 的引用（创建者持有）
    pub const fn new() -> Self {
        Self {
            refcount: AtomicUsize::new(1),
            released: CallOnce::new(),
        }
    }

    /// 当前计数（仅供调试与测试）
    pub fn count(&self) -> usize {
        self.refcount.load(Ordering::Relaxed)
    }

    /// 增加一个引用
    ///
    /// 计数已为 0 时拒绝增加并返回 `false`，与 [`Kref::get_unless_zero`] 相同。
    pub fn get(&self) -> bool {
        let ok = self.get_unless_zero();
        if !ok {
            log::warn!("kref: get on an object whose count already dropped to zero");
        }
        ok
    }

    /// 仅当计数非零时增加引用
    ///
    /// 命名空间读者在分发前用它钉住节点：一旦计数归零，节点就不能再被复活。
    pub fn get_unless_zero(&self) -> bool {
        let mut cur = self.refcount.load(Ordering::Relaxed);
        loop {
            if cur == 0 {
                return false;
            }
            match self.refcount.compare_exchange_weak(
                cur,
                cur + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    /// 释放一个引用，计数归零时执行 `release`
    ///
    /// 返回本次调用是否执行了 `release`。
    pub fn put<F: FnOnce()>(&self, release: F) -> bool {
        let mut cur = self.refcount.load(Ordering::Relaxed);
        loop {
            if cur == 0 {
                log::warn!("kref: put on an object whose count already dropped to zero");
                return false;
            }
            match self.refcount.compare_exchange_weak(
                cur,
                cur - 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
        if cur != 1 {
            return false;
        }
        // 与其他持有者的 Release 递减配对，release 必须看到它们的全部写入
        fence(Ordering::Acquire);
        self.released.call_once(release)
    }

    /// release 是否已经执行
    pub fn is_released(&self) -> bool {
        self.released.is_started()
    }
}

impl Default for Kref {
    fn default() -> Self {
        Self::new()
    }
}
