//! 一次性执行保护
//!
//! 用于保证某段收尾逻辑（例如 kobject 的 release 回调）在并发下也只执行一次。

use core::sync::atomic::{AtomicU8, Ordering};

const INCOMPLETE: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETE: u8 = 2;

/// 一次性执行标志
///
/// 与 `std::sync::Once` 不同，后到的调用者不会等待首个调用者执行完毕，
/// 而是直接返回 `false`。
#[derive(Debug)]
pub struct CallOnce {
    state: AtomicU8,
}

impl CallOnce {
    /// 创建一个尚未执行过的标志
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(INCOMPLETE),
        }
    }

    /// 若尚未执行过，则执行 `f` 并返回 `true`；否则不执行并返回 `false`
    pub fn call_once<F: FnOnce()>(&self, f: F) -> bool {
        if self
            .state
            .compare_exchange(INCOMPLETE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        f();
        self.state.store(COMPLETE, Ordering::Release);
        true
    }

    /// 是否已经开始（或完成）执行
    pub fn is_started(&self) -> bool {
        self.state.load(Ordering::Acquire) != INCOMPLETE
    }

    /// 是否已经执行完毕
    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETE
    }
}

impl Default for CallOnce {
    fn default() -> Self {
        Self::new()
    }
}
