//! 同步原语
//!
//! 向 kobject 层及其使用者提供基本的锁和一次性执行原语，
//! 包括自旋锁、读写自旋锁以及 [`CallOnce`]。
//!
//! 锁的外壳由 `lock_api` 提供，本 crate 只实现底层的原子状态机。

#![no_std]

mod call_once;
mod raw_spin_lock;
mod rw_spin_lock;
mod spin_lock;

pub use call_once::CallOnce;
pub use raw_spin_lock::RawSpinLock;
pub use rw_spin_lock::{RawRwSpinLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
