//! 测试支持 crate
//!
//! 提供注册表故障注入与可计数的测试负载

#![no_std]

extern crate alloc;

pub mod mock;
