//! # btrfs sysfs
//!
//! 在宿主命名空间中暴露 btrfs 的对象树：
//!
//! ```text
//! /sys/fs/btrfs/
//!          |-> devices/<label>/label
//!          |-> health/
//!          |-> info/num_devices
//! ```
//!
//! 三个顶层目录在 [`init`] 中按固定顺序创建，任一失败都会整体回滚；
//! 设备目录由 [`BtrfsSysfs::create_device`] 在运行期添加。

#![no_std]

extern crate alloc;

pub mod config;
pub mod device;
pub mod ktypes;
pub mod sysfs;

pub use config::SysfsConfig;
pub use device::{BtrfsDevice, DeviceTable, parse_label};
pub use sysfs::{BtrfsSysfs, init};
