//! Mock 实现模块
//!
//! 提供注册表和节点负载的 Mock 实现，用于集成测试

pub mod payload;
pub mod registry;
