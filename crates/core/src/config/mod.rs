//! 配置管理
//!
//! 配置按以下顺序加载：
//! 1. TOML 配置文件
//! 2. 环境变量覆盖（前缀 `SCHEDULER_`，层级分隔符 `__`）
//!
//! 加载完成后统一校验，任何一项校验失败都会阻止调度器启动。

pub mod models;

pub use models::*;
