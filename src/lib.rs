//! 调度器启动入口：加载配置、连接存储并恢复调度器状态

pub mod app;

pub use app::Application;
