pub mod config;
pub mod errors;

pub use config::models::{AppConfig, DatabaseConfig, ObservabilityConfig, RecoveryConfig};
pub use errors::*;

/// 统一的Result类型
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
