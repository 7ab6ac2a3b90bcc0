use thiserror::Error;

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("参数为空: {0}")]
    NullArgument(String),

    #[error("无效的参数: {0}")]
    InvalidArgument(String),

    #[error("检测到循环依赖，剩余 {remaining} 个条目无法排序")]
    CircularDependency { remaining: usize },

    #[error("非法状态: {0}")]
    IllegalState(String),

    #[error("作业 {job_id} 状态校正失败: {message}")]
    Reconciliation { job_id: i64, message: String },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),
}

impl SchedulerError {
    pub fn illegal_state<S: Into<String>>(msg: S) -> Self {
        Self::IllegalState(msg.into())
    }

    pub fn reconciliation<S: Into<String>>(job_id: i64, msg: S) -> Self {
        Self::Reconciliation {
            job_id,
            message: msg.into(),
        }
    }

    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 致命错误会阻止调度器启动
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchedulerError::IllegalState(_) | SchedulerError::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SchedulerError::illegal_state("finished job in not-finished set").is_fatal());
        assert!(SchedulerError::config_error("bad").is_fatal());
        assert!(!SchedulerError::CircularDependency { remaining: 3 }.is_fatal());
        assert!(!SchedulerError::reconciliation(1, "boom").is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = SchedulerError::reconciliation(42, "cycle");
        assert_eq!(err.to_string(), "作业 42 状态校正失败: cycle");

        let err = SchedulerError::CircularDependency { remaining: 3 };
        assert!(err.to_string().contains('3'));
    }
}
