//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::Job;
use scheduler_core::SchedulerResult;

/// 作业仓储抽象
///
/// 返回的作业状态必须与查询一致：`load_not_finished_jobs` 只返回未结束的作业，
/// `load_finished_jobs` 只返回已结束的作业。
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn load_not_finished_jobs(&self, include_tasks: bool) -> SchedulerResult<Vec<Job>>;

    /// `submitted_since` 为 `None` 时加载全部已结束作业
    async fn load_finished_jobs(
        &self,
        include_tasks: bool,
        submitted_since: Option<DateTime<Utc>>,
    ) -> SchedulerResult<Vec<Job>>;
}

/// 将毫秒时间戳形式的截止时间转换为过滤条件，负数表示不过滤
///
/// 超出可表示范围的值截断为最大时间，即不加载任何已结束作业。
pub fn cutoff_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis < 0 {
        None
    } else {
        Some(DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_cutoff_means_no_filter() {
        assert_eq!(cutoff_from_millis(-1), None);
        assert_eq!(cutoff_from_millis(i64::MIN), None);
    }

    #[test]
    fn test_non_negative_cutoff() {
        let cutoff = cutoff_from_millis(3).unwrap();
        assert_eq!(cutoff.timestamp_millis(), 3);
        assert_eq!(cutoff_from_millis(0).unwrap().timestamp_millis(), 0);
    }

    #[test]
    fn test_out_of_range_cutoff_is_clamped() {
        assert_eq!(cutoff_from_millis(i64::MAX), Some(DateTime::<Utc>::MAX_UTC));
    }
}
