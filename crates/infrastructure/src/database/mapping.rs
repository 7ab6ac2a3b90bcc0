//! Shared database mapping utilities
//!
//! Status columns are stored as their upper-case text, timestamps as epoch
//! milliseconds and task parents as a JSON array of task ids.

use chrono::{DateTime, TimeZone, Utc};
use scheduler_core::{SchedulerError, SchedulerResult};
use scheduler_domain::{JobStatus, TaskStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Helper functions for converting between rows and domain values
pub struct MappingHelpers;

impl MappingHelpers {
    pub fn parse_job_status(row: &SqliteRow, field_name: &str) -> SchedulerResult<JobStatus> {
        let text: String = row.try_get(field_name)?;
        text.parse()
    }

    pub fn parse_task_status(row: &SqliteRow, field_name: &str) -> SchedulerResult<TaskStatus> {
        let text: String = row.try_get(field_name)?;
        text.parse()
    }

    pub fn parse_parents(row: &SqliteRow, field_name: &str) -> SchedulerResult<Vec<i64>> {
        match row.try_get::<Option<String>, _>(field_name)? {
            Some(json_str) if !json_str.is_empty() => serde_json::from_str(&json_str)
                .map_err(|e| SchedulerError::Serialization(format!("解析父任务列表失败: {e}"))),
            _ => Ok(Vec::new()),
        }
    }

    pub fn parse_counter(row: &SqliteRow, field_name: &str) -> SchedulerResult<u32> {
        let value: i64 = row.try_get(field_name)?;
        u32::try_from(value).map_err(|_| {
            SchedulerError::Serialization(format!("计数器 {field_name} 的值无效: {value}"))
        })
    }

    pub fn parse_timestamp(row: &SqliteRow, field_name: &str) -> SchedulerResult<DateTime<Utc>> {
        let millis: i64 = row.try_get(field_name)?;
        Self::millis_to_datetime(millis)
    }

    pub fn parse_optional_timestamp(
        row: &SqliteRow,
        field_name: &str,
    ) -> SchedulerResult<Option<DateTime<Utc>>> {
        row.try_get::<Option<i64>, _>(field_name)?
            .map(Self::millis_to_datetime)
            .transpose()
    }

    pub fn millis_to_datetime(millis: i64) -> SchedulerResult<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| SchedulerError::Serialization(format!("无效的时间戳: {millis}")))
    }

    /// `?1, ?2, ...` placeholders for an IN clause, numbered from `offset + 1`
    pub fn placeholders(count: usize, offset: usize) -> String {
        (offset + 1..=offset + count)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
