use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{SchedulerError, SchedulerResult};

fn default_load_jobs_batch_size() -> usize {
    100
}

/// 启动恢复配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// 仅加载在此时间段内提交的已结束作业，例如 `"7d"` 或 `"12h 30m"`。
    /// 未设置时加载全部已结束作业。
    #[serde(default)]
    pub finished_job_load_period: Option<String>,
    /// 每次查询加载任务的作业数量
    #[serde(default = "default_load_jobs_batch_size")]
    pub load_jobs_batch_size: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            finished_job_load_period: None,
            load_jobs_batch_size: default_load_jobs_batch_size(),
        }
    }
}

impl RecoveryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.load_jobs_batch_size == 0 {
            return Err(anyhow::anyhow!("作业批量加载大小必须大于0"));
        }

        if let Some(period) = &self.finished_job_load_period {
            parse_period(period).map_err(|e| anyhow::anyhow!("{e}"))?;
        }

        Ok(())
    }

    /// 计算已结束作业的提交时间下限，`None` 表示不过滤
    pub fn finished_jobs_cutoff(&self, now: DateTime<Utc>) -> SchedulerResult<Option<DateTime<Utc>>> {
        let Some(period) = &self.finished_job_load_period else {
            return Ok(None);
        };

        let period = parse_period(period)?;
        now.checked_sub_signed(period)
            .map(Some)
            .ok_or_else(|| SchedulerError::config_error(format!("加载周期过长: {period}")))
    }
}

/// 解析形如 `"1d 2h 3m 4s"` 的时间段。
///
/// 支持的单位：`d`、`h`、`m`、`s`、`ms`，各分量之间的空白可以省略。
pub fn parse_period(input: &str) -> SchedulerResult<Duration> {
    let invalid = |reason: &str| {
        SchedulerError::config_error(format!("无效的时间段 '{input}': {reason}"))
    };

    let mut chars = input.trim().chars().peekable();
    if chars.peek().is_none() {
        return Err(invalid("不能为空"));
    }

    let mut total_ms: i64 = 0;
    while chars.peek().is_some() {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut digits = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
            digits.push(c);
        }
        if digits.is_empty() {
            return Err(invalid("缺少数值"));
        }

        let mut unit = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_alphabetic()) {
            unit.push(c);
        }

        let factor: i64 = match unit.as_str() {
            "d" => 86_400_000,
            "h" => 3_600_000,
            "m" => 60_000,
            "s" => 1_000,
            "ms" => 1,
            "" => return Err(invalid("缺少单位")),
            other => return Err(invalid(&format!("未知单位 '{other}'"))),
        };

        let value: i64 = digits.parse().map_err(|_| invalid("数值溢出"))?;
        total_ms = value
            .checked_mul(factor)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| invalid("数值溢出"))?;

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    if total_ms == 0 {
        return Err(invalid("时间段必须大于0"));
    }

    Ok(Duration::milliseconds(total_ms))
}
