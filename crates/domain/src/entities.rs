use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scheduler_core::SchedulerError;

use crate::value_objects::{JobStatusClass, TaskCounter, TaskCounters};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    /// 运行中的作业在恢复后需要重新分发部分任务
    Stalled,
    Paused,
    InError,
    Finished,
    Canceled,
    Failed,
    Killed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 9] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Stalled,
        JobStatus::Paused,
        JobStatus::InError,
        JobStatus::Finished,
        JobStatus::Canceled,
        JobStatus::Failed,
        JobStatus::Killed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Stalled => "STALLED",
            JobStatus::Paused => "PAUSED",
            JobStatus::InError => "IN_ERROR",
            JobStatus::Finished => "FINISHED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Failed => "FAILED",
            JobStatus::Killed => "KILLED",
        }
    }

    /// 静态分类。暂停的作业在恢复时还需根据任务计数决定其队列
    pub fn class(&self) -> JobStatusClass {
        match self {
            JobStatus::Pending => JobStatusClass::Pending,
            JobStatus::Running | JobStatus::Stalled | JobStatus::Paused | JobStatus::InError => {
                JobStatusClass::Running
            }
            JobStatus::Finished | JobStatus::Canceled | JobStatus::Failed | JobStatus::Killed => {
                JobStatusClass::Finished
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.class() == JobStatusClass::Finished
    }

    pub fn is_not_finished(&self) -> bool {
        !self.is_finished()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| SchedulerError::Serialization(format!("无效的作业状态: {s}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Submitted,
    Pending,
    Paused,
    Running,
    WaitingOnError,
    WaitingOnFailure,
    InError,
    Failed,
    NotStarted,
    NotRestarted,
    Aborted,
    Faulty,
    Finished,
    Skipped,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 14] = [
        TaskStatus::Submitted,
        TaskStatus::Pending,
        TaskStatus::Paused,
        TaskStatus::Running,
        TaskStatus::WaitingOnError,
        TaskStatus::WaitingOnFailure,
        TaskStatus::InError,
        TaskStatus::Failed,
        TaskStatus::NotStarted,
        TaskStatus::NotRestarted,
        TaskStatus::Aborted,
        TaskStatus::Faulty,
        TaskStatus::Finished,
        TaskStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Paused => "PAUSED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::WaitingOnError => "WAITING_ON_ERROR",
            TaskStatus::WaitingOnFailure => "WAITING_ON_FAILURE",
            TaskStatus::InError => "IN_ERROR",
            TaskStatus::Failed => "FAILED",
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::NotRestarted => "NOT_RESTARTED",
            TaskStatus::Aborted => "ABORTED",
            TaskStatus::Faulty => "FAULTY",
            TaskStatus::Finished => "FINISHED",
            TaskStatus::Skipped => "SKIPPED",
        }
    }

    /// 终态任务不会再被执行，恢复过程不会修改其状态
    pub fn is_terminal(&self) -> bool {
        match self {
            TaskStatus::Finished
            | TaskStatus::Failed
            | TaskStatus::Faulty
            | TaskStatus::Aborted
            | TaskStatus::Skipped
            | TaskStatus::NotStarted
            | TaskStatus::NotRestarted => true,
            TaskStatus::Submitted
            | TaskStatus::Pending
            | TaskStatus::Paused
            | TaskStatus::Running
            | TaskStatus::WaitingOnError
            | TaskStatus::WaitingOnFailure
            | TaskStatus::InError => false,
        }
    }

    pub fn counter(&self) -> Option<TaskCounter> {
        match self {
            TaskStatus::Submitted | TaskStatus::Pending => Some(TaskCounter::Pending),
            TaskStatus::Running => Some(TaskCounter::Running),
            TaskStatus::Finished => Some(TaskCounter::Finished),
            TaskStatus::Paused
            | TaskStatus::WaitingOnError
            | TaskStatus::WaitingOnFailure
            | TaskStatus::InError
            | TaskStatus::Failed
            | TaskStatus::NotStarted
            | TaskStatus::NotRestarted
            | TaskStatus::Aborted
            | TaskStatus::Faulty
            | TaskStatus::Skipped => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| SchedulerError::Serialization(format!("无效的任务状态: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    /// 作业内唯一
    pub name: String,
    pub status: TaskStatus,
    /// 同一作业内父任务的 ID
    pub parents: Vec<i64>,
}

impl Task {
    pub fn new(id: i64, name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id,
            name: name.into(),
            status,
            parents: Vec::new(),
        }
    }

    pub fn with_parents(mut self, parents: Vec<i64>) -> Self {
        self.parents = parents;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub number_of_pending_tasks: u32,
    pub number_of_running_tasks: u32,
    pub number_of_finished_tasks: u32,
    pub tasks: Vec<Task>,
}

impl Job {
    pub fn new(id: i64, name: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id,
            name: name.into(),
            owner: String::new(),
            status,
            submitted_at: Utc::now(),
            finished_at: None,
            number_of_pending_tasks: 0,
            number_of_running_tasks: 0,
            number_of_finished_tasks: 0,
            tasks: Vec::new(),
        }
    }

    pub fn counters(&self) -> TaskCounters {
        TaskCounters {
            pending: self.number_of_pending_tasks,
            running: self.number_of_running_tasks,
            finished: self.number_of_finished_tasks,
        }
    }

    pub fn set_counters(&mut self, counters: TaskCounters) {
        self.number_of_pending_tasks = counters.pending;
        self.number_of_running_tasks = counters.running;
        self.number_of_finished_tasks = counters.finished;
    }

    /// 按任务当前状态重新计算计数器，返回计数器是否发生变化
    pub fn recompute_counters(&mut self) -> bool {
        let counters = TaskCounters::from_tasks(&self.tasks);
        let changed = counters != self.counters();
        self.set_counters(counters);
        changed
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.name == name)
    }

    pub fn total_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn entity_description(&self) -> String {
        format!("作业 '{}' (ID: {}, 状态: {})", self.name, self.id, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_text_round_trip() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_task_status_serde_matches_text_form() {
        for status in TaskStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_job_status_classification() {
        assert_eq!(JobStatus::Pending.class(), JobStatusClass::Pending);
        assert_eq!(JobStatus::Paused.class(), JobStatusClass::Running);
        assert_eq!(JobStatus::InError.class(), JobStatusClass::Running);
        assert_eq!(JobStatus::Stalled.class(), JobStatusClass::Running);
        assert!(JobStatus::Killed.is_finished());
        assert!(JobStatus::Running.is_not_finished());
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = TaskStatus::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![
                TaskStatus::Failed,
                TaskStatus::NotStarted,
                TaskStatus::NotRestarted,
                TaskStatus::Aborted,
                TaskStatus::Faulty,
                TaskStatus::Finished,
                TaskStatus::Skipped,
            ]
        );
    }

    #[test]
    fn test_recompute_counters_reports_change() {
        let mut job = Job::new(1, "job", JobStatus::Running);
        job.tasks = vec![
            Task::new(1, "Ta", TaskStatus::Running),
            Task::new(2, "Tb", TaskStatus::Finished),
        ];
        assert!(job.recompute_counters());
        assert_eq!(job.number_of_running_tasks, 1);
        assert_eq!(job.number_of_finished_tasks, 1);
        assert!(!job.recompute_counters());
    }

    #[test]
    fn test_task_lookup_by_name() {
        let mut job = Job::new(1, "job", JobStatus::Pending);
        job.tasks = vec![Task::new(1, "Ta", TaskStatus::Pending).with_parents(vec![])];
        assert_eq!(job.task("Ta").map(|t| t.id), Some(1));
        assert!(job.task("Tz").is_none());
    }
}
