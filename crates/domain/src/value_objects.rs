use serde::{Deserialize, Serialize};

use crate::entities::{JobStatus, Task};

/// 作业状态分类：调度器的待调度、运行中、已结束三个队列
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatusClass {
    Pending,
    Running,
    Finished,
}

/// 作业计数器对应的任务类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskCounter {
    Pending,
    Running,
    Finished,
}

pub const FINISHED_JOB_STATUSES: [JobStatus; 4] = [
    JobStatus::Canceled,
    JobStatus::Failed,
    JobStatus::Killed,
    JobStatus::Finished,
];

pub const PENDING_JOB_STATUSES: [JobStatus; 1] = [JobStatus::Pending];

pub const RUNNING_JOB_STATUSES: [JobStatus; 4] = [
    JobStatus::Paused,
    JobStatus::InError,
    JobStatus::Stalled,
    JobStatus::Running,
];

pub const NOT_FINISHED_JOB_STATUSES: [JobStatus; 5] = [
    JobStatus::Paused,
    JobStatus::InError,
    JobStatus::Stalled,
    JobStatus::Running,
    JobStatus::Pending,
];

/// 作业的三个聚合计数器
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCounters {
    pub pending: u32,
    pub running: u32,
    pub finished: u32,
}

impl TaskCounters {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks
            .iter()
            .filter_map(|task| task.status.counter())
            .fold(Self::default(), |mut counters, counter| {
                match counter {
                    TaskCounter::Pending => counters.pending += 1,
                    TaskCounter::Running => counters.running += 1,
                    TaskCounter::Finished => counters.finished += 1,
                }
                counters
            })
    }

    pub fn is_zero(&self) -> bool {
        self.pending == 0 && self.running == 0 && self.finished == 0
    }

    pub fn total(&self) -> u32 {
        self.pending + self.running + self.finished
    }
}
