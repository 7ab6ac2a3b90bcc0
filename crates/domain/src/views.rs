//! 面向客户端的只读作业视图

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Job, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobView {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub number_of_pending_tasks: u32,
    pub number_of_running_tasks: u32,
    pub number_of_finished_tasks: u32,
    pub total_tasks: usize,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            owner: job.owner.clone(),
            status: job.status,
            submitted_at: job.submitted_at,
            finished_at: job.finished_at,
            number_of_pending_tasks: job.number_of_pending_tasks,
            number_of_running_tasks: job.number_of_running_tasks,
            number_of_finished_tasks: job.number_of_finished_tasks,
            total_tasks: job.total_tasks(),
        }
    }
}
