//! Test data builders for creating test entities
//!
//! This module provides builder patterns for creating test data with
//! sensible defaults and easy customization.

use chrono::{DateTime, TimeZone, Utc};
use scheduler_domain::{Job, JobStatus, Task, TaskCounters, TaskStatus};

/// Names of the tasks created by [`JobBuilder::with_default_tasks`]
pub const DEFAULT_TASK_NAMES: [&str; 3] = ["Ta", "Tb", "Tc"];

/// Builder for creating test Task entities
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: Task {
                id: 1,
                name: "test_task".to_string(),
                status: TaskStatus::Pending,
                parents: vec![],
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn with_parents(mut self, parents: Vec<i64>) -> Self {
        self.task.parents = parents;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Job entities
///
/// Counters are derived from the task statuses on `build()` unless
/// explicitly set with `with_counters`.
pub struct JobBuilder {
    job: Job,
    counters: Option<TaskCounters>,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self {
            job: Job {
                id: 1,
                name: "test_job".to_string(),
                owner: "admin".to_string(),
                status: JobStatus::Pending,
                submitted_at: Utc::now(),
                finished_at: None,
                number_of_pending_tasks: 0,
                number_of_running_tasks: 0,
                number_of_finished_tasks: 0,
                tasks: vec![],
            },
            counters: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.job.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.job.name = name.to_string();
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.job.owner = owner.to_string();
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        if status.is_finished() && self.job.finished_at.is_none() {
            self.job.finished_at = Some(self.job.submitted_at);
        }
        self
    }

    pub fn with_submitted_at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.job.submitted_at = submitted_at;
        self
    }

    pub fn with_submitted_at_millis(self, millis: i64) -> Self {
        let submitted_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(Utc::now);
        self.with_submitted_at(submitted_at)
    }

    pub fn with_finished_at(mut self, finished_at: Option<DateTime<Utc>>) -> Self {
        self.job.finished_at = finished_at;
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.job.tasks.push(task);
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.job.tasks = tasks;
        self
    }

    /// Three tasks `Ta`, `Tb`, `Tc` where `Tb` and `Tc` depend on `Ta`,
    /// listed children first so that recovery has to reorder them.
    pub fn with_default_tasks(mut self, status: TaskStatus) -> Self {
        let base = self.job.id * 100;
        self.job.tasks = vec![
            Task::new(base + 2, DEFAULT_TASK_NAMES[1], status).with_parents(vec![base + 1]),
            Task::new(base + 3, DEFAULT_TASK_NAMES[2], status).with_parents(vec![base + 1]),
            Task::new(base + 1, DEFAULT_TASK_NAMES[0], status),
        ];
        self
    }

    /// Change the status of the named tasks
    pub fn with_task_statuses(mut self, statuses: &[(&str, TaskStatus)]) -> Self {
        for (name, status) in statuses {
            if let Some(task) = self.job.tasks.iter_mut().find(|t| t.name == *name) {
                task.status = *status;
            }
        }
        self
    }

    pub fn with_counters(mut self, pending: u32, running: u32, finished: u32) -> Self {
        self.counters = Some(TaskCounters {
            pending,
            running,
            finished,
        });
        self
    }

    pub fn build(mut self) -> Job {
        let counters = self
            .counters
            .unwrap_or_else(|| TaskCounters::from_tasks(&self.job.tasks));
        self.job.set_counters(counters);
        self.job
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}
