//! In-memory mock implementation of the job store
//!
//! Behaves like a well-formed store by default: the not-finished query returns
//! jobs outside the finished-class statuses, the finished query honours the
//! submission cutoff. Tests can override either result verbatim to simulate a
//! store that breaks its contract, or make the next load fail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scheduler_core::{SchedulerError, SchedulerResult};
use scheduler_domain::{Job, JobRepository};
use std::sync::{Arc, Mutex};

/// A recorded call against [`MockJobRepository`]
#[derive(Debug, Clone, PartialEq)]
pub enum JobRepositoryCall {
    LoadNotFinished {
        include_tasks: bool,
    },
    LoadFinished {
        include_tasks: bool,
        submitted_since: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    jobs: Vec<Job>,
    not_finished_override: Option<Vec<Job>>,
    finished_override: Option<Vec<Job>>,
    fail_next_load: Option<String>,
    calls: Vec<JobRepositoryCall>,
}

/// Mock implementation of JobRepository for testing
#[derive(Debug, Clone, Default)]
pub struct MockJobRepository {
    state: Arc<Mutex<MockState>>,
}

impl MockJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        let repo = Self::new();
        repo.state.lock().unwrap().jobs = jobs;
        repo
    }

    pub fn add_job(&self, job: Job) {
        self.state.lock().unwrap().jobs.push(job);
    }

    /// Return these jobs from the not-finished query regardless of status
    pub fn set_not_finished_result(&self, jobs: Vec<Job>) {
        self.state.lock().unwrap().not_finished_override = Some(jobs);
    }

    /// Return these jobs from the finished query regardless of status or cutoff
    pub fn set_finished_result(&self, jobs: Vec<Job>) {
        self.state.lock().unwrap().finished_override = Some(jobs);
    }

    pub fn fail_next_load(&self, message: &str) {
        self.state.lock().unwrap().fail_next_load = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<JobRepositoryCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    fn project(jobs: impl Iterator<Item = Job>, include_tasks: bool) -> Vec<Job> {
        jobs.map(|mut job| {
            if !include_tasks {
                job.tasks.clear();
            }
            job
        })
        .collect()
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn load_not_finished_jobs(&self, include_tasks: bool) -> SchedulerResult<Vec<Job>> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(JobRepositoryCall::LoadNotFinished { include_tasks });

        if let Some(message) = state.fail_next_load.take() {
            return Err(SchedulerError::DatabaseOperation(message));
        }

        if let Some(jobs) = &state.not_finished_override {
            return Ok(Self::project(jobs.iter().cloned(), include_tasks));
        }

        Ok(Self::project(
            state
                .jobs
                .iter()
                .filter(|job| job.status.is_not_finished())
                .cloned(),
            include_tasks,
        ))
    }

    async fn load_finished_jobs(
        &self,
        include_tasks: bool,
        submitted_since: Option<DateTime<Utc>>,
    ) -> SchedulerResult<Vec<Job>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(JobRepositoryCall::LoadFinished {
            include_tasks,
            submitted_since,
        });

        if let Some(message) = state.fail_next_load.take() {
            return Err(SchedulerError::DatabaseOperation(message));
        }

        if let Some(jobs) = &state.finished_override {
            return Ok(Self::project(jobs.iter().cloned(), include_tasks));
        }

        Ok(Self::project(
            state
                .jobs
                .iter()
                .filter(|job| job.status.is_finished())
                .filter(|job| submitted_since.map_or(true, |cutoff| job.submitted_at >= cutoff))
                .cloned(),
            include_tasks,
        ))
    }
}
