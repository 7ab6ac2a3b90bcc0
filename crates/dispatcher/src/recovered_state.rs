use serde::{Deserialize, Serialize};

use scheduler_domain::{Job, JobView, TaskCounters};

/// 恢复后交给调度器的作业
#[derive(Debug, Clone, Default)]
pub struct RecoveredJobs {
    pub pending: Vec<Job>,
    pub running: Vec<Job>,
    pub finished: Vec<Job>,
}

/// 恢复结果：三个作业队列及面向客户端的状态快照
///
/// 构造后不可修改；调度器之后操作的是通过 [`RecoveredSchedulerState::into_jobs`]
/// 取出的作业本身。
#[derive(Debug, Clone)]
pub struct RecoveredSchedulerState {
    pending_jobs: Vec<Job>,
    running_jobs: Vec<Job>,
    finished_jobs: Vec<Job>,
    scheduler_state: SchedulerStateSnapshot,
}

impl RecoveredSchedulerState {
    pub fn new(pending_jobs: Vec<Job>, running_jobs: Vec<Job>, finished_jobs: Vec<Job>) -> Self {
        let scheduler_state =
            SchedulerStateSnapshot::from_jobs(&pending_jobs, &running_jobs, &finished_jobs);
        Self {
            pending_jobs,
            running_jobs,
            finished_jobs,
            scheduler_state,
        }
    }

    pub fn pending_jobs(&self) -> &[Job] {
        &self.pending_jobs
    }

    pub fn running_jobs(&self) -> &[Job] {
        &self.running_jobs
    }

    pub fn finished_jobs(&self) -> &[Job] {
        &self.finished_jobs
    }

    pub fn scheduler_state(&self) -> &SchedulerStateSnapshot {
        &self.scheduler_state
    }

    pub fn total_jobs(&self) -> usize {
        self.pending_jobs.len() + self.running_jobs.len() + self.finished_jobs.len()
    }

    pub fn into_jobs(self) -> RecoveredJobs {
        RecoveredJobs {
            pending: self.pending_jobs,
            running: self.running_jobs,
            finished: self.finished_jobs,
        }
    }
}

/// 调度器状态快照
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulerStateSnapshot {
    pending_jobs: Vec<JobView>,
    running_jobs: Vec<JobView>,
    finished_jobs: Vec<JobView>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub pending_jobs: usize,
    pub running_jobs: usize,
    pub finished_jobs: usize,
    pub tasks: TaskCounters,
}

impl SchedulerStateSnapshot {
    pub fn from_jobs(pending: &[Job], running: &[Job], finished: &[Job]) -> Self {
        let project = |jobs: &[Job]| jobs.iter().map(JobView::from).collect::<Vec<_>>();
        Self {
            pending_jobs: project(pending),
            running_jobs: project(running),
            finished_jobs: project(finished),
        }
    }

    pub fn pending_jobs(&self) -> &[JobView] {
        &self.pending_jobs
    }

    pub fn running_jobs(&self) -> &[JobView] {
        &self.running_jobs
    }

    pub fn finished_jobs(&self) -> &[JobView] {
        &self.finished_jobs
    }

    pub fn total_jobs(&self) -> usize {
        self.pending_jobs.len() + self.running_jobs.len() + self.finished_jobs.len()
    }

    fn all_jobs(&self) -> impl Iterator<Item = &JobView> {
        self.pending_jobs
            .iter()
            .chain(&self.running_jobs)
            .chain(&self.finished_jobs)
    }

    pub fn job(&self, id: i64) -> Option<&JobView> {
        self.all_jobs().find(|view| view.id == id)
    }

    pub fn summary(&self) -> SnapshotSummary {
        let tasks = self
            .all_jobs()
            .fold(TaskCounters::default(), |mut acc, view| {
                acc.pending += view.number_of_pending_tasks;
                acc.running += view.number_of_running_tasks;
                acc.finished += view.number_of_finished_tasks;
                acc
            });

        SnapshotSummary {
            pending_jobs: self.pending_jobs.len(),
            running_jobs: self.running_jobs.len(),
            finished_jobs: self.finished_jobs.len(),
            tasks,
        }
    }
}
