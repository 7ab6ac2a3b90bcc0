use tracing::debug;

use scheduler_core::{SchedulerError, SchedulerResult};
use scheduler_domain::{Job, JobStatus, Task, TaskStatus};

use crate::topological_sorter::TopologicalSorter;

/// 单个作业的状态校正结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub tasks_reset_to_pending: usize,
    pub tasks_paused: usize,
    pub escalated_to_stalled: bool,
    pub counters_corrected: bool,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// 任务状态校正接口
///
/// 从存储加载的未结束作业在进入调度器前需要校正：崩溃前仍在运行的任务、
/// 暂停作业中的活动任务以及过期的计数器都要恢复到一致状态。
pub trait TaskStatusReconciler: Send + Sync {
    fn reconcile(&self, job: &mut Job) -> SchedulerResult<ReconcileOutcome>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultTaskStatusReconciler;

impl DefaultTaskStatusReconciler {
    pub fn new() -> Self {
        Self
    }

    /// 复制任务列表并按依赖顺序排列
    pub fn copy_and_sort(&self, tasks: &[Task]) -> SchedulerResult<Vec<Task>> {
        Ok(TopologicalSorter::sort(Some(tasks))?
            .into_iter()
            .cloned()
            .collect())
    }

    fn pause_active_tasks(tasks: &mut [Task]) -> usize {
        let mut paused = 0;
        for task in tasks
            .iter_mut()
            .filter(|t| !t.status.is_terminal() && t.status != TaskStatus::Paused)
        {
            task.status = TaskStatus::Paused;
            paused += 1;
        }
        paused
    }

    // 执行这些任务的 Worker 在重启后已不可知，只能重新分发
    fn reset_running_tasks(tasks: &mut [Task]) -> usize {
        let mut reset = 0;
        for task in tasks.iter_mut().filter(|t| t.status == TaskStatus::Running) {
            task.status = TaskStatus::Pending;
            reset += 1;
        }
        reset
    }
}

impl TaskStatusReconciler for DefaultTaskStatusReconciler {
    fn reconcile(&self, job: &mut Job) -> SchedulerResult<ReconcileOutcome> {
        let mut tasks = self.copy_and_sort(&job.tasks)?;

        let mut outcome = ReconcileOutcome::default();
        match job.status {
            JobStatus::Paused => {
                outcome.tasks_paused = Self::pause_active_tasks(&mut tasks);
            }
            JobStatus::Running => {
                outcome.tasks_reset_to_pending = Self::reset_running_tasks(&mut tasks);
                job.status = JobStatus::Stalled;
                outcome.escalated_to_stalled = true;
            }
            JobStatus::Pending | JobStatus::Stalled | JobStatus::InError => {
                outcome.tasks_reset_to_pending = Self::reset_running_tasks(&mut tasks);
            }
            JobStatus::Finished | JobStatus::Canceled | JobStatus::Failed | JobStatus::Killed => {
                return Err(SchedulerError::reconciliation(
                    job.id,
                    format!("已结束的作业不能被校正: {}", job.status),
                ));
            }
        }

        job.tasks = tasks;
        outcome.counters_corrected = job.recompute_counters();

        debug!(
            "作业 {} 校正完成: 重置 {} 个任务, 暂停 {} 个任务, 升级为STALLED: {}",
            job.id,
            outcome.tasks_reset_to_pending,
            outcome.tasks_paused,
            outcome.escalated_to_stalled
        );

        Ok(outcome)
    }
}
