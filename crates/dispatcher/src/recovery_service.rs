use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use tracing::{debug, error, info, instrument, warn};

use scheduler_core::{SchedulerError, SchedulerResult};
use scheduler_domain::{Job, JobRepository, JobStatus, JobStatusClass};

use crate::recovered_state::RecoveredSchedulerState;
use crate::task_reconciler::{DefaultTaskStatusReconciler, ReconcileOutcome, TaskStatusReconciler};

/// 恢复服务接口
#[async_trait]
pub trait RecoveryService: Send + Sync {
    /// 从存储重建调度器状态
    ///
    /// `finished_jobs_cutoff` 之前提交的已结束作业不会被加载，`None` 表示全部加载。
    async fn recover(
        &self,
        finished_jobs_cutoff: Option<DateTime<Utc>>,
    ) -> SchedulerResult<RecoveredSchedulerState>;
}

/// 单个作业的恢复结果
#[derive(Debug)]
enum JobRecovery {
    Reconciled(ReconcileOutcome),
    /// 校正失败，作业将被取消
    Demoted(String),
}

/// 调度器状态恢复服务实现
pub struct SchedulerStateRecoveryService {
    job_repo: Arc<dyn JobRepository>,
    reconciler: Arc<dyn TaskStatusReconciler>,
}

impl SchedulerStateRecoveryService {
    /// 创建新的恢复服务
    pub fn new(job_repo: Arc<dyn JobRepository>) -> Self {
        Self::with_reconciler(job_repo, Arc::new(DefaultTaskStatusReconciler::new()))
    }

    pub fn with_reconciler(
        job_repo: Arc<dyn JobRepository>,
        reconciler: Arc<dyn TaskStatusReconciler>,
    ) -> Self {
        Self {
            job_repo,
            reconciler,
        }
    }

    /// 存储返回的作业状态必须与查询条件一致，否则说明存储本身有缺陷
    fn ensure_query_contract(jobs: &[Job], expect_finished: bool) -> SchedulerResult<()> {
        if let Some(job) = jobs.iter().find(|job| job.status.is_finished() != expect_finished) {
            let query = if expect_finished {
                "已结束作业"
            } else {
                "未结束作业"
            };
            error!(
                "存储返回的{}中包含状态为 {} 的作业 {}",
                query, job.status, job.id
            );
            return Err(SchedulerError::illegal_state(format!(
                "{}查询返回了状态为 {} 的作业 {}",
                query, job.status, job.id
            )));
        }
        Ok(())
    }

    /// 校正单个作业，错误和 panic 都被限制在该作业内
    fn reconcile_job(&self, job: &mut Job) -> SchedulerResult<JobRecovery> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.reconciler.reconcile(job)));

        match result {
            Ok(Ok(outcome)) => Ok(JobRecovery::Reconciled(outcome)),
            Ok(Err(e)) if e.is_fatal() => Err(e),
            Ok(Err(e)) => Ok(JobRecovery::Demoted(e.to_string())),
            Err(payload) => Ok(JobRecovery::Demoted(panic_message(payload.as_ref()))),
        }
    }

    /// 根据校正后的状态决定作业进入待调度还是运行中队列
    fn classify(job: &Job) -> SchedulerResult<JobStatusClass> {
        match job.status {
            JobStatus::Pending => Ok(JobStatusClass::Pending),
            // 从未开始执行的暂停作业仍属于待调度队列
            JobStatus::Paused if job.counters().is_zero() => Ok(JobStatusClass::Pending),
            JobStatus::Paused | JobStatus::Running | JobStatus::Stalled | JobStatus::InError => {
                Ok(JobStatusClass::Running)
            }
            JobStatus::Finished | JobStatus::Canceled | JobStatus::Failed | JobStatus::Killed => {
                Err(SchedulerError::illegal_state(format!(
                    "作业 {} 校正后状态为 {}",
                    job.id, job.status
                )))
            }
        }
    }

    fn demote(job: &mut Job, reason: &str) {
        warn!(
            "作业 {} 状态恢复失败，将其标记为 CANCELED: {}",
            job.id, reason
        );
        job.status = JobStatus::Canceled;
        if job.finished_at.is_none() {
            job.finished_at = Some(Utc::now());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知的panic".to_string()
    }
}

#[async_trait]
impl RecoveryService for SchedulerStateRecoveryService {
    #[instrument(skip(self))]
    async fn recover(
        &self,
        finished_jobs_cutoff: Option<DateTime<Utc>>,
    ) -> SchedulerResult<RecoveredSchedulerState> {
        info!("开始恢复调度器状态");
        let start_time = Instant::now();

        let not_finished_jobs = self.job_repo.load_not_finished_jobs(true).await?;
        Self::ensure_query_contract(&not_finished_jobs, false)?;
        info!("加载了 {} 个未结束的作业", not_finished_jobs.len());

        let loaded_finished_jobs = self
            .job_repo
            .load_finished_jobs(false, finished_jobs_cutoff)
            .await?;
        Self::ensure_query_contract(&loaded_finished_jobs, true)?;
        info!("加载了 {} 个已结束的作业", loaded_finished_jobs.len());

        let mut pending_jobs = Vec::new();
        let mut running_jobs = Vec::new();
        let mut finished_jobs = loaded_finished_jobs;
        let mut demoted_jobs = Vec::new();

        for mut job in not_finished_jobs {
            match self.reconcile_job(&mut job)? {
                JobRecovery::Reconciled(outcome) => {
                    if !outcome.is_noop() {
                        debug!("作业 {} 的状态已校正: {:?}", job.id, outcome);
                    }
                    match Self::classify(&job)? {
                        JobStatusClass::Pending => pending_jobs.push(job),
                        JobStatusClass::Running => running_jobs.push(job),
                        JobStatusClass::Finished => finished_jobs.push(job),
                    }
                }
                JobRecovery::Demoted(reason) => {
                    Self::demote(&mut job, &reason);
                    demoted_jobs.push(job);
                }
            }
        }

        let demoted_count = demoted_jobs.len();
        finished_jobs.append(&mut demoted_jobs);

        counter!("scheduler_recovered_jobs_total", "bucket" => "pending")
            .increment(pending_jobs.len() as u64);
        counter!("scheduler_recovered_jobs_total", "bucket" => "running")
            .increment(running_jobs.len() as u64);
        counter!("scheduler_recovered_jobs_total", "bucket" => "finished")
            .increment(finished_jobs.len() as u64);
        counter!("scheduler_recovery_demoted_jobs_total").increment(demoted_count as u64);

        let duration = start_time.elapsed();
        histogram!("scheduler_recovery_duration_ms").record(duration.as_millis() as f64);

        info!(
            "调度器状态恢复完成，耗时 {}ms：待调度 {} 个，运行中 {} 个，已结束 {} 个（其中 {} 个因恢复失败被取消）",
            duration.as_millis(),
            pending_jobs.len(),
            running_jobs.len(),
            finished_jobs.len(),
            demoted_count
        );

        Ok(RecoveredSchedulerState::new(
            pending_jobs,
            running_jobs,
            finished_jobs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_domain::{Task, TaskStatus};

    #[test]
    fn test_classify_paused_job() {
        let mut job = Job::new(1, "job", JobStatus::Paused);
        job.tasks = vec![Task::new(1, "Ta", TaskStatus::Paused)];
        job.recompute_counters();
        assert_eq!(
            SchedulerStateRecoveryService::classify(&job).unwrap(),
            JobStatusClass::Pending
        );

        job.tasks.push(Task::new(2, "Tb", TaskStatus::Finished));
        job.recompute_counters();
        assert_eq!(
            SchedulerStateRecoveryService::classify(&job).unwrap(),
            JobStatusClass::Running
        );
    }

    #[test]
    fn test_classify_rejects_finished_status() {
        let job = Job::new(1, "job", JobStatus::Failed);
        let err = SchedulerStateRecoveryService::classify(&job).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_query_contract() {
        let jobs = vec![Job::new(1, "a", JobStatus::Running), Job::new(2, "b", JobStatus::Killed)];
        assert!(SchedulerStateRecoveryService::ensure_query_contract(&jobs, false).is_err());
        assert!(SchedulerStateRecoveryService::ensure_query_contract(&jobs[..1], false).is_ok());
        assert!(SchedulerStateRecoveryService::ensure_query_contract(&jobs[1..], true).is_ok());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("bouh!");
        assert_eq!(panic_message(payload.as_ref()), "bouh!");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "未知的panic");
    }
}
