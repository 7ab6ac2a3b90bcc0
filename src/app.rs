use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use scheduler_core::AppConfig;
use scheduler_dispatcher::{RecoveredSchedulerState, RecoveryService, SchedulerStateRecoveryService};
use scheduler_infrastructure::DatabaseManager;
use tracing::{error, info};

/// 主应用程序
pub struct Application {
    config: AppConfig,
    db_manager: DatabaseManager,
    recovery_service: SchedulerStateRecoveryService,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化应用程序");

        let db_manager = DatabaseManager::new(&config.database)
            .await
            .context("创建数据库连接池失败")?;
        db_manager
            .health_check()
            .await
            .context("数据库健康检查失败")?;

        let job_repo = db_manager
            .job_repository(config.recovery.load_jobs_batch_size)
            .await
            .context("初始化作业存储失败")?;

        let recovery_service = SchedulerStateRecoveryService::new(Arc::new(job_repo));

        Ok(Self {
            config,
            db_manager,
            recovery_service,
        })
    }

    /// 从存储恢复调度器状态
    pub async fn run(&self) -> Result<RecoveredSchedulerState> {
        let cutoff = self
            .config
            .recovery
            .finished_jobs_cutoff(Utc::now())
            .context("计算已结束作业的加载时间窗口失败")?;
        match cutoff {
            Some(cutoff) => info!("仅加载 {} 之后提交的已结束作业", cutoff),
            None => info!("加载全部已结束作业"),
        }

        let state = match self.recovery_service.recover(cutoff).await {
            Ok(state) => state,
            Err(e) => {
                error!("调度器状态恢复失败: {e}");
                return Err(e).context("调度器状态恢复失败");
            }
        };

        let summary = state.scheduler_state().summary();
        info!(
            "恢复的调度器状态: 待调度作业 {} 个，运行中作业 {} 个，已结束作业 {} 个；任务 待执行 {} 个，执行中 {} 个，已完成 {} 个",
            summary.pending_jobs,
            summary.running_jobs,
            summary.finished_jobs,
            summary.tasks.pending,
            summary.tasks.running,
            summary.tasks.finished
        );

        Ok(state)
    }

    pub async fn shutdown(&self) {
        self.db_manager.close().await;
        info!("数据库连接已关闭");
    }
}
