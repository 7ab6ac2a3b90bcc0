use chrono::{Duration, Utc};
use scheduler::Application;
use scheduler_core::AppConfig;
use scheduler_domain::{JobStatus, TaskStatus};
use scheduler_infrastructure::DatabaseManager;
use scheduler_testing_utils::JobBuilder;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("scheduler.db").display());
    config
}

async fn seed(config: &AppConfig, jobs: Vec<scheduler_domain::Job>) {
    let manager = DatabaseManager::new(&config.database).await.unwrap();
    let repo = manager.job_repository(10).await.unwrap();
    for job in &jobs {
        repo.save_job(job).await.unwrap();
    }
    manager.close().await;
}

#[tokio::test]
async fn test_recovery_from_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    seed(
        &config,
        vec![
            JobBuilder::new()
                .with_id(1)
                .with_status(JobStatus::Pending)
                .with_default_tasks(TaskStatus::Pending)
                .build(),
            JobBuilder::new()
                .with_id(2)
                .with_status(JobStatus::Running)
                .with_default_tasks(TaskStatus::Running)
                .build(),
            JobBuilder::new()
                .with_id(3)
                .with_status(JobStatus::Paused)
                .with_default_tasks(TaskStatus::Paused)
                .build(),
            JobBuilder::new()
                .with_id(4)
                .with_status(JobStatus::Finished)
                .with_default_tasks(TaskStatus::Finished)
                .build(),
        ],
    )
    .await;

    let app = Application::new(config).await.unwrap();
    let state = app.run().await.unwrap();
    app.shutdown().await;

    let pending: Vec<i64> = state.pending_jobs().iter().map(|j| j.id).collect();
    let running: Vec<i64> = state.running_jobs().iter().map(|j| j.id).collect();
    let finished: Vec<i64> = state.finished_jobs().iter().map(|j| j.id).collect();
    assert_eq!(pending, vec![1, 3]);
    assert_eq!(running, vec![2]);
    assert_eq!(finished, vec![4]);

    let stalled = &state.running_jobs()[0];
    assert_eq!(stalled.status, JobStatus::Stalled);
    assert!(stalled.tasks.iter().all(|t| t.status == TaskStatus::Pending));
    assert_eq!(stalled.number_of_pending_tasks, 3);
    assert_eq!(stalled.number_of_running_tasks, 0);

    // 已结束作业不加载任务
    assert!(state.finished_jobs()[0].tasks.is_empty());

    let summary = state.scheduler_state().summary();
    assert_eq!(summary.pending_jobs, 2);
    assert_eq!(summary.running_jobs, 1);
    assert_eq!(summary.finished_jobs, 1);
}

#[tokio::test]
async fn test_finished_job_load_period_limits_history() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.recovery.finished_job_load_period = Some("1h".to_string());

    let now = Utc::now();
    seed(
        &config,
        vec![
            JobBuilder::new()
                .with_id(1)
                .with_status(JobStatus::Finished)
                .with_submitted_at(now - Duration::days(2))
                .build(),
            JobBuilder::new()
                .with_id(2)
                .with_status(JobStatus::Killed)
                .with_submitted_at(now - Duration::minutes(5))
                .build(),
        ],
    )
    .await;

    let app = Application::new(config).await.unwrap();
    let state = app.run().await.unwrap();
    app.shutdown().await;

    assert_eq!(state.finished_jobs().len(), 1);
    assert_eq!(state.finished_jobs()[0].id, 2);
}

#[tokio::test]
async fn test_empty_store_recovers_empty_state() {
    let dir = TempDir::new().unwrap();
    let app = Application::new(test_config(&dir)).await.unwrap();
    let state = app.run().await.unwrap();
    app.shutdown().await;

    assert_eq!(state.total_jobs(), 0);
}
