use chrono::{TimeZone, Utc};
use scheduler_core::config::models::DatabaseConfig;
use scheduler_core::SchedulerError;
use scheduler_domain::{JobRepository, JobStatus, TaskStatus};
use scheduler_infrastructure::{DatabaseManager, SqliteJobRepository};
use scheduler_testing_utils::{JobBuilder, TaskBuilder};
use tempfile::TempDir;

/// 测试数据库设置辅助函数
async fn setup_repository(batch_size: usize) -> (TempDir, SqliteJobRepository) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("jobs.db").display());
    let repo = SqliteJobRepository::new_embedded(&url, batch_size)
        .await
        .unwrap();
    (dir, repo)
}

#[tokio::test]
async fn test_save_and_load_job_with_tasks() {
    let (_dir, repo) = setup_repository(10).await;

    let job = JobBuilder::new()
        .with_id(7)
        .with_name("nightly")
        .with_owner("alice")
        .with_status(JobStatus::Running)
        .with_submitted_at_millis(1_000)
        .with_default_tasks(TaskStatus::Running)
        .with_task_statuses(&[("Ta", TaskStatus::Finished)])
        .build();
    repo.save_job(&job).await.unwrap();

    let loaded = repo.load_not_finished_jobs(true).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], job);
}

#[tokio::test]
async fn test_queries_split_by_status_and_order_by_id() {
    let (_dir, repo) = setup_repository(10).await;

    let statuses = [
        (5, JobStatus::Pending),
        (1, JobStatus::Finished),
        (4, JobStatus::InError),
        (2, JobStatus::Paused),
        (3, JobStatus::Killed),
    ];
    for (id, status) in statuses {
        repo.save_job(&JobBuilder::new().with_id(id).with_status(status).build())
            .await
            .unwrap();
    }

    let not_finished: Vec<i64> = repo
        .load_not_finished_jobs(false)
        .await
        .unwrap()
        .iter()
        .map(|job| job.id)
        .collect();
    let finished: Vec<i64> = repo
        .load_finished_jobs(false, None)
        .await
        .unwrap()
        .iter()
        .map(|job| job.id)
        .collect();

    assert_eq!(not_finished, vec![2, 4, 5]);
    assert_eq!(finished, vec![1, 3]);
}

#[tokio::test]
async fn test_finished_jobs_cutoff_is_inclusive() {
    let (_dir, repo) = setup_repository(10).await;

    for i in 0..5 {
        let job = JobBuilder::new()
            .with_id(i + 1)
            .with_status(JobStatus::Finished)
            .with_submitted_at_millis(i)
            .build();
        repo.save_job(&job).await.unwrap();
    }

    let cutoff = Utc.timestamp_millis_opt(3).single();
    let finished = repo.load_finished_jobs(false, cutoff).await.unwrap();
    assert_eq!(finished.iter().map(|j| j.id).collect::<Vec<_>>(), vec![4, 5]);

    let all = repo.load_finished_jobs(false, None).await.unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn test_tasks_loaded_across_batches() {
    let (_dir, repo) = setup_repository(2).await;

    for id in 1..=5 {
        let job = JobBuilder::new()
            .with_id(id)
            .with_status(JobStatus::Pending)
            .with_default_tasks(TaskStatus::Pending)
            .build();
        repo.save_job(&job).await.unwrap();
    }

    let jobs = repo.load_not_finished_jobs(true).await.unwrap();
    assert_eq!(jobs.len(), 5);
    for job in &jobs {
        assert_eq!(job.tasks.len(), 3);
        assert!(job.tasks.iter().all(|t| t.id / 100 == job.id));
        // 保留写入顺序
        assert_eq!(job.tasks[2].name, "Ta");
        assert_eq!(job.tasks[0].parents, vec![job.id * 100 + 1]);
    }

    let without_tasks = repo.load_not_finished_jobs(false).await.unwrap();
    assert!(without_tasks.iter().all(|job| job.tasks.is_empty()));
}

#[tokio::test]
async fn test_save_job_replaces_previous_tasks() {
    let (_dir, repo) = setup_repository(10).await;

    let job = JobBuilder::new()
        .with_id(1)
        .with_status(JobStatus::Running)
        .with_default_tasks(TaskStatus::Running)
        .build();
    repo.save_job(&job).await.unwrap();

    let job = JobBuilder::new()
        .with_id(1)
        .with_status(JobStatus::Stalled)
        .with_task(TaskBuilder::new().with_id(9).with_name("only").build())
        .build();
    repo.save_job(&job).await.unwrap();

    let jobs = repo.load_not_finished_jobs(true).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Stalled);
    assert_eq!(jobs[0].tasks.len(), 1);
    assert_eq!(jobs[0].tasks[0].name, "only");
}

#[tokio::test]
async fn test_unknown_task_status_is_serialization_error() {
    let (dir, repo) = setup_repository(10).await;

    let job = JobBuilder::new()
        .with_id(1)
        .with_status(JobStatus::Pending)
        .with_task(TaskBuilder::new().with_id(1).build())
        .build();
    repo.save_job(&job).await.unwrap();

    let url = format!("sqlite://{}", dir.path().join("jobs.db").display());
    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query("UPDATE tasks SET status = 'EXPLODED'")
        .execute(&pool)
        .await
        .unwrap();

    let err = repo.load_not_finished_jobs(true).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Serialization(_)));
}

#[tokio::test]
async fn test_database_manager_health_check() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("scheduler.db").display()),
        ..DatabaseConfig::default()
    };

    let manager = DatabaseManager::new(&config).await.unwrap();
    manager.health_check().await.unwrap();

    let repo = manager.job_repository(50).await.unwrap();
    assert!(repo.load_not_finished_jobs(true).await.unwrap().is_empty());
    manager.close().await;
}
