use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scheduler_core::{SchedulerError, SchedulerResult};
use scheduler_domain::{
    Job, JobRepository, JobStatus, Task, FINISHED_JOB_STATUSES, NOT_FINISHED_JOB_STATUSES,
};
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::database::mapping::MappingHelpers;

const JOB_COLUMNS: &str = "id, name, owner, status, submitted_at, finished_at, \
     number_of_pending_tasks, number_of_running_tasks, number_of_finished_tasks";

pub struct SqliteJobRepository {
    pool: SqlitePool,
    batch_size: usize,
}

impl SqliteJobRepository {
    /// `batch_size` 为批量加载任务时每条查询包含的作业数
    pub fn new(pool: SqlitePool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }

    /// 创建嵌入式SQLite作业仓库，自动初始化数据库
    pub async fn new_embedded(database_path: &str, batch_size: usize) -> SchedulerResult<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("Creating embedded SQLite job repository at: {}", database_path);

        let connect_options = SqliteConnectOptions::from_str(database_path)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(connect_options)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self::new(pool, batch_size))
    }

    /// 运行数据库迁移
    pub async fn run_migrations(pool: &SqlitePool) -> SchedulerResult<()> {
        debug!("Running SQLite database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                owner TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                submitted_at INTEGER NOT NULL,
                finished_at INTEGER,
                number_of_pending_tasks INTEGER NOT NULL DEFAULT 0,
                number_of_running_tasks INTEGER NOT NULL DEFAULT 0,
                number_of_finished_tasks INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                job_id INTEGER NOT NULL,
                id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                parents TEXT NOT NULL DEFAULT '[]',
                PRIMARY KEY (job_id, id),
                FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)",
            "CREATE INDEX IF NOT EXISTS idx_jobs_submitted_at ON jobs(submitted_at)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_job_id ON tasks(job_id)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        debug!("Successfully completed SQLite database migrations");
        Ok(())
    }

    /// 写入作业及其任务，已存在的同 ID 作业被整体替换
    #[instrument(skip(self, job), fields(job_id = %job.id, job_status = %job.status))]
    pub async fn save_job(&self, job: &Job) -> SchedulerResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO jobs (id, name, owner, status, submitted_at, finished_at,
                number_of_pending_tasks, number_of_running_tasks, number_of_finished_tasks)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(job.id)
        .bind(&job.name)
        .bind(&job.owner)
        .bind(job.status.as_str())
        .bind(job.submitted_at.timestamp_millis())
        .bind(job.finished_at.map(|at| at.timestamp_millis()))
        .bind(i64::from(job.number_of_pending_tasks))
        .bind(i64::from(job.number_of_running_tasks))
        .bind(i64::from(job.number_of_finished_tasks))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM tasks WHERE job_id = ?1")
            .bind(job.id)
            .execute(&mut *tx)
            .await?;

        for (position, task) in job.tasks.iter().enumerate() {
            let parents_json = serde_json::to_string(&task.parents)?;
            sqlx::query(
                "INSERT INTO tasks (job_id, id, position, name, status, parents) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(job.id)
            .bind(task.id)
            .bind(position as i64)
            .bind(&task.name)
            .bind(task.status.as_str())
            .bind(parents_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("保存{}成功，包含 {} 个任务", job.entity_description(), job.tasks.len());
        Ok(())
    }

    fn row_to_job(row: &SqliteRow) -> SchedulerResult<Job> {
        use sqlx::Row;

        Ok(Job {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            owner: row.try_get("owner")?,
            status: MappingHelpers::parse_job_status(row, "status")?,
            submitted_at: MappingHelpers::parse_timestamp(row, "submitted_at")?,
            finished_at: MappingHelpers::parse_optional_timestamp(row, "finished_at")?,
            number_of_pending_tasks: MappingHelpers::parse_counter(row, "number_of_pending_tasks")?,
            number_of_running_tasks: MappingHelpers::parse_counter(row, "number_of_running_tasks")?,
            number_of_finished_tasks: MappingHelpers::parse_counter(
                row,
                "number_of_finished_tasks",
            )?,
            tasks: Vec::new(),
        })
    }

    fn row_to_task(row: &SqliteRow) -> SchedulerResult<(i64, Task)> {
        use sqlx::Row;

        let job_id: i64 = row.try_get("job_id")?;
        let task = Task {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            status: MappingHelpers::parse_task_status(row, "status")?,
            parents: MappingHelpers::parse_parents(row, "parents")?,
        };
        Ok((job_id, task))
    }

    async fn load_jobs(
        &self,
        statuses: &[JobStatus],
        include_tasks: bool,
        submitted_since: Option<DateTime<Utc>>,
    ) -> SchedulerResult<Vec<Job>> {
        let mut sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status IN ({})",
            MappingHelpers::placeholders(statuses.len(), 0)
        );
        if submitted_since.is_some() {
            sql.push_str(&format!(" AND submitted_at >= ?{}", statuses.len() + 1));
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        if let Some(cutoff) = submitted_since {
            query = query.bind(cutoff.timestamp_millis());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            SchedulerError::DatabaseOperation(format!("查询作业失败: {e}"))
        })?;

        let mut jobs = rows
            .iter()
            .map(Self::row_to_job)
            .collect::<SchedulerResult<Vec<_>>>()?;

        if include_tasks {
            self.attach_tasks(&mut jobs).await?;
        }

        Ok(jobs)
    }

    /// 按批次加载作业的任务，每批最多 `batch_size` 个作业
    async fn attach_tasks(&self, jobs: &mut [Job]) -> SchedulerResult<()> {
        let job_ids: Vec<i64> = jobs.iter().map(|job| job.id).collect();
        let mut tasks_by_job: HashMap<i64, Vec<Task>> = HashMap::new();

        for chunk in job_ids.chunks(self.batch_size) {
            let sql = format!(
                "SELECT job_id, id, name, status, parents FROM tasks WHERE job_id IN ({}) ORDER BY job_id, position",
                MappingHelpers::placeholders(chunk.len(), 0)
            );

            let mut query = sqlx::query(&sql);
            for &job_id in chunk {
                query = query.bind(job_id);
            }

            let rows = query.fetch_all(&self.pool).await.map_err(|e| {
                SchedulerError::DatabaseOperation(format!(
                    "批量查询{}个作业的任务失败: {e}",
                    chunk.len()
                ))
            })?;

            for row in &rows {
                let (job_id, task) = Self::row_to_task(row)?;
                tasks_by_job.entry(job_id).or_default().push(task);
            }
        }

        for job in jobs.iter_mut() {
            job.tasks = tasks_by_job.remove(&job.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    #[instrument(skip(self))]
    async fn load_not_finished_jobs(&self, include_tasks: bool) -> SchedulerResult<Vec<Job>> {
        let jobs = self
            .load_jobs(&NOT_FINISHED_JOB_STATUSES, include_tasks, None)
            .await?;
        debug!("查询到 {} 个未结束的作业", jobs.len());
        Ok(jobs)
    }

    #[instrument(skip(self))]
    async fn load_finished_jobs(
        &self,
        include_tasks: bool,
        submitted_since: Option<DateTime<Utc>>,
    ) -> SchedulerResult<Vec<Job>> {
        let jobs = self
            .load_jobs(&FINISHED_JOB_STATUSES, include_tasks, submitted_since)
            .await?;
        debug!("查询到 {} 个已结束的作业", jobs.len());
        Ok(jobs)
    }
}
