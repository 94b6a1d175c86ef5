//! Job queue repository implementation.
//!
//! The job table is append-only: completed and failed rows are retained as
//! an audit trail. The claim transition is the one concurrency-sensitive
//! primitive in the system; it is a single compare-and-set UPDATE, so no
//! two callers can ever claim the same job.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use quire_core::{new_v7, Error, Job, JobRepository, JobStatus, JobType, QueueStats, Result};

use crate::convert::{fmt_ts, parse_ts, parse_ts_opt, parse_uuid};

/// SQLite implementation of JobRepository.
#[derive(Clone)]
pub struct SqliteJobRepository {
    pool: Pool<Sqlite>,
}

const JOB_COLUMNS: &str =
    "id, paper_id, job_type, status, priority, error_message, created_at, started_at, finished_at";

impl SqliteJobRepository {
    /// Create a new SqliteJobRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Convert JobType to string for the database.
    fn job_type_to_str(job_type: JobType) -> &'static str {
        match job_type {
            JobType::ExtractText => "extract_text",
            JobType::ExtractDoi => "extract_doi",
            JobType::Embed => "embed",
        }
    }

    /// Convert string from the database to JobType.
    fn str_to_job_type(s: &str) -> JobType {
        match s {
            "extract_text" => JobType::ExtractText,
            "extract_doi" => JobType::ExtractDoi,
            "embed" => JobType::Embed,
            _ => JobType::ExtractText, // fallback
        }
    }

    /// Convert JobStatus to string for the database.
    #[allow(dead_code)]
    fn job_status_to_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Convert string from the database to JobStatus.
    fn str_to_job_status(s: &str) -> JobStatus {
        match s {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending, // fallback
        }
    }

    /// Parse a job row into a Job struct.
    fn parse_row(row: sqlx::sqlite::SqliteRow) -> Result<Job> {
        Ok(Job {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            paper_id: parse_uuid(&row.get::<String, _>("paper_id"))?,
            job_type: Self::str_to_job_type(&row.get::<String, _>("job_type")),
            status: Self::str_to_job_status(&row.get::<String, _>("status")),
            priority: row.get("priority"),
            error_message: row.get("error_message"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            started_at: parse_ts_opt(row.get("started_at"))?,
            finished_at: parse_ts_opt(row.get("finished_at"))?,
        })
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn queue(&self, paper_id: Uuid, job_type: JobType, priority: i32) -> Result<Uuid> {
        let job_type_str = Self::job_type_to_str(job_type);
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Idempotent enqueue: an open job of the same (paper, type) wins.
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM job \
             WHERE paper_id = ?1 AND job_type = ?2 AND status IN ('pending', 'running') \
             LIMIT 1",
        )
        .bind(paper_id.to_string())
        .bind(job_type_str)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if let Some(id) = existing {
            debug!(
                subsystem = "db",
                component = "jobs",
                op = "queue",
                paper_id = %paper_id,
                job_type = job_type_str,
                "Duplicate enqueue, returning existing job"
            );
            return parse_uuid(&id);
        }

        let job_id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO job (id, paper_id, job_type, status, priority, created_at) \
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5)",
        )
        .bind(job_id.to_string())
        .bind(paper_id.to_string())
        .bind(job_type_str)
        .bind(priority)
        .bind(fmt_ts(&now))
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let now = Utc::now();

        // Single-statement compare-and-set: the inner SELECT picks the oldest
        // job in the highest-priority tier (rowid breaks created_at ties),
        // the outer status guard makes the transition atomic.
        let row = sqlx::query(&format!(
            "UPDATE job SET status = 'running', started_at = ?1 \
             WHERE id = ( \
                 SELECT id FROM job \
                 WHERE status = 'pending' \
                 ORDER BY priority DESC, created_at ASC, rowid ASC \
                 LIMIT 1 \
             ) \
             AND status = 'pending' \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(fmt_ts(&now))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_row).transpose()
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let now = Utc::now();

        // Terminal rows never transition again (idempotent completion signals).
        sqlx::query(
            "UPDATE job SET status = 'completed', finished_at = ?1 \
             WHERE id = ?2 AND status IN ('pending', 'running')",
        )
        .bind(fmt_ts(&now))
        .bind(job_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE job SET status = 'failed', error_message = ?1, finished_at = ?2 \
             WHERE id = ?3 AND status IN ('pending', 'running')",
        )
        .bind(error)
        .bind(fmt_ts(&now))
        .bind(job_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM job WHERE id = ?1"))
            .bind(job_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_row).transpose()
    }

    async fn get_for_paper(&self, paper_id: Uuid) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job WHERE paper_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(paper_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_row).collect()
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT \
                COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
                COUNT(*) FILTER (WHERE status = 'running') AS running, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
                COUNT(*) FILTER (WHERE status = 'failed') AS failed \
             FROM job",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let current = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job WHERE status = 'running' \
             ORDER BY started_at ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get("pending"),
            running: row.get("running"),
            completed: row.get("completed"),
            failed: row.get("failed"),
            current: current.map(Self::parse_row).transpose()?,
        })
    }
}
