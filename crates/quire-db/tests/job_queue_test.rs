//! Integration tests for the job queue: priority ordering, idempotent
//! enqueue, the atomic claim transition, and terminal-state handling.

use quire_db::{
    CreatePaperRequest, Database, JobRepository, JobStatus, JobType, PaperRepository,
};
use uuid::Uuid;

async fn test_db() -> Database {
    Database::connect_in_memory().await.expect("in-memory db")
}

async fn insert_paper(db: &Database, title: &str) -> Uuid {
    db.papers
        .insert(CreatePaperRequest {
            title: title.to_string(),
            authors: None,
            year: None,
            doi: None,
            source_url: None,
            pdf_path: format!("/tmp/{title}.pdf"),
            collection: None,
        })
        .await
        .expect("insert paper")
}

#[tokio::test]
async fn test_queue_and_get() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "queue-and-get").await;

    let job_id = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("queue");

    let job = db.jobs.get(job_id).await.expect("get").expect("job exists");
    assert_eq!(job.paper_id, paper_id);
    assert_eq!(job.job_type, JobType::ExtractText);
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.priority, 10);
    assert!(job.started_at.is_none());
    assert!(job.finished_at.is_none());
}

#[tokio::test]
async fn test_idempotent_enqueue_returns_existing_job() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "idempotent").await;

    let first = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("first queue");
    let second = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("second queue");

    assert_eq!(first, second, "duplicate enqueue must return the same job");
    assert_eq!(db.jobs.pending_count().await.expect("count"), 1);
}

#[tokio::test]
async fn test_enqueue_dedup_is_per_type() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "per-type").await;

    let a = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("queue a");
    let b = db
        .jobs
        .queue(paper_id, JobType::ExtractDoi, 5)
        .await
        .expect("queue b");

    assert_ne!(a, b);
    assert_eq!(db.jobs.pending_count().await.expect("count"), 2);
}

#[tokio::test]
async fn test_terminal_job_allows_fresh_enqueue() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "fresh-after-terminal").await;

    let first = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("queue");
    let claimed = db.jobs.claim_next().await.expect("claim").expect("job");
    assert_eq!(claimed.id, first);
    db.jobs.fail(first, "boom").await.expect("fail");

    // Re-processing requires an explicit fresh job; dedup only guards open jobs
    let second = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("requeue");
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_claim_order_priority_then_fifo() {
    let db = test_db().await;
    let p1 = insert_paper(&db, "order-1").await;
    let p2 = insert_paper(&db, "order-2").await;
    let p3 = insert_paper(&db, "order-3").await;

    let low = db.jobs.queue(p1, JobType::Embed, 1).await.expect("low");
    let high_old = db
        .jobs
        .queue(p2, JobType::ExtractText, 10)
        .await
        .expect("high old");
    let high_new = db
        .jobs
        .queue(p3, JobType::ExtractText, 10)
        .await
        .expect("high new");

    // Highest priority first; FIFO within the tier
    let c1 = db.jobs.claim_next().await.expect("c1").expect("job");
    assert_eq!(c1.id, high_old);
    let c2 = db.jobs.claim_next().await.expect("c2").expect("job");
    assert_eq!(c2.id, high_new);
    let c3 = db.jobs.claim_next().await.expect("c3").expect("job");
    assert_eq!(c3.id, low);

    assert!(db.jobs.claim_next().await.expect("empty").is_none());
}

#[tokio::test]
async fn test_claim_transitions_to_running() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "claim-running").await;
    let job_id = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("queue");

    let claimed = db.jobs.claim_next().await.expect("claim").expect("job");
    assert_eq!(claimed.id, job_id);
    assert_eq!(claimed.status, JobStatus::Running);
    assert!(claimed.started_at.is_some());

    let reread = db.jobs.get(job_id).await.expect("get").expect("job");
    assert_eq!(reread.status, JobStatus::Running);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claimers_never_share_a_job() {
    let db = test_db().await;
    let total_jobs = 20;
    for i in 0..total_jobs {
        let paper_id = insert_paper(&db, &format!("concurrent-{i}")).await;
        db.jobs
            .queue(paper_id, JobType::ExtractText, 10)
            .await
            .expect("queue");
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(job) = db.jobs.claim_next().await.expect("claim") {
                claimed.push(job.id);
            }
            claimed
        }));
    }

    let mut all: Vec<Uuid> = Vec::new();
    for handle in handles {
        all.extend(handle.await.expect("join"));
    }

    // Exactly M successful claims total, no job claimed twice
    assert_eq!(all.len(), total_jobs);
    let mut unique = all.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), total_jobs);
}

#[tokio::test]
async fn test_complete_stamps_finished_at() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "complete").await;
    let job_id = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("queue");

    db.jobs.claim_next().await.expect("claim");
    db.jobs.complete(job_id).await.expect("complete");

    let job = db.jobs.get(job_id).await.expect("get").expect("job");
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.finished_at.is_some());
}

#[tokio::test]
async fn test_fail_records_reason_and_is_idempotent() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "fail-idempotent").await;
    let job_id = db
        .jobs
        .queue(paper_id, JobType::Embed, 1)
        .await
        .expect("queue");

    db.jobs.claim_next().await.expect("claim");
    db.jobs.fail(job_id, "model unavailable").await.expect("fail");

    let job = db.jobs.get(job_id).await.expect("get").expect("job");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("model unavailable"));
    let first_finish = job.finished_at.expect("finished_at set");

    // Duplicate terminal signals are no-ops, not errors
    db.jobs.fail(job_id, "second reason").await.expect("refail");
    db.jobs.complete(job_id).await.expect("complete after fail");

    let job = db.jobs.get(job_id).await.expect("get").expect("job");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("model unavailable"));
    assert_eq!(job.finished_at, Some(first_finish));
}

#[tokio::test]
async fn test_failed_job_is_not_reclaimed() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "no-retry").await;
    let job_id = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("queue");

    db.jobs.claim_next().await.expect("claim");
    db.jobs.fail(job_id, "corrupt pdf").await.expect("fail");

    assert!(db.jobs.claim_next().await.expect("claim").is_none());
}

#[tokio::test]
async fn test_queue_stats_counts_and_current() {
    let db = test_db().await;
    let p1 = insert_paper(&db, "stats-1").await;
    let p2 = insert_paper(&db, "stats-2").await;
    let p3 = insert_paper(&db, "stats-3").await;

    db.jobs.queue(p1, JobType::ExtractText, 10).await.expect("q1");
    db.jobs.queue(p2, JobType::ExtractText, 10).await.expect("q2");
    let done = db.jobs.queue(p3, JobType::ExtractDoi, 5).await.expect("q3");

    let running = db.jobs.claim_next().await.expect("claim").expect("job");

    // Finish the DOI job out of band
    db.jobs.complete(done).await.expect("complete");

    let stats = db.jobs.queue_stats().await.expect("stats");
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.current.expect("current job").id, running.id);
}

#[tokio::test]
async fn test_get_for_paper_lists_history() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "history").await;

    let a = db
        .jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("a");
    db.jobs.claim_next().await.expect("claim");
    db.jobs.complete(a).await.expect("complete");
    db.jobs
        .queue(paper_id, JobType::Embed, 1)
        .await
        .expect("b");

    let jobs = db.jobs.get_for_paper(paper_id).await.expect("list");
    assert_eq!(jobs.len(), 2);
}

#[tokio::test]
async fn test_deleting_paper_cascades_to_jobs() {
    let db = test_db().await;
    let paper_id = insert_paper(&db, "cascade").await;
    db.jobs
        .queue(paper_id, JobType::ExtractText, 10)
        .await
        .expect("queue");

    db.papers.delete(paper_id).await.expect("delete");
    assert_eq!(db.jobs.pending_count().await.expect("count"), 0);
    assert!(db
        .jobs
        .get_for_paper(paper_id)
        .await
        .expect("list")
        .is_empty());
}
