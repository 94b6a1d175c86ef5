//! Integration tests for chunk and embedding generation-replace semantics
//! and the embeddings_ready invariant.

use quire_db::{
    BoundingBox, Chunk, ChunkRepository, CreatePaperRequest, Database, EmbeddingRepository,
    PaperRepository, PaperStatus,
};
use quire_core::new_v7;
use uuid::Uuid;

async fn test_db() -> Database {
    Database::connect_in_memory().await.expect("in-memory db")
}

async fn insert_paper(db: &Database) -> Uuid {
    db.papers
        .insert(CreatePaperRequest {
            title: "Test Paper".to_string(),
            authors: Some("Doe, J.".to_string()),
            year: Some(2024),
            doi: None,
            source_url: None,
            pdf_path: "/tmp/test.pdf".to_string(),
            collection: Some("ml".to_string()),
        })
        .await
        .expect("insert paper")
}

fn make_chunk(paper_id: Uuid, page: i32, index: i32, text: &str) -> Chunk {
    Chunk {
        id: new_v7(),
        paper_id,
        page,
        bbox: BoundingBox {
            x: 72.0,
            y: 100.0 + (index as f64) * 20.0,
            width: 468.0,
            height: 14.0,
        },
        text: text.to_string(),
        chunk_index: index,
    }
}

#[tokio::test]
async fn test_paper_insert_defaults() {
    let db = test_db().await;
    let id = insert_paper(&db).await;

    let paper = db.papers.get(id).await.expect("get");
    assert_eq!(paper.status, PaperStatus::Pending);
    assert!(!paper.embeddings_ready);
    assert!(paper.indexed_at.is_none());
    assert_eq!(paper.collection, "ml");
}

#[tokio::test]
async fn test_get_missing_paper_fails() {
    let db = test_db().await;
    let err = db.papers.get(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, quire_core::Error::PaperNotFound(_)));
}

#[tokio::test]
async fn test_list_filters_by_collection() {
    let db = test_db().await;
    insert_paper(&db).await;
    db.papers
        .insert(CreatePaperRequest {
            title: "Other".to_string(),
            authors: None,
            year: None,
            doi: None,
            source_url: None,
            pdf_path: "/tmp/other.pdf".to_string(),
            collection: None,
        })
        .await
        .expect("insert");

    assert_eq!(db.papers.list(None).await.expect("all").len(), 2);
    assert_eq!(db.papers.list(Some("ml")).await.expect("ml").len(), 1);
    assert_eq!(
        db.papers.list(Some("default")).await.expect("default").len(),
        1
    );
    assert!(db.papers.list(Some("none")).await.expect("none").is_empty());
}

#[tokio::test]
async fn test_chunk_replace_and_ordering() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;

    let chunks = vec![
        make_chunk(paper_id, 0, 0, "Abstract text"),
        make_chunk(paper_id, 0, 1, "Introduction text"),
        make_chunk(paper_id, 1, 2, "Methods text"),
    ];
    db.chunks
        .replace_for_paper(paper_id, chunks.clone())
        .await
        .expect("replace");

    let stored = db.chunks.get_for_paper(paper_id).await.expect("get");
    assert_eq!(stored.len(), 3);
    for (expected, actual) in chunks.iter().zip(stored.iter()) {
        assert_eq!(actual.id, expected.id);
        assert_eq!(actual.text, expected.text);
        assert_eq!(actual.page, expected.page);
        assert_eq!(actual.chunk_index, expected.chunk_index);
        assert!((actual.bbox.y - expected.bbox.y).abs() < f64::EPSILON);
    }
}

#[tokio::test]
async fn test_chunk_replace_is_full_swap() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;

    db.chunks
        .replace_for_paper(
            paper_id,
            vec![
                make_chunk(paper_id, 0, 0, "old chunk a"),
                make_chunk(paper_id, 0, 1, "old chunk b"),
            ],
        )
        .await
        .expect("first generation");

    let replacement = vec![make_chunk(paper_id, 0, 0, "new chunk")];
    db.chunks
        .replace_for_paper(paper_id, replacement)
        .await
        .expect("second generation");

    let stored = db.chunks.get_for_paper(paper_id).await.expect("get");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "new chunk");
}

#[tokio::test]
async fn test_chunk_replace_rejects_foreign_chunk() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;
    let other_paper = Uuid::new_v4();

    let err = db
        .chunks
        .replace_for_paper(paper_id, vec![make_chunk(other_paper, 0, 0, "stray chunk")])
        .await
        .unwrap_err();
    assert!(matches!(err, quire_core::Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_embedding_replace_sets_ready_flag() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;

    let chunks = vec![
        make_chunk(paper_id, 0, 0, "chunk zero"),
        make_chunk(paper_id, 0, 1, "chunk one"),
    ];
    db.chunks
        .replace_for_paper(paper_id, chunks.clone())
        .await
        .expect("chunks");

    let vectors = vec![
        (chunks[0].id, vec![1.0_f32, 0.0, 0.0]),
        (chunks[1].id, vec![0.0_f32, 1.0, 0.0]),
    ];
    db.embeddings
        .replace_for_paper(paper_id, vectors)
        .await
        .expect("embeddings");

    let paper = db.papers.get(paper_id).await.expect("get");
    assert!(paper.embeddings_ready);

    let stored = db.embeddings.get_for_paper(paper_id).await.expect("get");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].0.id, chunks[0].id);
    assert_eq!(stored[0].1, vec![1.0_f32, 0.0, 0.0]);
}

#[tokio::test]
async fn test_partial_embedding_set_is_rejected() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;

    let chunks = vec![
        make_chunk(paper_id, 0, 0, "chunk zero"),
        make_chunk(paper_id, 0, 1, "chunk one"),
    ];
    db.chunks
        .replace_for_paper(paper_id, chunks.clone())
        .await
        .expect("chunks");

    // One vector for two chunks: must be rejected, flag must stay down
    let err = db
        .embeddings
        .replace_for_paper(paper_id, vec![(chunks[0].id, vec![1.0_f32, 0.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, quire_core::Error::InvalidInput(_)));

    let paper = db.papers.get(paper_id).await.expect("get");
    assert!(!paper.embeddings_ready);
    assert_eq!(
        db.embeddings.count_for_paper(paper_id).await.expect("count"),
        0
    );
}

#[tokio::test]
async fn test_embedding_replace_rejects_mixed_dimensions() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;

    let chunks = vec![
        make_chunk(paper_id, 0, 0, "chunk zero"),
        make_chunk(paper_id, 0, 1, "chunk one"),
    ];
    db.chunks
        .replace_for_paper(paper_id, chunks.clone())
        .await
        .expect("chunks");

    let err = db
        .embeddings
        .replace_for_paper(
            paper_id,
            vec![
                (chunks[0].id, vec![1.0_f32, 0.0]),
                (chunks[1].id, vec![1.0_f32, 0.0, 0.0]),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, quire_core::Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_chunk_regeneration_resets_ready_flag() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;

    let chunks = vec![make_chunk(paper_id, 0, 0, "only chunk")];
    db.chunks
        .replace_for_paper(paper_id, chunks.clone())
        .await
        .expect("chunks");
    db.embeddings
        .replace_for_paper(paper_id, vec![(chunks[0].id, vec![0.5_f32, 0.5])])
        .await
        .expect("embeddings");
    assert!(db.papers.get(paper_id).await.expect("get").embeddings_ready);

    // Re-extraction replaces the chunk generation; old vectors die with it
    db.chunks
        .replace_for_paper(paper_id, vec![make_chunk(paper_id, 0, 0, "fresh chunk")])
        .await
        .expect("regenerate");

    let paper = db.papers.get(paper_id).await.expect("get");
    assert!(!paper.embeddings_ready);
    assert_eq!(
        db.embeddings.count_for_paper(paper_id).await.expect("count"),
        0
    );
}

#[tokio::test]
async fn test_ready_iff_every_chunk_has_embedding() {
    let db = test_db().await;
    let paper_id = insert_paper(&db).await;

    let chunks = vec![
        make_chunk(paper_id, 0, 0, "a"),
        make_chunk(paper_id, 1, 1, "b"),
        make_chunk(paper_id, 2, 2, "c"),
    ];
    db.chunks
        .replace_for_paper(paper_id, chunks.clone())
        .await
        .expect("chunks");

    let vectors: Vec<_> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, vec![i as f32, 1.0]))
        .collect();
    db.embeddings
        .replace_for_paper(paper_id, vectors)
        .await
        .expect("embeddings");

    let paper = db.papers.get(paper_id).await.expect("get");
    let chunk_count = db.chunks.count_for_paper(paper_id).await.expect("chunks");
    let embedding_count = db
        .embeddings
        .count_for_paper(paper_id)
        .await
        .expect("embeddings");

    assert!(paper.embeddings_ready);
    assert_eq!(chunk_count, embedding_count);
}
