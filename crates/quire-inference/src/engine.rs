//! Process-resident embedding engine with lazy model initialization.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use quire_core::{EmbeddingBackend, Error, Result, Vector};

use crate::ollama::OllamaBackend;

type BackendFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn EmbeddingBackend>>> + Send>>;
type BackendFactory = Box<dyn Fn() -> BackendFuture + Send + Sync>;

/// Lazily-initialized, process-resident embedding engine.
///
/// The backend is constructed on the first `embed`/`embed_query` call and
/// kept for the life of the process, so model load cost is paid once and
/// amortized across jobs. The engine is shared (`Arc`) between the batch
/// scheduler and the search path; both see the same resident backend.
///
/// Initialization failure is not cached: a later call retries the factory,
/// so a temporarily missing model does not wedge the process.
pub struct EmbeddingEngine {
    backend: OnceCell<Arc<dyn EmbeddingBackend>>,
    factory: BackendFactory,
}

impl EmbeddingEngine {
    /// Create an engine from a backend factory.
    ///
    /// The factory runs at most once (on first use) unless it fails.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn EmbeddingBackend>>> + Send + 'static,
    {
        Self {
            backend: OnceCell::new(),
            factory: Box::new(move || Box::pin(factory())),
        }
    }

    /// Create an engine backed by an Ollama instance configured from the
    /// environment. The model-presence probe runs on first use, not here.
    pub fn ollama_from_env() -> Self {
        Self::new(|| async {
            let backend = OllamaBackend::from_env();
            backend.ensure_model().await?;
            info!(
                subsystem = "inference",
                component = "engine",
                model = backend.model_name(),
                "Embedding model resident"
            );
            Ok(Arc::new(backend) as Arc<dyn EmbeddingBackend>)
        })
    }

    /// Create an engine around an already-constructed backend.
    pub fn with_backend(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            backend: OnceCell::new_with(Some(backend)),
            factory: Box::new(|| {
                Box::pin(async {
                    Err(Error::Internal(
                        "Backend factory invoked on pre-initialized engine".to_string(),
                    ))
                })
            }),
        }
    }

    /// Get the resident backend, initializing it on first use.
    async fn backend(&self) -> Result<&Arc<dyn EmbeddingBackend>> {
        self.backend.get_or_try_init(|| (self.factory)()).await
    }

    /// True once the backend has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.backend.initialized()
    }

    /// Expected embedding dimension (initializes the backend if needed).
    pub async fn dimension(&self) -> Result<usize> {
        Ok(self.backend().await?.dimension())
    }

    /// Model name in use (initializes the backend if needed).
    pub async fn model_name(&self) -> Result<String> {
        Ok(self.backend().await?.model_name().to_string())
    }

    /// Embed a batch of texts as one model invocation.
    ///
    /// The whole batch goes to the backend in a single call; model invocation
    /// overhead dominates for short texts, so per-text calls are off the table.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let backend = self.backend().await?;
        let start = Instant::now();
        let vectors = backend.embed_texts(texts).await?;

        if vectors.len() != texts.len() {
            return Err(Error::Internal(format!(
                "Backend returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        debug!(
            subsystem = "inference",
            component = "engine",
            op = "embed",
            input_count = texts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch embedded"
        );
        Ok(vectors)
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Internal("Backend returned no vector for query".to_string()))
    }
}
