//! Mock embedding backend for deterministic testing.
//!
//! Always compiled (not test-gated) so downstream crates' integration tests
//! can drive the pipeline without a live Ollama instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quire_core::{EmbeddingBackend, Error, Result, Vector};

/// Mock embedding backend with deterministic output and a call log.
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    fixed_vectors: HashMap<String, Vector>,
    failure_rate: f64,
}

/// One recorded backend invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
    /// Number of texts in the batch.
    pub batch_size: usize,
    /// The texts that were embedded.
    pub inputs: Vec<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            fixed_vectors: HashMap::new(),
            failure_rate: 0.0,
        }
    }
}

impl MockEmbeddingBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Pin a fixed vector for a specific input text.
    ///
    /// Lets tests construct exact similarity geometry instead of relying on
    /// the hash-derived vectors.
    pub fn with_fixed_vector(mut self, text: impl Into<String>, vector: Vector) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_vectors
            .insert(text.into(), vector);
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    ///
    /// At 1.0 every call fails with `ModelUnavailable`.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of backend invocations so far.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate >= 1.0 {
            true
        } else if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }
}

impl Default for MockEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.call_log.lock().unwrap().push(MockCall {
            batch_size: texts.len(),
            inputs: texts.to_vec(),
        });

        if self.should_fail() {
            return Err(Error::ModelUnavailable(
                "Simulated model failure".to_string(),
            ));
        }

        Ok(texts
            .iter()
            .map(|text| {
                self.config
                    .fixed_vectors
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| {
                        MockEmbeddingGenerator::generate(text, self.config.dimension)
                    })
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

/// Deterministic embedding generator.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a deterministic embedding from text.
    ///
    /// Uses character-based hashing for reproducibility: the same text
    /// always produces the same unit vector.
    pub fn generate(text: &str, dimension: usize) -> Vector {
        let mut vec = vec![0.0; dimension];

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }

        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }
}
