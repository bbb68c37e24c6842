//! Embedding generation for semantic search and retrieval.
//!
//! [`Embedder`] is one request to the remote service. [`EmbeddingGenerator`] drives it
//! over a whole corpus: contiguous batches, pacing between batches, and retries on
//! rate limits as decided by a [`RetryPolicy`].

mod mistral;

pub use mistral::MistralEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{PulsError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Trait for a single call to an embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `texts` in one request. The result has one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Identifier of the embedding model.
    fn model(&self) -> &str;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Whether an error is the service's rate-limit condition.
pub fn is_rate_limit(error: &PulsError) -> bool {
    matches!(error, PulsError::RateLimited(_))
}

/// When and how long to wait around embedding requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per batch, first try included.
    pub max_attempts: u32,
    /// Attempt `n` that fails with a retryable error waits `n * backoff_unit`.
    pub backoff_unit: Duration,
    /// Pause after each successful batch that is followed by another one.
    pub pacing: Duration,
    /// Errors for which another attempt is made.
    pub retryable: fn(&PulsError) -> bool,
}

impl RetryPolicy {
    /// Build the policy from configuration.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            backoff_unit: Duration::from_secs(settings.retry_backoff_secs),
            pacing: Duration::from_millis(settings.pacing_ms),
            retryable: is_rate_limit,
        }
    }

    /// Same retry rules without any waiting.
    pub fn without_delays(mut self) -> Self {
        self.backoff_unit = Duration::ZERO;
        self.pacing = Duration::ZERO;
        self
    }

    /// Wait before the attempt following failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }

    /// Whether failed attempt `attempt` should be followed by another.
    pub fn should_retry(&self, error: &PulsError, attempt: u32) -> bool {
        attempt < self.max_attempts && (self.retryable)(error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(10),
            pacing: Duration::from_millis(1500),
            retryable: is_rate_limit,
        }
    }
}

/// Batched, order-preserving embedding of many texts.
#[derive(Clone)]
pub struct EmbeddingGenerator {
    embedder: Arc<dyn Embedder>,
    policy: RetryPolicy,
    batch_size: usize,
}

impl EmbeddingGenerator {
    /// Create a generator with the default policy and batches of 10.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            policy: RetryPolicy::default(),
            batch_size: 10,
        }
    }

    /// Build a generator from configuration.
    pub fn from_settings(embedder: Arc<dyn Embedder>, settings: &EmbeddingSettings) -> Self {
        Self::new(embedder)
            .with_policy(RetryPolicy::from_settings(settings))
            .with_batch_size(settings.batch_size)
    }

    /// Set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the number of texts per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The underlying embedder.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Embedding model identifier.
    pub fn model(&self) -> &str {
        self.embedder.model()
    }

    /// Embed every text, position `i` of the result belonging to `texts[i]`.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_with_progress(texts, |_| {}).await
    }

    /// Like [`embed`](Self::embed), calling `on_batch` with the number of texts done
    /// after every batch. Any non-retryable failure aborts the whole run.
    #[instrument(skip_all, fields(count = texts.len(), batch_size = self.batch_size))]
    pub async fn embed_with_progress<F>(&self, texts: &[String], mut on_batch: F) -> Result<Vec<Vec<f32>>>
    where
        F: FnMut(usize) + Send,
    {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        let batch_count = texts.len().div_ceil(self.batch_size);

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            let embeddings = self.embed_batch_with_retry(batch).await?;
            all_embeddings.extend(embeddings);
            on_batch(all_embeddings.len());

            if i + 1 < batch_count && !self.policy.pacing.is_zero() {
                tokio::time::sleep(self.policy.pacing).await;
            }
        }

        info!("Generated {} embeddings in {} batches", all_embeddings.len(), batch_count);
        Ok(all_embeddings)
    }

    /// Embed a single query with the same model and retry rules.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch_with_retry(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PulsError::Embedding("Empty embedding response".to_string()))
    }

    async fn embed_batch_with_retry(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 1;
        loop {
            debug!("Embedding batch of {} (attempt {}/{})", batch.len(), attempt, self.policy.max_attempts);

            match self.embedder.embed_batch(batch).await {
                Ok(embeddings) if embeddings.len() == batch.len() => return Ok(embeddings),
                Ok(embeddings) => {
                    return Err(PulsError::Embedding(format!(
                        "Service returned {} vectors for {} inputs",
                        embeddings.len(),
                        batch.len()
                    )));
                }
                Err(e) if self.policy.should_retry(&e, attempt) => {
                    let wait = self.policy.backoff(attempt);
                    warn!("Rate limit reached, waiting {:?} before retrying: {}", wait, e);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
