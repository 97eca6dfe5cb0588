//! Batching adapter in front of an [`Embedder`].
//!
//! Splits texts into batches of at most `batch_size`, keeps up to
//! `concurrency` batches in flight and reassembles results in input order.
//! Every returned vector is checked against the expected dimensionality; a
//! bad batch fails the whole call instead of being padded or dropped.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use riffrag_core::traits::Embedder;
use riffrag_core::{Error, Result};

pub const DOCUMENT_PREFIX: &str = "search_document: ";
pub const QUERY_PREFIX: &str = "search_query: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { max_attempts: 3, base_delay: Duration::from_secs(1) } }
}

impl RetryPolicy {
    pub fn none() -> Self { Self { max_attempts: 1, base_delay: Duration::ZERO } }

    /// `base * 2^attempt`, attempt counted from 0.
    pub fn delay(&self, attempt: u32) -> Duration { self.base_delay.saturating_mul(2u32.saturating_pow(attempt)) }
}

#[derive(Clone)]
pub struct EmbeddingClient {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    concurrency: usize,
    expected_dim: usize,
    retry: RetryPolicy,
    use_prefixes: bool,
}

impl EmbeddingClient {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 { return Err(Error::InvalidConfig("batch_size must be > 0".into())); }
        let expected_dim = embedder.dim();
        if expected_dim == 0 { return Err(Error::InvalidConfig("embedder reports dimension 0".into())); }
        Ok(Self { embedder, batch_size, concurrency: 1, expected_dim, retry: RetryPolicy::default(), use_prefixes: false })
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self { self.concurrency = concurrency.max(1); self }

    /// Same client with another batch size, for per-run overrides.
    pub fn with_batch_size(&self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 { return Err(Error::InvalidConfig("batch_size must be > 0".into())); }
        Ok(Self { batch_size, ..self.clone() })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self { self.retry = retry; self }

    #[must_use]
    pub fn with_prefixes(mut self, use_prefixes: bool) -> Self { self.use_prefixes = use_prefixes; self }

    pub fn dim(&self) -> usize { self.expected_dim }
    pub fn batch_size(&self) -> usize { self.batch_size }
    pub fn concurrency(&self) -> usize { self.concurrency }
    pub fn embedder_id(&self) -> String { self.embedder.embedder_id() }

    /// One vector per text, same order, for chunk contents.
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let prefix = if self.use_prefixes { DOCUMENT_PREFIX } else { "" };
        let batches: Vec<&[String]> = texts.chunks(self.batch_size).collect();
        debug!(texts = texts.len(), batches = batches.len(), concurrency = self.concurrency, "embedding documents");
        let per_batch: Vec<Vec<Vec<f32>>> = stream::iter(batches.into_iter().map(|batch| self.embed_checked(batch, prefix)))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(per_batch.into_iter().flatten().collect())
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let prefix = if self.use_prefixes { QUERY_PREFIX } else { "" };
        let mut out = self.embed_checked(&[text.to_string()], prefix).await?;
        out.pop().ok_or_else(|| Error::MalformedEmbedding("no vector for query".into()))
    }

    async fn embed_checked(&self, batch: &[String], prefix: &str) -> Result<Vec<Vec<f32>>> {
        // blank texts become zero vectors without a round trip
        let live: Vec<usize> = (0..batch.len()).filter(|&i| !batch[i].trim().is_empty()).collect();
        let mut out = vec![vec![0f32; self.expected_dim]; batch.len()];
        if live.is_empty() { return Ok(out); }

        let inputs: Vec<String> = live.iter().map(|&i| format!("{prefix}{}", batch[i])).collect();
        let vectors = self.call_with_retry(&inputs).await?;
        if vectors.len() != inputs.len() {
            return Err(Error::MalformedEmbedding(format!("asked for {} vectors, got {}", inputs.len(), vectors.len())));
        }
        for (slot, v) in live.into_iter().zip(vectors) {
            if v.len() != self.expected_dim { return Err(Error::DimensionMismatch { expected: self.expected_dim, actual: v.len() }); }
            if let Some(bad) = v.iter().find(|x| !x.is_finite()) { return Err(Error::MalformedEmbedding(format!("non-finite value {bad} in vector"))); }
            out[slot] = v;
        }
        Ok(out)
    }

    async fn call_with_retry(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            match self.embedder.embed_batch(inputs).await {
                Ok(v) => return Ok(v),
                Err(Error::EmbeddingUnavailable(msg)) if attempt + 1 < self.retry.max_attempts => {
                    let wait = self.retry.delay(attempt);
                    warn!(attempt = attempt + 1, max = self.retry.max_attempts, error = %msg, ?wait, "embedding attempt failed, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Cosine similarity in `[-1, 1]`; 0 when either side has zero norm or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() { return 0.0; }
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) { dot += x * y; na += x * x; nb += y * y; }
    if na == 0.0 || nb == 0.0 { return 0.0; }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(100) };
        assert_eq!(p.delay(0), Duration::from_millis(100));
        assert_eq!(p.delay(2), Duration::from_millis(400));
    }
}
