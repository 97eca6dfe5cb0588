use std::sync::Arc;
use std::time::Duration;

use riffrag_core::config::EmbeddingSettings;
use riffrag_core::traits::Embedder;
use riffrag_core::Result;

pub mod client;
pub mod fake;
pub mod ollama;

pub use client::{cosine_similarity, EmbeddingClient, RetryPolicy};
pub use fake::FakeEmbedder;
pub use ollama::OllamaEmbedder;

pub const FAKE_EMBEDDINGS_ENV: &str = "RIFFRAG_USE_FAKE_EMBEDDINGS";
pub const FAKE_DIM: usize = 1024;

pub fn use_fake_embeddings() -> bool {
    std::env::var(FAKE_EMBEDDINGS_ENV).ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Ollama embedder for `settings`, or the [`FakeEmbedder`] when `RIFFRAG_USE_FAKE_EMBEDDINGS=1`.
pub async fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("🧪 Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension.unwrap_or(FAKE_DIM))));
    }
    Ok(Arc::new(OllamaEmbedder::connect(settings).await?))
}

/// Client configured from `[embedding]` with the given batch size.
pub fn client_from_settings(embedder: Arc<dyn Embedder>, settings: &EmbeddingSettings, batch_size: usize) -> Result<EmbeddingClient> {
    let retry = RetryPolicy { max_attempts: settings.max_retries.max(1), base_delay: Duration::from_millis(settings.retry_base_ms) };
    Ok(EmbeddingClient::new(embedder, batch_size)?.with_concurrency(settings.concurrency).with_retry(retry).with_prefixes(settings.use_prefixes))
}
