//! Embeddings served by an Ollama endpoint (`/api/embed`).

use async_trait::async_trait;
use ollama_rs::error::OllamaError;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;
use tracing::{debug, info, warn};

use riffrag_core::config::EmbeddingSettings;
use riffrag_core::traits::Embedder;
use riffrag_core::{Error, Result};

const PROBE_TEXT: &str = "dimension probe";

pub struct OllamaEmbedder {
    client: Ollama,
    host: String,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    /// Connect, make sure the model is pulled and settle the dimensionality
    /// (override, then model info, then a probe embedding).
    pub async fn connect(settings: &EmbeddingSettings) -> Result<Self> {
        let client = Ollama::try_new(settings.host.as_str()).map_err(|e| Error::InvalidConfig(format!("embedding.host {:?}: {e}", settings.host)))?;
        let mut embedder = Self { client, host: settings.host.clone(), model: settings.model.clone(), dim: 0 };
        embedder.verify_model().await?;
        embedder.dim = match settings.dimension {
            Some(dim) => { info!(dim, "using configured embedding dimension"); dim }
            None => match embedder.detect_dimension().await {
                Some(dim) => dim,
                None => embedder.probe_dimension().await?,
            },
        };
        info!(model = %embedder.model, dim = embedder.dim, host = %embedder.host, "ollama embedder ready");
        Ok(embedder)
    }

    async fn verify_model(&self) -> Result<()> {
        let models = self.client.list_local_models().await.map_err(|e| map_ollama_error(&self.model, e))?;
        if models.iter().any(|m| model_matches(&m.name, &self.model)) { return Ok(()); }
        let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        warn!(model = %self.model, ?available, "embedding model is not pulled");
        Err(Error::ModelNotFound { model: self.model.clone() })
    }

    async fn detect_dimension(&self) -> Option<usize> {
        let info = match self.client.show_model_info(self.model.clone()).await {
            Ok(info) => info,
            Err(e) => { warn!(error = %e, "cannot read model info"); return None; }
        };
        let (key, dim) = info.model_info.iter().find_map(|(k, v)| {
            let dim = v.as_u64().and_then(|d| usize::try_from(d).ok())?;
            k.ends_with(".embedding_length").then_some((k.clone(), dim))
        })?;
        info!(%key, dim, "auto-detected embedding dimension");
        Some(dim)
    }

    async fn probe_dimension(&self) -> Result<usize> {
        let v = self.request(vec![PROBE_TEXT.to_string()]).await?;
        let dim = v.first().map(Vec::len).filter(|d| *d > 0).ok_or_else(|| Error::MalformedEmbedding("empty probe embedding".into()))?;
        info!(dim, "probed embedding dimension");
        Ok(dim)
    }

    async fn request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        debug!(count = texts.len(), "ollama embed request");
        let req = GenerateEmbeddingsRequest::new(self.model.clone(), EmbeddingsInput::Multiple(texts));
        let res = self.client.generate_embeddings(req).await.map_err(|e| map_ollama_error(&self.model, e))?;
        Ok(res.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn embedder_id(&self) -> String { format!("ollama:{}:d{}", self.model, self.dim) }
    fn dim(&self) -> usize { self.dim }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        self.request(texts.to_vec()).await
    }
}

/// `mxbai-embed-large` matches `mxbai-embed-large:latest`; an explicit tag must match exactly.
fn model_matches(available: &str, wanted: &str) -> bool {
    if available == wanted { return true; }
    !wanted.contains(':') && available.split(':').next() == Some(wanted)
}

fn map_ollama_error(model: &str, e: OllamaError) -> Error {
    let not_found = |msg: &str| msg.to_lowercase().contains("not found");
    match e {
        OllamaError::ReqwestError(e) => Error::EmbeddingUnavailable(e.to_string()),
        OllamaError::JsonError(e) => Error::MalformedEmbedding(e.to_string()),
        OllamaError::InternalError(inner) if not_found(&inner.message) => Error::ModelNotFound { model: model.to_string() },
        OllamaError::Other(msg) if not_found(&msg) => Error::ModelNotFound { model: model.to_string() },
        other => Error::EmbeddingUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_tags() {
        assert!(model_matches("mxbai-embed-large:latest", "mxbai-embed-large"));
        assert!(model_matches("nomic-embed-text:v1.5", "nomic-embed-text:v1.5"));
        assert!(!model_matches("nomic-embed-text:latest", "nomic-embed-text:v1.5"));
        assert!(!model_matches("mxbai-embed-large-v2:latest", "mxbai-embed-large"));
    }

    #[test]
    fn errors_map_to_taxonomy() {
        assert!(matches!(map_ollama_error("m", OllamaError::Other("model \"m\" not found, try pulling it first".into())), Error::ModelNotFound { .. }));
        assert!(matches!(map_ollama_error("m", OllamaError::Other("server overloaded".into())), Error::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        let settings = EmbeddingSettings { host: "http://127.0.0.1:9".into(), ..EmbeddingSettings::default() };
        let err = OllamaEmbedder::connect(&settings).await.err().expect("connect must fail");
        assert!(matches!(err, Error::EmbeddingUnavailable(_)), "got {err:?}");
    }

    #[tokio::test]
    #[ignore = "needs a local ollama with mxbai-embed-large pulled"]
    async fn live_embedding_has_detected_dimension() {
        let embedder = OllamaEmbedder::connect(&EmbeddingSettings::default()).await.expect("connect");
        let v = embedder.embed_batch(&["fn main() {}".to_string()]).await.expect("embed");
        assert_eq!(v[0].len(), embedder.dim());
    }
}
