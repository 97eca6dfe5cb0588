use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use riffrag_core::traits::Embedder;
use riffrag_core::Result;

/// Deterministic hashed bag-of-tokens embedder for tests and offline runs.
///
/// Texts sharing tokens land close to each other, identical texts map to the
/// identical vector, and every non-blank output is L2-normalised.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or(0);
            #[allow(clippy::cast_precision_loss)]
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> String { format!("fake:xxhash64:d{}", self.dim) }
    fn dim(&self) -> usize { self.dim }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_text(t)).collect()) }
}
