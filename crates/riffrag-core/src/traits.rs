use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChunkRecord, CollectionInfo, CollectionStats};

/// Text-to-vector function behind the embedding client.
///
/// Implementations return exactly one vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g., `ollama:mxbai-embed-large:d1024`).
    fn embedder_id(&self) -> String;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Collection-scoped vector storage. Every operation on a missing collection
/// (other than `create_or_replace`, `exists` and `list`) fails with `Error::NotFound`.
pub trait VectorStore: Send + Sync {
    /// Drop whatever exists under `info.name` and create an empty collection.
    fn create_or_replace(&self, info: &CollectionInfo) -> Result<()>;
    /// Append records atomically; all or nothing. Returns the number written.
    fn insert_batch(&self, collection: &str, records: &[ChunkRecord]) -> Result<usize>;
    /// All records, optionally restricted to one normalised extension.
    fn scan(&self, collection: &str, extension: Option<&str>) -> Result<Vec<ChunkRecord>>;
    fn delete(&self, collection: &str) -> Result<()>;
    fn info(&self, collection: &str) -> Result<CollectionInfo>;
    fn stats(&self, collection: &str) -> Result<CollectionStats>;
    fn exists(&self, collection: &str) -> Result<bool>;
    /// Logical names of all collections, sorted.
    fn list(&self) -> Result<Vec<String>>;
}
