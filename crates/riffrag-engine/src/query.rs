use std::cmp::Ordering;
use tracing::{debug, warn};

use riffrag_core::traits::VectorStore;
use riffrag_core::types::{CollectionInfo, CollectionStats, QueryOptions, ScoredChunk};
use riffrag_core::{Error, Result};
use riffrag_embed::{cosine_similarity, EmbeddingClient};

/// Exhaustive cosine search over one collection at a time.
pub struct QueryEngine<S: VectorStore> {
    store: S,
    client: EmbeddingClient,
}

impl<S: VectorStore> QueryEngine<S> {
    pub fn new(store: S, client: EmbeddingClient) -> Self { Self { store, client } }

    pub fn store(&self) -> &S { &self.store }

    /// Ranked chunks with `similarity >= min_similarity`, best first, at most `limit`.
    /// A collection that was never created is [`Error::NotFound`], an empty one yields `[]`.
    pub async fn query(&self, collection: &str, text: &str, options: &QueryOptions) -> Result<Vec<ScoredChunk>> {
        options.validate()?;
        let info = self.store.info(collection)?;
        if text.trim().is_empty() { return Ok(Vec::new()); }
        let embedder_id = self.client.embedder_id();
        if indexed_with_other_embedder(&info, &embedder_id) {
            warn!(%collection, indexed_with = %info.embedder_id, querying_with = %embedder_id, "collection was indexed with another embedder; scores may be meaningless");
        }

        let query_vec = self.client.embed_query(text).await?;
        if query_vec.len() != info.dimension {
            return Err(Error::DimensionMismatch { expected: info.dimension, actual: query_vec.len() });
        }

        let extension = options.normalized_extension();
        let records = self.store.scan(collection, extension.as_deref())?;
        let scanned = records.len();
        if let Some(bad) = records.iter().find(|r| r.vector.len() != info.dimension) {
            return Err(Error::DimensionMismatch { expected: info.dimension, actual: bad.vector.len() });
        }
        let mut results: Vec<ScoredChunk> = records
            .into_iter()
            .map(|r| {
                let similarity = cosine_similarity(&query_vec, &r.vector);
                ScoredChunk::from_chunk(r.chunk, similarity)
            })
            .filter(|r| r.similarity >= options.min_similarity)
            .collect();
        rank(&mut results);
        results.truncate(options.limit);
        debug!(%collection, scanned, returned = results.len(), extension = ?extension, "query done");
        Ok(results)
    }

    pub fn info(&self, collection: &str) -> Result<CollectionInfo> { self.store.info(collection) }

    pub fn stats(&self, collection: &str) -> Result<CollectionStats> { self.store.stats(collection) }

    pub fn delete(&self, collection: &str) -> Result<()> { self.store.delete(collection) }

    pub fn list(&self) -> Result<Vec<String>> { self.store.list() }
}

/// Same dimension is not enough: vectors from another model live in another space.
fn indexed_with_other_embedder(info: &CollectionInfo, embedder_id: &str) -> bool {
    !info.embedder_id.is_empty() && info.embedder_id != embedder_id
}

/// Similarity descending, then `file_path` and `chunk_index` ascending.
pub fn rank(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
}
