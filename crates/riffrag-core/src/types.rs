//! Domain types shared by the selector, chunker, store and engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub type ChunkId = String;

/// A contiguous line range of one file, the unit stored and retrieved.
///
/// - `id`: derived from (collection, `file_path`, `chunk_index`), see [`crate::chunker::chunk_id`]
/// - `file_path`: relative to the indexed root, always `/`-separated
/// - `start_line`/`end_line`: 1-based, inclusive
/// - `chunk_index`/`total_chunks`: position within the parent file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub file_path: String,
    pub absolute_path: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub extension: String,
    pub language: String,
    pub size_bytes: u64,
    pub total_lines: usize,
    pub modified_at: String,
}

impl Chunk {
    pub fn line_count(&self) -> usize { self.end_line + 1 - self.start_line }
}

/// A chunk plus its embedding, as persisted by a [`crate::traits::VectorStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One ranked query result. `similarity` is cosine similarity in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: ChunkId,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_index: usize,
    pub content: String,
    pub extension: String,
    pub language: String,
    pub size_bytes: u64,
    pub similarity: f32,
}

impl ScoredChunk {
    pub fn from_chunk(chunk: Chunk, similarity: f32) -> Self {
        Self {
            id: chunk.id,
            file_path: chunk.file_path,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            chunk_index: chunk.chunk_index,
            content: chunk.content,
            extension: chunk.extension,
            language: chunk.language,
            size_bytes: chunk.size_bytes,
            similarity,
        }
    }
}

/// Why a file never made it into the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    TooLarge,
    Binary,
    Excluded,
    DecodeFailure,
    Empty,
    Unreadable,
}

impl SkipReason {
    pub const ALL: [SkipReason; 6] = [Self::TooLarge, Self::Binary, Self::Excluded, Self::DecodeFailure, Self::Empty, Self::Unreadable];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooLarge => "too-large",
            Self::Binary => "binary",
            Self::Excluded => "excluded",
            Self::DecodeFailure => "decode-failure",
            Self::Empty => "empty",
            Self::Unreadable => "unreadable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Counters for one `index` run. Also attached to [`Error::Aborted`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    pub collection: String,
    pub root: PathBuf,
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_skipped: BTreeMap<SkipReason, usize>,
    pub chunks_created: usize,
    pub chunks_written: usize,
    pub elapsed: Duration,
}

impl IndexReport {
    pub fn new(collection: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self { collection: collection.into(), root: root.into(), ..Self::default() }
    }

    pub fn record_skip(&mut self, reason: SkipReason) { *self.files_skipped.entry(reason).or_insert(0) += 1; }

    pub fn skipped(&self, reason: SkipReason) -> usize { self.files_skipped.get(&reason).copied().unwrap_or(0) }

    pub fn total_skipped(&self) -> usize { self.files_skipped.values().sum() }

    #[allow(clippy::cast_precision_loss)]
    pub fn files_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.files_indexed as f64 / secs } else { 0.0 }
    }
}

/// Metadata recorded when a collection is (re)created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub embedder_id: String,
    pub root: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub info: CollectionInfo,
    pub total_chunks: usize,
    pub total_files: usize,
    pub extension_distribution: BTreeMap<String, usize>,
}

/// Per-run indexing options. Defaults mirror `[indexing]` in the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    pub max_file_size_bytes: u64,
    pub extra_excludes: Vec<String>,
    pub batch_size: usize,
    pub max_lines_per_chunk: usize,
    pub respect_vcs_ignore: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { max_file_size_bytes: 1_000_000, extra_excludes: Vec::new(), batch_size: 10, max_lines_per_chunk: 100, respect_vcs_ignore: true }
    }
}

impl IndexOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size_bytes == 0 { return Err(Error::InvalidConfig("max_file_size_bytes must be > 0".into())); }
        if self.batch_size == 0 { return Err(Error::InvalidConfig("batch_size must be > 0".into())); }
        if self.max_lines_per_chunk == 0 { return Err(Error::InvalidConfig("max_lines_per_chunk must be > 0".into())); }
        if let Some(p) = self.extra_excludes.iter().find(|p| p.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!("empty exclude pattern {p:?}")));
        }
        Ok(())
    }
}

/// Per-query options. `extension_filter` is compared against [`Chunk::extension`]
/// after normalisation (lowercase, leading dot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub limit: usize,
    pub min_similarity: f32,
    pub extension_filter: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self { Self { limit: 5, min_similarity: 0.001, extension_filter: None } }
}

impl QueryOptions {
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 { return Err(Error::InvalidConfig("limit must be > 0".into())); }
        if !(-1.0..=1.0).contains(&self.min_similarity) {
            return Err(Error::InvalidConfig(format!("min_similarity {} outside [-1, 1]", self.min_similarity)));
        }
        Ok(())
    }

    /// The extension filter as stored in chunks: `"PHP"`, `"php"` and `".php"` all become `".php"`.
    pub fn normalized_extension(&self) -> Option<String> {
        self.extension_filter.as_deref().map(str::trim).filter(|e| !e.is_empty()).map(|e| {
            let e = e.to_lowercase();
            if e.starts_with('.') { e } else { format!(".{e}") }
        })
    }
}

/// Lowercase, replace anything outside `[a-z0-9_-]` with `_`, collapse runs, trim `_`.
pub fn sanitize_collection_name(name: &str) -> Result<String> {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        let ch = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' };
        if ch == '_' && out.ends_with('_') { continue; }
        out.push(ch);
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() { return Err(Error::InvalidConfig(format!("collection name {name:?} is empty after sanitising"))); }
    Ok(out)
}
