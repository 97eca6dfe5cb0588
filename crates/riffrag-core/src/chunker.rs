//! Line-window chunking.
//!
//! A file with at most `max_lines_per_chunk` lines becomes one chunk; longer
//! files are cut into consecutive non-overlapping windows of that many lines,
//! the last one possibly shorter. Content is kept byte-for-byte, line
//! terminators included, so the chunks of a file concatenate back to the file.

use crate::error::{Error, Result};
use crate::language::{extension_of, language_for};
use crate::selector::SelectedFile;
use crate::types::{Chunk, ChunkId};

/// Stable chunk id: first 32 hex chars of `blake3(collection \0 file_path \0 chunk_index)`.
pub fn chunk_id(collection: &str, file_path: &str, chunk_index: usize) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(collection.as_bytes());
    hasher.update(&[0]);
    hasher.update(file_path.as_bytes());
    hasher.update(&[0]);
    hasher.update(chunk_index.to_string().as_bytes());
    let hex = hasher.finalize().to_hex();
    hex[..32].to_string()
}

#[derive(Debug, Clone)]
pub struct Chunker {
    max_lines_per_chunk: usize,
}

impl Chunker {
    pub fn new(max_lines_per_chunk: usize) -> Result<Self> {
        if max_lines_per_chunk == 0 { return Err(Error::InvalidConfig("max_lines_per_chunk must be > 0".into())); }
        Ok(Self { max_lines_per_chunk })
    }

    /// Chunk already-decoded text of `file`. Zero lines yield zero chunks; a
    /// trailing newline does not start a new line.
    pub fn chunk_file(&self, collection: &str, file: &SelectedFile, text: &str) -> Vec<Chunk> {
        let extension = extension_of(&file.absolute_path);
        let language = language_for(&extension);
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let total_lines = lines.len();
        if total_lines == 0 { return Vec::new(); }

        let total_chunks = total_lines.div_ceil(self.max_lines_per_chunk);
        lines
            .chunks(self.max_lines_per_chunk)
            .enumerate()
            .map(|(chunk_index, window)| {
                let start_line = chunk_index * self.max_lines_per_chunk + 1;
                Chunk {
                    id: chunk_id(collection, &file.relative_path, chunk_index),
                    file_path: file.relative_path.clone(),
                    absolute_path: file.absolute_path.to_string_lossy().into_owned(),
                    content: window.concat(),
                    start_line,
                    end_line: start_line + window.len() - 1,
                    chunk_index,
                    total_chunks,
                    extension: extension.clone(),
                    language: language.to_string(),
                    size_bytes: file.size_bytes,
                    total_lines,
                    modified_at: file.modified_at.clone(),
                }
            })
            .collect()
    }
}
