use rusqlite::Row;

use riffrag_core::types::{Chunk, ChunkRecord};

pub const CHUNKS_TABLE: &str = "chunks";
pub const META_TABLE: &str = "meta";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS meta (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS chunks (
    id             TEXT PRIMARY KEY,
    file_path      TEXT NOT NULL,
    absolute_path  TEXT NOT NULL,
    content        TEXT NOT NULL,
    extension      TEXT NOT NULL,
    language       TEXT NOT NULL,
    size_bytes     INTEGER NOT NULL,
    total_lines    INTEGER NOT NULL,
    modified_at    TEXT NOT NULL,
    start_line     INTEGER NOT NULL,
    end_line       INTEGER NOT NULL,
    chunk_index    INTEGER NOT NULL,
    total_chunks   INTEGER NOT NULL,
    vector         BLOB NOT NULL,
    UNIQUE (file_path, chunk_index)
);
CREATE INDEX IF NOT EXISTS idx_chunks_extension ON chunks (extension);
";

/// Column order shared by `INSERT` and `SELECT`, matching [`record_from_row`].
pub const COLUMNS: &str = "id, file_path, absolute_path, content, extension, language, size_bytes, total_lines, modified_at, start_line, end_line, chunk_index, total_chunks, vector";

pub const META_DIMENSION: &str = "dimension";
pub const META_EMBEDDER_ID: &str = "embedder_id";
pub const META_COLLECTION: &str = "collection";
pub const META_ROOT: &str = "root";
pub const META_CREATED_AT: &str = "created_at";

/// Vectors are stored as little-endian f32 blobs.
pub fn floats_to_bytes(v: &[f32]) -> Vec<u8> { v.iter().flat_map(|f| f.to_le_bytes()).collect() }

pub fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()
}

pub fn to_i64<T: TryInto<i64>>(v: T) -> i64 { v.try_into().unwrap_or(i64::MAX) }

/// Non-negative integer column; anything else is reported as out of range.
pub fn col_unsigned<T: TryFrom<i64>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let v: i64 = row.get(idx)?;
    T::try_from(v).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, v))
}

pub fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
    let blob: Vec<u8> = row.get(13)?;
    Ok(ChunkRecord {
        chunk: Chunk {
            id: row.get(0)?,
            file_path: row.get(1)?,
            absolute_path: row.get(2)?,
            content: row.get(3)?,
            extension: row.get(4)?,
            language: row.get(5)?,
            size_bytes: col_unsigned(row, 6)?,
            total_lines: col_unsigned(row, 7)?,
            modified_at: row.get(8)?,
            start_line: col_unsigned(row, 9)?,
            end_line: col_unsigned(row, 10)?,
            chunk_index: col_unsigned(row, 11)?,
            total_chunks: col_unsigned(row, 12)?,
        },
        vector: bytes_to_floats(&blob),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_layout_is_little_endian_f32() {
        let v = [1.0f32, -0.5, 3.25];
        let bytes = floats_to_bytes(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(bytes_to_floats(&bytes), v.to_vec());
    }
}
