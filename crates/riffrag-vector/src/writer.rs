use rusqlite::{params, Connection};
use tracing::debug;

use riffrag_core::types::ChunkRecord;
use riffrag_core::{Error, Result};

use crate::schema::{floats_to_bytes, to_i64, COLUMNS};
use crate::table::store_err;

/// Insert one batch in a single transaction. Any invalid record or SQL error
/// rolls back the whole batch.
pub fn insert_records(conn: &mut Connection, dimension: usize, records: &[ChunkRecord]) -> Result<usize> {
    if records.is_empty() { return Ok(0); }
    if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
        return Err(Error::DimensionMismatch { expected: dimension, actual: bad.vector.len() });
    }
    let tx = conn.transaction().map_err(store_err)?;
    {
        let sql = format!("INSERT INTO chunks ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)");
        let mut stmt = tx.prepare_cached(&sql).map_err(store_err)?;
        for r in records {
            let c = &r.chunk;
            stmt.execute(params![
                c.id, c.file_path, c.absolute_path, c.content, c.extension, c.language,
                to_i64(c.size_bytes), to_i64(c.total_lines), c.modified_at,
                to_i64(c.start_line), to_i64(c.end_line), to_i64(c.chunk_index), to_i64(c.total_chunks),
                floats_to_bytes(&r.vector),
            ])
            .map_err(store_err)?;
        }
    }
    tx.commit().map_err(store_err)?;
    debug!(count = records.len(), "inserted chunk batch");
    Ok(records.len())
}
