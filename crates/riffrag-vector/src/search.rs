use rusqlite::{params, Connection};
use std::collections::BTreeMap;

use riffrag_core::types::ChunkRecord;
use riffrag_core::Result;

use crate::schema::{col_unsigned, record_from_row, COLUMNS};
use crate::table::store_err;

/// Full scan in `(file_path, chunk_index)` order, with the extension filter pushed into SQL.
pub fn scan_records(conn: &Connection, extension: Option<&str>) -> Result<Vec<ChunkRecord>> {
    let rows = match extension {
        Some(ext) => {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM chunks WHERE extension = ?1 ORDER BY file_path, chunk_index")).map_err(store_err)?;
            let rows = stmt.query_map(params![ext], record_from_row).map_err(store_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        }
        None => {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM chunks ORDER BY file_path, chunk_index")).map_err(store_err)?;
            let rows = stmt.query_map([], record_from_row).map_err(store_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        }
    };
    rows.map_err(store_err)
}

pub struct Counts {
    pub total_chunks: usize,
    pub total_files: usize,
    /// Distinct files per extension (`""` for files without one).
    pub extension_distribution: BTreeMap<String, usize>,
}

pub fn count_records(conn: &Connection) -> Result<Counts> {
    let (total_chunks, total_files): (usize, usize) = conn
        .query_row("SELECT COUNT(*), COUNT(DISTINCT file_path) FROM chunks", [], |row| Ok((col_unsigned(row, 0)?, col_unsigned(row, 1)?)))
        .map_err(store_err)?;
    let mut stmt = conn.prepare("SELECT extension, COUNT(DISTINCT file_path) FROM chunks GROUP BY extension").map_err(store_err)?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, col_unsigned::<usize>(row, 1)?)))
        .map_err(store_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(store_err)?;
    Ok(Counts { total_chunks, total_files, extension_distribution: pairs.into_iter().collect() })
}
