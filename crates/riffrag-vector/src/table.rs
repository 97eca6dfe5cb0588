//! SQLite file housekeeping: where a collection lives, opening it, and the
//! key/value `meta` table that records dimension, embedder and provenance.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

use riffrag_core::types::{sanitize_collection_name, CollectionInfo};
use riffrag_core::{Error, Result};

use crate::schema::{META_COLLECTION, META_CREATED_AT, META_DIMENSION, META_EMBEDDER_ID, META_ROOT, SCHEMA};

pub const FILE_SUFFIX: &str = "_rag.db";
const SIDECARS: [&str; 3] = ["-journal", "-wal", "-shm"];

pub fn store_err(e: rusqlite::Error) -> Error { Error::Store(e.to_string()) }

/// `<dir>/<sanitized>_rag.db`
pub fn collection_path(dir: &Path, name: &str) -> Result<PathBuf> {
    Ok(dir.join(format!("{}{FILE_SUFFIX}", sanitize_collection_name(name)?)))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(store_err)?;
    conn.busy_timeout(std::time::Duration::from_secs(5)).map_err(store_err)?;
    Ok(conn)
}

/// Open a collection that must already exist.
pub fn open_existing(dir: &Path, name: &str) -> Result<Connection> {
    let path = collection_path(dir, name)?;
    if !path.is_file() { return Err(Error::not_found(name)); }
    open_db(&path)
}

/// Remove the collection file and its SQLite sidecars. `false` when nothing was there.
pub fn remove_files(path: &Path) -> Result<bool> {
    let existed = path.is_file();
    if existed { fs::remove_file(path).map_err(|e| Error::io(path, e))?; }
    for suffix in SIDECARS {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.is_file() { fs::remove_file(&side).map_err(|e| Error::io(&side, e))?; }
    }
    Ok(existed)
}

pub fn ensure_schema(conn: &Connection) -> Result<()> { conn.execute_batch(SCHEMA).map_err(store_err) }

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO meta (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().timestamp_millis()],
    )
    .map_err(store_err)?;
    Ok(())
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0)).optional().map_err(store_err)
}

pub fn write_info(conn: &Connection, info: &CollectionInfo) -> Result<()> {
    set_meta(conn, META_COLLECTION, &info.name)?;
    set_meta(conn, META_DIMENSION, &info.dimension.to_string())?;
    set_meta(conn, META_EMBEDDER_ID, &info.embedder_id)?;
    set_meta(conn, META_ROOT, &info.root)?;
    set_meta(conn, META_CREATED_AT, &info.created_at)
}

pub fn read_info(conn: &Connection, fallback_name: &str) -> Result<CollectionInfo> {
    let dimension = get_meta(conn, META_DIMENSION)?
        .ok_or_else(|| Error::Store(format!("collection {fallback_name:?} has no recorded dimension")))?
        .parse::<usize>()
        .map_err(|e| Error::Store(format!("bad dimension in meta: {e}")))?;
    Ok(CollectionInfo {
        name: get_meta(conn, META_COLLECTION)?.unwrap_or_else(|| fallback_name.to_string()),
        dimension,
        embedder_id: get_meta(conn, META_EMBEDDER_ID)?.unwrap_or_default(),
        root: get_meta(conn, META_ROOT)?.unwrap_or_default(),
        created_at: get_meta(conn, META_CREATED_AT)?.unwrap_or_default(),
    })
}

/// Sanitised names of every `*_rag.db` file in `dir`, sorted. A missing dir lists nothing.
pub fn list_collections(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_name = entry.file_name();
        if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(FILE_SUFFIX)) {
            if entry.path().is_file() && !name.is_empty() { names.push(name.to_string()); }
        }
    }
    names.sort();
    Ok(names)
}
