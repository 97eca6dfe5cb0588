//! SQLite-backed [`VectorStore`]: one database file per collection under a
//! root directory. Each operation opens its own connection, so the store is
//! a plain handle that can be shared between tasks; writes to one collection
//! are still expected to come from a single writer.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use riffrag_core::traits::VectorStore;
use riffrag_core::types::{ChunkRecord, CollectionInfo, CollectionStats};
use riffrag_core::{Error, Result};

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

use table::{collection_path, ensure_schema, open_db, open_existing, read_info, remove_files, write_info};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    dir: PathBuf,
}

impl SqliteStore {
    /// Store rooted at `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_of(&self, collection: &str) -> Result<PathBuf> { collection_path(&self.dir, collection) }
}

impl VectorStore for SqliteStore {
    fn create_or_replace(&self, info: &CollectionInfo) -> Result<()> {
        if info.dimension == 0 { return Err(Error::InvalidConfig("collection dimension must be > 0".into())); }
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.path_of(&info.name)?;
        if remove_files(&path)? { info!(collection = %info.name, "replaced existing collection"); }
        let mut conn = open_db(&path)?;
        ensure_schema(&conn)?;
        let tx = conn.transaction().map_err(table::store_err)?;
        write_info(&tx, info)?;
        tx.commit().map_err(table::store_err)?;
        info!(collection = %info.name, dimension = info.dimension, path = %path.display(), "created collection");
        Ok(())
    }

    fn insert_batch(&self, collection: &str, records: &[ChunkRecord]) -> Result<usize> {
        let mut conn = open_existing(&self.dir, collection)?;
        let dimension = read_info(&conn, collection)?.dimension;
        writer::insert_records(&mut conn, dimension, records)
    }

    fn scan(&self, collection: &str, extension: Option<&str>) -> Result<Vec<ChunkRecord>> {
        let conn = open_existing(&self.dir, collection)?;
        search::scan_records(&conn, extension)
    }

    fn delete(&self, collection: &str) -> Result<()> {
        let path = self.path_of(collection)?;
        if !remove_files(&path)? { return Err(Error::not_found(collection)); }
        info!(%collection, "deleted collection");
        Ok(())
    }

    fn info(&self, collection: &str) -> Result<CollectionInfo> {
        let conn = open_existing(&self.dir, collection)?;
        read_info(&conn, collection)
    }

    fn stats(&self, collection: &str) -> Result<CollectionStats> {
        let conn = open_existing(&self.dir, collection)?;
        let info = read_info(&conn, collection)?;
        let counts = search::count_records(&conn)?;
        Ok(CollectionStats { info, total_chunks: counts.total_chunks, total_files: counts.total_files, extension_distribution: counts.extension_distribution })
    }

    fn exists(&self, collection: &str) -> Result<bool> { Ok(self.path_of(collection)?.is_file()) }

    fn list(&self) -> Result<Vec<String>> { table::list_collections(&self.dir) }
}
