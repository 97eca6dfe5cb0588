use riffrag_core::traits::VectorStore;
use riffrag_core::types::{Chunk, ChunkRecord, CollectionInfo};
use riffrag_core::Error;
use riffrag_vector::SqliteStore;
use tempfile::TempDir;

fn info(name: &str, dimension: usize) -> CollectionInfo {
    CollectionInfo { name: name.into(), dimension, embedder_id: "fake:xxhash64:d3".into(), root: "/src/proj".into(), created_at: "2026-01-01T00:00:00+00:00".into() }
}

fn record(path: &str, idx: usize, ext: &str, vector: Vec<f32>) -> ChunkRecord {
    ChunkRecord {
        chunk: Chunk {
            id: format!("{path}#{idx}"),
            file_path: path.into(),
            absolute_path: format!("/src/proj/{path}"),
            content: format!("line of {path} chunk {idx}\n"),
            start_line: idx * 10 + 1,
            end_line: idx * 10 + 10,
            chunk_index: idx,
            total_chunks: 2,
            extension: ext.into(),
            language: "text".into(),
            size_bytes: 420,
            total_lines: 20,
            modified_at: String::new(),
        },
        vector,
    }
}

#[test]
fn create_insert_scan_and_stats() {
    let tmp = TempDir::new().expect("tmp");
    let store = SqliteStore::new(tmp.path().join("dbs"));
    assert!(!store.exists("My Project").expect("exists"));
    store.create_or_replace(&info("My Project", 3)).expect("create");
    assert!(store.exists("my_project").expect("exists"));
    assert!(tmp.path().join("dbs/my_project_rag.db").is_file());

    let written = store
        .insert_batch("My Project", &[record("b.php", 1, ".php", vec![0.0, 1.0, 0.0]), record("b.php", 0, ".php", vec![1.0, 0.0, 0.0]), record("a.rs", 0, ".rs", vec![0.5, 0.5, 0.0])])
        .expect("insert");
    assert_eq!(written, 3);

    let all = store.scan("My Project", None).expect("scan");
    let order: Vec<(String, usize)> = all.iter().map(|r| (r.chunk.file_path.clone(), r.chunk.chunk_index)).collect();
    assert_eq!(order, vec![("a.rs".into(), 0), ("b.php".into(), 0), ("b.php".into(), 1)]);
    assert_eq!(all[1].vector, vec![1.0, 0.0, 0.0]);
    assert_eq!(all[1].chunk.size_bytes, 420);

    let php = store.scan("My Project", Some(".php")).expect("scan php");
    assert_eq!(php.len(), 2);
    assert!(php.iter().all(|r| r.chunk.extension == ".php"));

    let stats = store.stats("My Project").expect("stats");
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.extension_distribution.get(".php"), Some(&1));
    assert_eq!(stats.info.dimension, 3);
    assert_eq!(stats.info.embedder_id, "fake:xxhash64:d3");
    assert_eq!(stats.info.name, "My Project");
}

#[test]
fn wrong_dimension_is_rejected_and_nothing_is_written() {
    let tmp = TempDir::new().expect("tmp");
    let store = SqliteStore::new(tmp.path());
    store.create_or_replace(&info("proj", 3)).expect("create");
    let err = store.insert_batch("proj", &[record("a.rs", 0, ".rs", vec![1.0, 0.0, 0.0]), record("a.rs", 1, ".rs", vec![1.0, 0.0])]).expect_err("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }), "got {err:?}");
    assert_eq!(store.stats("proj").expect("stats").total_chunks, 0);
}

#[test]
fn duplicate_chunk_rolls_back_the_whole_batch() {
    let tmp = TempDir::new().expect("tmp");
    let store = SqliteStore::new(tmp.path());
    store.create_or_replace(&info("proj", 3)).expect("create");
    store.insert_batch("proj", &[record("a.rs", 0, ".rs", vec![1.0, 0.0, 0.0])]).expect("first");
    let err = store.insert_batch("proj", &[record("b.rs", 0, ".rs", vec![1.0, 0.0, 0.0]), record("a.rs", 0, ".rs", vec![1.0, 0.0, 0.0])]).expect_err("dup");
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(store.stats("proj").expect("stats").total_chunks, 1);
}

#[test]
fn missing_collections_report_not_found() {
    let tmp = TempDir::new().expect("tmp");
    let store = SqliteStore::new(tmp.path());
    assert!(store.scan("ghost", None).expect_err("scan").is_not_found());
    assert!(store.stats("ghost").expect_err("stats").is_not_found());
    assert!(store.info("ghost").expect_err("info").is_not_found());
    assert!(store.delete("ghost").expect_err("delete").is_not_found());
    assert!(store.insert_batch("ghost", &[]).expect_err("insert").is_not_found());
}

#[test]
fn replace_delete_and_list() {
    let tmp = TempDir::new().expect("tmp");
    let store = SqliteStore::new(tmp.path());
    assert!(store.list().expect("list").is_empty());
    store.create_or_replace(&info("beta", 3)).expect("beta");
    store.create_or_replace(&info("alpha", 3)).expect("alpha");
    store.insert_batch("alpha", &[record("a.rs", 0, ".rs", vec![1.0, 0.0, 0.0])]).expect("insert");

    store.create_or_replace(&info("alpha", 4)).expect("replace");
    let stats = store.stats("alpha").expect("stats");
    assert_eq!(stats.total_chunks, 0);
    assert_eq!(stats.info.dimension, 4);
    assert_eq!(store.list().expect("list"), vec!["alpha".to_string(), "beta".to_string()]);

    store.delete("beta").expect("delete");
    assert!(!store.exists("beta").expect("exists"));
    assert_eq!(store.list().expect("list"), vec!["alpha".to_string()]);
}

#[test]
fn unusable_names_are_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let store = SqliteStore::new(tmp.path());
    assert!(matches!(store.create_or_replace(&info("  ///  ", 3)), Err(Error::InvalidConfig(_))));
}

#[test]
fn negative_counters_in_the_file_are_reported_not_zeroed() {
    let tmp = TempDir::new().expect("tmp");
    let store = SqliteStore::new(tmp.path());
    store.create_or_replace(&info("proj", 3)).expect("create");
    store.insert_batch("proj", &[record("a.rs", 0, ".rs", vec![1.0, 0.0, 0.0])]).expect("insert");

    let conn = rusqlite::Connection::open(store.path_of("proj").expect("path")).expect("open");
    conn.execute("UPDATE chunks SET size_bytes = -1", []).expect("corrupt");
    drop(conn);

    let err = store.scan("proj", None).expect_err("corrupt size");
    assert!(matches!(err, Error::Store(ref msg) if msg.contains("out of range")), "got {err:?}");
}
