//! Select → chunk → embed → write, one collection per run.
//!
//! Chunks are gathered into windows of `batch_size * concurrency`; a window is
//! embedded as a whole and only written once every batch in it came back
//! valid, one store transaction per batch. Any embedding or store failure
//! ends the run with [`Error::Aborted`] carrying the counters reached so far.
//! Windows written before the failure stay in the store.

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use riffrag_core::chunker::Chunker;
use riffrag_core::selector::{read_text, Candidate, FileSelector, SelectorConfig};
use riffrag_core::traits::VectorStore;
use riffrag_core::types::{Chunk, ChunkRecord, CollectionInfo, IndexOptions, IndexReport, SkipReason};
use riffrag_core::{Error, Result};
use riffrag_embed::EmbeddingClient;

pub struct Indexer<S: VectorStore> {
    store: S,
    client: EmbeddingClient,
    show_progress: bool,
}

impl<S: VectorStore> Indexer<S> {
    pub fn new(store: S, client: EmbeddingClient) -> Self { Self { store, client, show_progress: false } }

    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self { self.show_progress = show_progress; self }

    pub fn store(&self) -> &S { &self.store }

    /// Fresh full index of `root` into `collection`, replacing whatever was there.
    pub async fn index(&self, root: &Path, collection: &str, options: &IndexOptions) -> Result<IndexReport> {
        options.validate()?;
        let selector = FileSelector::new(root, SelectorConfig::from(options))?;
        let chunker = Chunker::new(options.max_lines_per_chunk)?;
        let client = self.client.with_batch_size(options.batch_size)?;

        let started = Instant::now();
        let mut report = IndexReport::new(collection, selector.root());
        let outcome = self.run(&selector, &chunker, &client, collection, &mut report).await;
        report.elapsed = started.elapsed();
        match outcome {
            Ok(()) => {
                info!(
                    %collection, files_scanned = report.files_scanned, files_indexed = report.files_indexed,
                    skipped = report.total_skipped(), chunks = report.chunks_written, elapsed = ?report.elapsed,
                    "indexing complete"
                );
                Ok(report)
            }
            Err(source) => {
                warn!(%collection, files_indexed = report.files_indexed, chunks_written = report.chunks_written, error = %source, "indexing aborted");
                Err(Error::Aborted { report: Box::new(report), source: Box::new(source) })
            }
        }
    }

    async fn run(&self, selector: &FileSelector, chunker: &Chunker, client: &EmbeddingClient, collection: &str, report: &mut IndexReport) -> Result<()> {
        let info = CollectionInfo {
            name: collection.to_string(),
            dimension: client.dim(),
            embedder_id: client.embedder_id(),
            root: selector.root().display().to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.store.create_or_replace(&info)?;

        let window_size = client.batch_size() * client.concurrency();
        let mut pending: Vec<Chunk> = Vec::with_capacity(window_size);
        let pb = self.progress_bar();
        for candidate in selector.walk() {
            report.files_scanned += 1;
            pb.inc(1);
            let file = match candidate {
                Candidate::File(file) => file,
                Candidate::Skipped { path, reason } => {
                    debug!(path = %path.display(), %reason, "skipped");
                    report.record_skip(reason);
                    continue;
                }
            };
            let text = match read_text(&file) {
                Ok(text) => text,
                Err(reason) => { report.record_skip(reason); continue; }
            };
            let chunks = chunker.chunk_file(collection, &file, &text);
            if chunks.is_empty() { report.record_skip(SkipReason::Empty); continue; }
            report.files_indexed += 1;
            report.chunks_created += chunks.len();
            pb.set_message(file.relative_path.clone());
            pending.extend(chunks);

            while pending.len() >= window_size {
                let rest = pending.split_off(window_size);
                let window = std::mem::replace(&mut pending, rest);
                self.flush(client, collection, window, report).await?;
            }
        }
        self.flush(client, collection, pending, report).await?;
        pb.finish_with_message(format!("✅ {} files, {} chunks", report.files_indexed, report.chunks_written));
        Ok(())
    }

    async fn flush(&self, client: &EmbeddingClient, collection: &str, window: Vec<Chunk>, report: &mut IndexReport) -> Result<()> {
        if window.is_empty() { return Ok(()); }
        let texts: Vec<String> = window.iter().map(|c| c.content.clone()).collect();
        let vectors = client.embed_documents(&texts).await?;
        if vectors.len() != window.len() {
            return Err(Error::MalformedEmbedding(format!("{} chunks but {} vectors", window.len(), vectors.len())));
        }
        let records: Vec<ChunkRecord> = window.into_iter().zip(vectors).map(|(chunk, vector)| ChunkRecord { chunk, vector }).collect();
        for batch in records.chunks(client.batch_size()) {
            report.chunks_written += self.store.insert_batch(collection, batch)?;
        }
        debug!(%collection, written = report.chunks_written, "window committed");
        Ok(())
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress { return ProgressBar::hidden(); }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} files {wide_msg}") { pb.set_style(style); }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}
