use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use riffrag_core::config::{Config, Settings};
use riffrag_core::traits::VectorStore;
use riffrag_core::types::{IndexReport, QueryOptions, SkipReason};
use riffrag_embed::{client_from_settings, get_default_embedder};
use riffrag_engine::{format_results, Indexer, OutputFormat, QueryEngine};
use riffrag_vector::SqliteStore;

#[derive(Parser)]
#[command(name = "riffrag", version, about = "Index a codebase into a local vector database and query it")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a directory into a new database
    Index {
        #[command(flatten)]
        args: IndexArgs,
        /// Replace the database if it already exists
        #[arg(long)]
        force: bool,
    },
    /// Delete a database and rebuild it from scratch
    Update(IndexArgs),
    /// Search a database
    Query {
        #[arg(short, long)]
        database: String,
        #[arg(short, long)]
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
        /// plain or claude
        #[arg(short, long, default_value = "plain")]
        format: OutputFormat,
        /// Only chunks with this extension, e.g. `.php`
        #[arg(short, long)]
        extension: Option<String>,
        #[arg(long)]
        min_similarity: Option<f32>,
        #[arg(long)]
        max_content_length: Option<usize>,
    },
    /// Remove a database and its files
    Delete {
        #[arg(short, long)]
        database: String,
    },
    /// Show chunk, file and extension counts of a database
    Stats {
        #[arg(short, long)]
        database: String,
        /// Print the raw stats as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all databases
    List,
}

#[derive(Args)]
struct IndexArgs {
    #[arg(short, long)]
    path: PathBuf,
    #[arg(short, long)]
    name: String,
    /// Extra gitignore-style patterns, comma separated
    #[arg(short, long, value_delimiter = ',')]
    exclude: Vec<String>,
    #[arg(long)]
    max_file_size: Option<u64>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    max_lines: Option<usize>,
    /// Do not read .gitignore files
    #[arg(long)]
    no_vcs_ignore: bool,
    #[arg(long)]
    no_progress: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let settings = config.settings()?;
    init_tracing(&settings.log.level);
    let store = SqliteStore::new(settings.database_dir());
    debug!(database_dir = %store.dir().display(), model = %settings.embedding.model, host = %settings.embedding.host, "settings loaded");

    match cli.command {
        Command::Index { args, force } => {
            let exists = store.exists(&args.name)?;
            if exists && force { info!(database = %args.name, "replacing existing database (--force)"); }
            if exists && !force {
                bail!("database '{}' already exists; run `riffrag update` to rebuild it or pass --force", args.name);
            }
            run_index(&settings, store, &args).await?;
        }
        Command::Update(args) => {
            if store.exists(&args.name)? {
                store.delete(&args.name)?;
                info!(database = %args.name, "removed existing database before rebuild");
                println!("🗑️  Removed existing database '{}'", args.name);
            }
            run_index(&settings, store, &args).await?;
        }
        Command::Query { database, query, limit, format, extension, min_similarity, max_content_length } => {
            let defaults = settings.query_options();
            let options = QueryOptions {
                limit: limit.unwrap_or(defaults.limit),
                min_similarity: min_similarity.unwrap_or(defaults.min_similarity),
                extension_filter: extension,
            };
            if !store.exists(&database)? { bail!("database '{database}' not found (see `riffrag list`)"); }
            let embedder = get_default_embedder(&settings.embedding).await?;
            let engine = QueryEngine::new(store, client_from_settings(embedder, &settings.embedding, settings.indexing.batch_size)?);
            let results = engine.query(&database, &query, &options).await?;
            println!("{}", format_results(&results, format, max_content_length.or(settings.query.max_content_length)));
        }
        Command::Delete { database } => {
            store.delete(&database).with_context(|| format!("cannot delete '{database}'"))?;
            println!("✅ Deleted database '{database}'");
        }
        Command::Stats { database, json } => {
            let stats = store.stats(&database).with_context(|| format!("cannot read stats of '{database}'"))?;
            if json { println!("{}", serde_json::to_string_pretty(&stats)?); return Ok(()); }
            println!("📊 Database: {}", stats.info.name);
            println!("   Root:       {}", stats.info.root);
            println!("   Embedder:   {} (dim {})", stats.info.embedder_id, stats.info.dimension);
            println!("   Created:    {}", stats.info.created_at);
            println!("   Files:      {}", stats.total_files);
            println!("   Chunks:     {}", stats.total_chunks);
            let mut by_count: Vec<(&String, &usize)> = stats.extension_distribution.iter().collect();
            by_count.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (ext, n) in by_count {
                println!("   {:<12} {n}", if ext.is_empty() { "(none)" } else { ext.as_str() });
            }
        }
        Command::List => {
            let names = store.list()?;
            if names.is_empty() { println!("No databases in {}", store.dir().display()); }
            for name in names { println!("{name}"); }
        }
    }
    Ok(())
}

async fn run_index(settings: &Settings, store: SqliteStore, args: &IndexArgs) -> anyhow::Result<()> {
    let mut options = settings.index_options();
    options.extra_excludes.extend(args.exclude.iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()));
    if let Some(v) = args.max_file_size { options.max_file_size_bytes = v; }
    if let Some(v) = args.batch_size { options.batch_size = v; }
    if let Some(v) = args.max_lines { options.max_lines_per_chunk = v; }
    if args.no_vcs_ignore { options.respect_vcs_ignore = false; }
    options.validate()?;

    println!("Indexing {} into '{}'", args.path.display(), args.name);
    let embedder = get_default_embedder(&settings.embedding).await?;
    let client = client_from_settings(embedder, &settings.embedding, options.batch_size)?;
    println!("Embedder: {} (dim {})", client.embedder_id(), client.dim());
    let indexer = Indexer::new(store, client).with_progress(!args.no_progress);
    match indexer.index(&args.path, &args.name, &options).await {
        Ok(report) => { print_report(&report); println!("\n✅ Indexing completed successfully!"); Ok(()) }
        Err(e) => {
            if let Some(report) = e.partial_report() {
                print_report(report);
                println!("\n⚠️  The database is incomplete; rerun `riffrag update` to rebuild it.");
            }
            Err(e.into())
        }
    }
}

fn print_report(report: &IndexReport) {
    println!("\n📊 Collection: {}", report.collection);
    println!("   Files scanned: {}", report.files_scanned);
    println!("   Files indexed: {}", report.files_indexed);
    println!("   Files skipped: {}", report.total_skipped());
    for reason in SkipReason::ALL {
        let n = report.skipped(reason);
        if n > 0 { println!("     {:<15} {n}", reason.as_str()); }
    }
    println!("   Chunks created: {}", report.chunks_created);
    println!("   Chunks written: {}", report.chunks_written);
    println!("   Elapsed: {:.2}s ({:.1} files/sec)", report.elapsed.as_secs_f64(), report.files_per_sec());
}
