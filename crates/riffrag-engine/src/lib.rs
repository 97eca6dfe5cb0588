pub mod format;
pub mod indexer;
pub mod query;

pub use format::{format_results, OutputFormat};
pub use indexer::Indexer;
pub use query::QueryEngine;
