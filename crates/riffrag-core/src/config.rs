//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `RIFFRAG_*` env vars (`__` separates sections, e.g.
//! `RIFFRAG_EMBEDDING__MODEL`). `OLLAMA_HOST` is honoured as the endpoint.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{IndexOptions, QueryOptions};

pub const ENV_PREFIX: &str = "RIFFRAG_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub host: String,
    pub model: String,
    /// Manual override; when unset the model is asked for its embedding length.
    pub dimension: Option<usize>,
    pub use_prefixes: bool,
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".into(),
            model: "mxbai-embed-large".into(),
            dimension: None,
            use_prefixes: false,
            concurrency: 4,
            max_retries: 3,
            retry_base_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    pub max_file_size_bytes: u64,
    pub batch_size: usize,
    pub max_lines_per_chunk: usize,
    pub respect_vcs_ignore: bool,
    pub exclude: Vec<String>,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        let d = IndexOptions::default();
        Self { max_file_size_bytes: d.max_file_size_bytes, batch_size: d.batch_size, max_lines_per_chunk: d.max_lines_per_chunk, respect_vcs_ignore: d.respect_vcs_ignore, exclude: d.extra_excludes }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub limit: usize,
    pub min_similarity: f32,
    pub max_content_length: Option<usize>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        let d = QueryOptions::default();
        Self { limit: d.limit, min_similarity: d.min_similarity, max_content_length: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self { Self { database_dir: "~/.riffrag/databases".into() } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self { Self { level: "info".into() } }
}

/// Every recognised option with its default. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub indexing: IndexingSettings,
    pub query: QuerySettings,
    pub storage: StorageSettings,
    pub log: LogSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.model.trim().is_empty() { return Err(Error::InvalidConfig("embedding.model is empty".into())); }
        if self.embedding.host.trim().is_empty() { return Err(Error::InvalidConfig("embedding.host is empty".into())); }
        if self.embedding.concurrency == 0 { return Err(Error::InvalidConfig("embedding.concurrency must be > 0".into())); }
        if self.embedding.max_retries == 0 { return Err(Error::InvalidConfig("embedding.max_retries must be > 0".into())); }
        if self.embedding.dimension == Some(0) { return Err(Error::InvalidConfig("embedding.dimension must be > 0".into())); }
        if self.storage.database_dir.trim().is_empty() { return Err(Error::InvalidConfig("storage.database_dir is empty".into())); }
        self.index_options().validate()?;
        self.query_options().validate()
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            max_file_size_bytes: self.indexing.max_file_size_bytes,
            extra_excludes: self.indexing.exclude.clone(),
            batch_size: self.indexing.batch_size,
            max_lines_per_chunk: self.indexing.max_lines_per_chunk,
            respect_vcs_ignore: self.indexing.respect_vcs_ignore,
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions { limit: self.query.limit, min_similarity: self.query.min_similarity, extension_filter: None }
    }

    pub fn database_dir(&self) -> PathBuf { expand_path(&self.storage.database_dir) }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Defaults, then `config.toml`, `config.<env>.toml`, `RIFFRAG_*` and `OLLAMA_HOST`.
    pub fn load() -> Result<Self> { Self::load_from(Path::new(".")) }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            other => tracing::debug!(env = other, "no environment-specific config file for this RUST_ENV"),
        }
        figment = figment
            .merge(Env::raw().filter_map(|k| if k == "ollama_host" { Some("embedding.host".into()) } else { None }))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(Self::from_figment(figment))
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extract and eagerly validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_toml(toml: &str) -> Config {
        Config::from_figment(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
    }

    #[test]
    fn defaults_validate() {
        let s = with_toml("").settings().expect("settings");
        assert_eq!(s.embedding.model, "mxbai-embed-large");
        assert_eq!(s.indexing.max_file_size_bytes, 1_000_000);
        assert_eq!(s.indexing.batch_size, 10);
        assert_eq!(s.query.limit, 5);
        assert!((s.query.min_similarity - 0.001).abs() < f32::EPSILON);
    }

    #[test]
    fn toml_overrides_sections() {
        let cfg = with_toml("[indexing]\nbatch_size = 32\nexclude = [\"*.md\"]\n[embedding]\ndimension = 768\n");
        let s = cfg.settings().expect("settings");
        assert_eq!(s.indexing.batch_size, 32);
        assert_eq!(s.index_options().extra_excludes, vec!["*.md".to_string()]);
        assert_eq!(s.embedding.dimension, Some(768));
        assert_eq!(s.indexing.max_lines_per_chunk, 100, "untouched keys keep defaults");
        assert_eq!(cfg.get::<usize>("indexing.batch_size").expect("get"), 32);
    }

    #[test]
    fn invalid_values_are_rejected_eagerly() {
        assert!(matches!(with_toml("[indexing]\nbatch_size = 0\n").settings(), Err(Error::InvalidConfig(_))));
        assert!(matches!(with_toml("[embedding]\nconcurrency = 0\n").settings(), Err(Error::InvalidConfig(_))));
        assert!(matches!(with_toml("[query]\nmin_similarity = 2.0\n").settings(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let base = Path::new("/srv/riff");
        assert_eq!(resolve_with_base(base, "db"), PathBuf::from("/srv/riff/db"));
        assert_eq!(resolve_with_base(base, "/abs/db"), PathBuf::from("/abs/db"));
    }
}
