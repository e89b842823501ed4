//! Recognized configuration schema (spec §6 "Configuration schema").

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_storage_type() -> String {
    "rocksdb".to_string()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".cache/graph.db")
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_pool_size() -> usize {
    4
}

fn default_watch_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

/// `{name, compilation_root_path}` — one entry per indexed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub name: String,
    pub compilation_root_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Rocksdb
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type", default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

/// `watch.include` / `watch.exclude` glob filters and the debounce window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_watch_globs")]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(rename = "debounce", default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            include: default_watch_globs(),
            exclude: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `embedding.preset` names a built-in model bundle (repo, filename,
/// prefixes, dimensions known in advance); the explicit variant spells out
/// every field itself. Both forms recognized by `embedding.*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingSource {
    Preset { preset: String },
    Explicit {
        repo: String,
        filename: String,
        #[serde(default)]
        query_prefix: Option<String>,
        #[serde(default)]
        document_prefix: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(flatten)]
    pub source: EmbeddingSource,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Fixed per preset; required when `source` is `Explicit`.
    pub dimensions: usize,
}

/// `server.port` is recognized by the schema but belongs to the transport
/// layer named as an external collaborator in spec §1 — carried here only so
/// a config file written for the full system round-trips without a
/// deserialize failure, never read by this core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub packages: Vec<PackageConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Configuration failures are fatal at startup (spec §7): the core reports
/// which option failed and why.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.pool_size == 0 {
            return Err(ConfigError::Validation(
                "embedding.pool_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::Validation(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        for package in &self.packages {
            if package.name.is_empty() {
                return Err(ConfigError::Validation(
                    "packages[].name must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let raw = r#"
            [embedding]
            preset = "minilm"
            dimensions = 384
        "#;
        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Rocksdb);
        assert_eq!(config.storage.path, default_storage_path());
        assert_eq!(config.watch.debounce_ms, 300);
        assert_eq!(config.embedding.pool_size, 4);
        assert!(config.packages.is_empty());
    }

    #[test]
    fn parses_explicit_embedding_source() {
        let raw = r#"
            [embedding]
            repo = "org/model"
            filename = "model.onnx"
            dimensions = 768
            pool_size = 8
        "#;
        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.embedding.pool_size, 8);
        match config.embedding.source {
            EmbeddingSource::Explicit { repo, filename, .. } => {
                assert_eq!(repo, "org/model");
                assert_eq!(filename, "model.onnx");
            }
            EmbeddingSource::Preset { .. } => panic!("expected explicit source"),
        }
    }

    #[test]
    fn rejects_zero_pool_size() {
        let raw = r#"
            [embedding]
            preset = "minilm"
            dimensions = 384
            pool_size = 0
        "#;
        let err = Config::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn missing_file_reports_not_found() {
        let err = Config::from_toml_file(Path::new("/nonexistent/codegraph.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
