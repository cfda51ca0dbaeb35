use crate::types::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;


/// Search layer configuration, persisted as scout.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Name of the default engine driver.
    pub driver: String,
    /// Prepended to every model's default index name.
    pub prefix: String,
    pub soft_delete: SoftDeletePolicy,
    pub chunk: ChunkConfig,
    pub queue: QueueConfig,
    pub store: StoreConfig,
    pub fuzzy: FuzzyConfig,
    pub meilisearch: Option<MeilisearchConfig>,
    pub models: BTreeMap<String, ModelConfig>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            prefix: String::new(),
            soft_delete: SoftDeletePolicy::default(),
            chunk: ChunkConfig::default(),
            queue: QueueConfig::default(),
            store: StoreConfig::default(),
            fuzzy: FuzzyConfig::default(),
            meilisearch: None,
            models: BTreeMap::new(),
        }
    }
}

impl ScoutConfig {
    /// Returns the config file path within the given directory.
    pub fn path(dir: &Path) -> PathBuf {
        dir.join("scout.toml")
    }

    /// Loads config from a TOML file. Returns default config if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Saves config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates config values and returns list of validation errors.
    /// Returns empty vec if config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.driver.trim().is_empty() {
            errors.push("driver must not be empty".to_string());
        }

        if self.chunk.searchable == 0 {
            errors.push("chunk.searchable must be at least 1".to_string());
        }

        if self.chunk.unsearchable == 0 {
            errors.push("chunk.unsearchable must be at least 1".to_string());
        }

        if let Some(meilisearch) = &self.meilisearch
            && meilisearch.host.trim().is_empty()
        {
            errors.push("meilisearch.host must not be empty".to_string());
        }

        for (name, model) in &self.models {
            if model.key_name.trim().is_empty() {
                errors.push(format!("models.{name}.key_name must not be empty"));
            }
            if model.chunk_size == Some(0) {
                errors.push(format!("models.{name}.chunk_size must be at least 1"));
            }
        }

        errors
    }

    /// Returns a validated config, replacing invalid values with defaults.
    pub fn with_defaults_for_invalid(&self) -> Self {
        let defaults = Self::default();
        let mut config = self.clone();

        if config.driver.trim().is_empty() {
            config.driver = defaults.driver;
        }
        if config.chunk.searchable == 0 {
            config.chunk.searchable = defaults.chunk.searchable;
        }
        if config.chunk.unsearchable == 0 {
            config.chunk.unsearchable = defaults.chunk.unsearchable;
        }
        if let Some(meilisearch) = config.meilisearch.as_mut()
            && meilisearch.host.trim().is_empty()
        {
            meilisearch.host = default_meilisearch_host();
        }
        for model in config.models.values_mut() {
            if model.key_name.trim().is_empty() {
                model.key_name = default_key_name();
            }
            if model.chunk_size == Some(0) {
                model.chunk_size = None;
            }
        }

        config
    }
}

/// What happens to the index entry of a row moved to the trash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftDeletePolicy {
    /// Trashed rows are removed from the index.
    #[default]
    Remove,
    /// Trashed rows stay indexed with `__soft_deleted = 1`.
    KeepFlagged,
}

impl fmt::Display for SoftDeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftDeletePolicy::Remove => write!(f, "remove"),
            SoftDeletePolicy::KeepFlagged => write!(f, "keep_flagged"),
        }
    }
}

/// Chunk sizes of bulk import and removal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_chunk_size")]
    pub searchable: usize,
    #[serde(default = "default_chunk_size")]
    pub unsearchable: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            searchable: default_chunk_size(),
            unsearchable: default_chunk_size(),
        }
    }
}

/// Background dispatch of index writes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
}

impl QueueConfig {
    pub fn target(&self) -> QueueTarget {
        QueueTarget {
            connection: self.connection.clone(),
            queue: self.queue.clone(),
        }
    }
}

/// Named connection and queue a sync task is routed to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTarget {
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
}

impl QueueTarget {
    /// Fills fields left unset from `fallback`.
    pub fn or(&self, fallback: &QueueTarget) -> QueueTarget {
        QueueTarget {
            connection: self.connection.clone().or_else(|| fallback.connection.clone()),
            queue: self.queue.clone().or_else(|| fallback.queue.clone()),
        }
    }
}

/// Location of the reference store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Case matching of the in-process fuzzy engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMatching {
    Sensitive,
    Insensitive,
    /// Case-insensitive unless the term contains an uppercase character.
    #[default]
    Smart,
}

/// In-process fuzzy engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuzzyConfig {
    #[serde(default)]
    pub case_matching: CaseMatching,
    #[serde(default = "default_true")]
    pub unicode_normalization: bool,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            case_matching: CaseMatching::default(),
            unicode_normalization: true,
        }
    }
}

/// Remote Meilisearch connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeilisearchConfig {
    #[serde(default = "default_meilisearch_host")]
    pub host: String,
    #[serde(default)]
    pub key: Option<String>,
    /// Settings pushed by `sync-index-settings`, keyed by index name.
    #[serde(default)]
    pub index_settings: BTreeMap<String, Document>,
}

impl Default for MeilisearchConfig {
    fn default() -> Self {
        Self {
            host: default_meilisearch_host(),
            key: None,
            index_settings: BTreeMap::new(),
        }
    }
}

/// Per-model overrides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default = "default_key_name")]
    pub key_name: String,
    #[serde(default)]
    pub soft_deletes: bool,
    /// Attributes whose changes never trigger a reindex.
    #[serde(default)]
    pub insensitive: Vec<String>,
    #[serde(default)]
    pub full_text: Vec<String>,
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub queue: Option<QueueTarget>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            index: None,
            key_name: default_key_name(),
            soft_deletes: false,
            insensitive: Vec::new(),
            full_text: Vec::new(),
            prefix: Vec::new(),
            engine: None,
            chunk_size: None,
            queue: None,
        }
    }
}

fn default_driver() -> String {
    "fuzzy".to_string()
}

fn default_chunk_size() -> usize {
    500
}

fn default_store_path() -> PathBuf {
    PathBuf::from("scout.redb")
}

fn default_meilisearch_host() -> String {
    "http://127.0.0.1:7700".to_string()
}

fn default_key_name() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

/// Errors that can occur when loading or saving config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
