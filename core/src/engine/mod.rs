//! Backend adapter contract.

use crate::mapper::{self, LazyMap};
use crate::model::Model;
use crate::query::QueryDescriptor;
use crate::store::Store;
use crate::store::error::StoreError;
use crate::types::{Document, Record, Row, ScoutKey};
use serde_json::Value;

pub mod manager;
pub use manager::EngineManager;

pub mod error {
    use crate::store::error::StoreError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("{engine} engine does not support {operation}: {reason}")]
        Unsupported {
            engine: &'static str,
            operation: &'static str,
            reason: String,
        },

        #[error("Transport error: {0}")]
        Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

        #[error("API error {status}: {message}")]
        Api {
            status: u16,
            code: Option<String>,
            message: String,
        },

        #[error("Invalid filter value for {field}: {reason}")]
        InvalidFilterValue { field: String, reason: String },

        #[error("Index not found: {0}")]
        IndexNotFound(String),

        #[error("Index already exists: {0}")]
        IndexExists(String),

        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),

        #[error("Store error: {0}")]
        Store(#[from] StoreError),

        #[error("Engine state poisoned: {0}")]
        Poisoned(&'static str),
    }

    impl EngineError {
        pub fn unsupported(
            engine: &'static str,
            operation: &'static str,
            reason: impl Into<String>,
        ) -> Self {
            EngineError::Unsupported {
                engine,
                operation,
                reason: reason.into(),
            }
        }

        pub fn is_unsupported(&self) -> bool {
            matches!(self, EngineError::Unsupported { .. })
        }

        /// Absent indexes are reported by the API as `index_not_found`.
        pub fn is_index_not_found(&self) -> bool {
            match self {
                EngineError::IndexNotFound(_) => true,
                EngineError::Api { code, .. } => code.as_deref() == Some("index_not_found"),
                _ => false,
            }
        }
    }
}

use error::EngineError;

/// One backend result before mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub key: ScoutKey,
    /// Fields returned by the backend, metadata such as `_rankingScore` included.
    pub fields: Document,
}

impl Hit {
    pub fn new(key: ScoutKey) -> Self {
        Self {
            key,
            fields: Document::new(),
        }
    }
}

/// Ordered hits plus the backend's response body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResults {
    pub hits: Vec<Hit>,
    pub body: Value,
}

impl RawResults {
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            body: Value::Null,
        }
    }

    pub fn keys(&self) -> Vec<ScoutKey> {
        self.hits.iter().map(|hit| hit.key.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Options of an explicit index creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexOptions {
    pub primary_key: Option<String>,
    pub settings: Document,
}

/// A search backend.
pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upserts records. Empty batches and empty payloads are skipped.
    fn update(&self, model: &Model, records: &[Record]) -> Result<(), EngineError>;

    /// Removes records by key. Absent records are not an error.
    fn delete(&self, model: &Model, keys: &[ScoutKey]) -> Result<(), EngineError>;

    fn search(&self, query: &QueryDescriptor) -> Result<RawResults, EngineError>;

    /// Searches one 1-based page.
    fn paginate(
        &self,
        query: &QueryDescriptor,
        per_page: usize,
        page: usize,
    ) -> Result<RawResults, EngineError>;

    /// Total number of matches reported by the backend.
    fn total_count(&self, raw: &RawResults) -> usize;

    fn keys(&self, raw: &RawResults) -> Vec<ScoutKey> {
        raw.keys()
    }

    /// Prefix of hit fields copied into the metadata of mapped rows.
    fn metadata_prefix(&self) -> Option<&str> {
        None
    }

    fn map(
        &self,
        store: &dyn Store,
        query: &QueryDescriptor,
        raw: &RawResults,
    ) -> Result<Vec<Row>, StoreError> {
        mapper::map(store, query, raw, self.metadata_prefix())
    }

    fn lazy_map<'a>(
        &self,
        store: &'a dyn Store,
        query: &QueryDescriptor,
        raw: RawResults,
    ) -> LazyMap<'a> {
        mapper::lazy_map(store, query, raw, self.metadata_prefix())
    }

    /// Removes every record of the model's index.
    fn flush(&self, model: &Model) -> Result<(), EngineError>;

    fn create_index(&self, name: &str, options: &IndexOptions) -> Result<(), EngineError>;

    fn delete_index(&self, name: &str) -> Result<(), EngineError>;

    fn update_index_settings(&self, name: &str, settings: &Document) -> Result<(), EngineError> {
        let _ = (name, settings);
        Err(EngineError::unsupported(
            self.name(),
            "update_index_settings",
            "index settings are not configurable",
        ))
    }

    fn delete_all_indexes(&self) -> Result<(), EngineError> {
        Err(EngineError::unsupported(
            self.name(),
            "delete_all_indexes",
            "indexes are not enumerable",
        ))
    }
}
