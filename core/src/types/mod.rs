pub mod config;
pub use config::{
    CaseMatching, ChunkConfig, ConfigError, FuzzyConfig, MeilisearchConfig, ModelConfig,
    QueueConfig, QueueTarget, ScoutConfig, SoftDeletePolicy, StoreConfig,
};

pub(crate) mod document;
pub use document::{
    Document, METADATA_PREFIX, SOFT_DELETED_FIELD, compare_values, loosely_equal, push_text,
    value_text,
};

pub(crate) mod key;
pub use key::{MAX_KEY_LENGTH, ScoutKey, ScoutKeyError};

pub(crate) mod record;
pub use record::Record;

pub(crate) mod row;
pub use row::Row;
