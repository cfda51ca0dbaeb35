use crate::types::{
    Document, ModelConfig, QueueTarget, Record, Row, SOFT_DELETED_FIELD, ScoutKey,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;


/// Builds the searchable payload of a row.
pub type Extractor = Arc<dyn Fn(&Row) -> Document + Send + Sync>;

/// Decides whether a row belongs in the index at all.
pub type Condition = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// How the database engine matches a term against a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnMatch {
    /// `column LIKE term%`
    Prefix,
    /// Whole-word match.
    FullText,
    /// `column LIKE %term%`
    Contains,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchColumns {
    pub full_text: BTreeSet<String>,
    pub prefix: BTreeSet<String>,
}

impl SearchColumns {
    pub fn kind(&self, column: &str) -> ColumnMatch {
        if self.prefix.contains(column) {
            ColumnMatch::Prefix
        } else if self.full_text.contains(column) {
            ColumnMatch::FullText
        } else {
            ColumnMatch::Contains
        }
    }
}

/// A searchable model: how its rows are named, projected and routed.
#[derive(Clone)]
pub struct Model {
    name: String,
    index: Option<String>,
    prefix: String,
    key_name: String,
    soft_deletes: bool,
    insensitive: BTreeSet<String>,
    columns: SearchColumns,
    engine: Option<String>,
    queue: Option<QueueTarget>,
    chunk_size: Option<usize>,
    index_settings: Option<Document>,
    extractor: Option<Extractor>,
    condition: Option<Condition>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            prefix: String::new(),
            key_name: "id".to_string(),
            soft_deletes: false,
            insensitive: BTreeSet::new(),
            columns: SearchColumns::default(),
            engine: None,
            queue: None,
            chunk_size: None,
            index_settings: None,
            extractor: None,
            condition: None,
        }
    }

    pub fn from_config(name: &str, config: &ModelConfig) -> Self {
        let mut model = Self::new(name)
            .key_name(config.key_name.clone())
            .soft_deletes(config.soft_deletes)
            .insensitive(config.insensitive.iter().cloned())
            .full_text(config.full_text.iter().cloned())
            .prefix_columns(config.prefix.iter().cloned());
        model.index = config.index.clone();
        model.engine = config.engine.clone();
        model.queue = config.queue.clone();
        model.chunk_size = config.chunk_size;
        model
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Prefix applied to the default index name. Explicit index names are left alone.
    pub fn prefixed(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    pub fn soft_deletes(mut self, enabled: bool) -> Self {
        self.soft_deletes = enabled;
        self
    }

    pub fn insensitive<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insensitive.extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn full_text<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .full_text
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn prefix_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.prefix.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn engine(mut self, driver: impl Into<String>) -> Self {
        self.engine = Some(driver.into());
        self
    }

    pub fn queue(mut self, target: QueueTarget) -> Self {
        self.queue = Some(target);
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn index_settings(mut self, settings: Document) -> Self {
        self.index_settings = Some(settings);
        self
    }

    pub fn to_searchable<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&Row) -> Document + Send + Sync + 'static,
    {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    pub fn searchable_when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }
}

/// Accessors.
impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_name(&self) -> String {
        match &self.index {
            Some(index) => index.clone(),
            None => format!("{}{}", self.prefix, self.name),
        }
    }

    pub fn key_field(&self) -> &str {
        &self.key_name
    }

    pub fn uses_soft_deletes(&self) -> bool {
        self.soft_deletes
    }

    pub fn is_insensitive(&self, attribute: &str) -> bool {
        self.insensitive.contains(attribute)
    }

    pub fn columns(&self) -> &SearchColumns {
        &self.columns
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    pub fn queue_target(&self) -> Option<&QueueTarget> {
        self.queue.as_ref()
    }

    pub fn chunk_size_override(&self) -> Option<usize> {
        self.chunk_size
    }

    pub fn settings(&self) -> Option<&Document> {
        self.index_settings.as_ref()
    }
}

/// Projection.
impl Model {
    /// Searchable payload of a row. Without an extractor every attribute is indexed.
    pub fn searchable_payload(&self, row: &Row) -> Document {
        match &self.extractor {
            Some(extractor) => extractor(row),
            None => row.attributes.clone(),
        }
    }

    pub fn should_be_searchable(&self, row: &Row) -> bool {
        match &self.condition {
            Some(condition) => condition(row),
            None => true,
        }
    }

    /// Projects a row into an engine record. `flag_soft_delete` adds the
    /// `__soft_deleted` metadata field.
    pub fn to_record(&self, row: &Row, flag_soft_delete: bool) -> Record {
        let mut metadata = Document::new();
        if flag_soft_delete {
            let flag = if row.is_trashed() { 1 } else { 0 };
            metadata.insert(SOFT_DELETED_FIELD.to_string(), Value::from(flag));
        }
        Record {
            key: row.key.clone(),
            key_name: self.key_name.clone(),
            payload: self.searchable_payload(row),
            metadata,
        }
    }

    pub fn keys_of(rows: &[Row]) -> Vec<ScoutKey> {
        rows.iter().map(|row| row.key.clone()).collect()
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("index", &self.index_name())
            .field("key_name", &self.key_name)
            .field("soft_deletes", &self.soft_deletes)
            .field("insensitive", &self.insensitive)
            .field("columns", &self.columns)
            .field("engine", &self.engine)
            .field("queue", &self.queue)
            .field("chunk_size", &self.chunk_size)
            .field("extractor", &self.extractor.is_some())
            .field("condition", &self.condition.is_some())
            .finish()
    }
}
