use crate::collection::{search_store, store_unsupported};
use crate::scan;
use scout_core::engine::error::EngineError;
use scout_core::types::{Document, Record, Row, ScoutKey, value_text};
use scout_core::{
    ColumnMatch, Engine, IndexOptions, Model, QueryDescriptor, RawResults, Store, Window,
};
use std::collections::HashSet;
use std::sync::Arc;

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

/// Store-backed search that matches columns the way SQL would.
///
/// Prefix columns match `term%`, full text columns match whole words and
/// every other payload column matches `%term%`. A term equal to the key
/// matches the row as well.
pub struct DatabaseEngine {
    store: Arc<dyn Store>,
}

impl DatabaseEngine {
    pub const NAME: &'static str = "database";

    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn matches(model: &Model, row: &Row, term: &str) -> bool {
        if row.key.as_str() == term {
            return true;
        }
        let needle = term.to_lowercase();
        let needle_words: Vec<&str> = words(&needle).collect();

        model.searchable_payload(row).iter().any(|(column, value)| {
            let text = value_text(value).to_lowercase();
            match model.columns().kind(column) {
                ColumnMatch::Prefix => text.starts_with(&needle),
                ColumnMatch::FullText => {
                    let haystack: HashSet<&str> = words(&text).collect();
                    needle_words.iter().any(|word| haystack.contains(word))
                }
                ColumnMatch::Contains => text.contains(&needle),
            }
        })
    }
}

impl Engine for DatabaseEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&self, _model: &Model, _records: &[Record]) -> Result<(), EngineError> {
        Ok(())
    }

    fn delete(&self, _model: &Model, _keys: &[ScoutKey]) -> Result<(), EngineError> {
        Ok(())
    }

    fn search(&self, query: &QueryDescriptor) -> Result<RawResults, EngineError> {
        search_store(
            self.store.as_ref(),
            query,
            Window::first(query.limit),
            Self::matches,
        )
    }

    fn paginate(
        &self,
        query: &QueryDescriptor,
        per_page: usize,
        page: usize,
    ) -> Result<RawResults, EngineError> {
        search_store(
            self.store.as_ref(),
            query,
            Window::page(per_page, page),
            Self::matches,
        )
    }

    fn total_count(&self, raw: &RawResults) -> usize {
        scan::total(raw)
    }

    fn flush(&self, _model: &Model) -> Result<(), EngineError> {
        Err(store_unsupported(Self::NAME, "flush"))
    }

    fn create_index(&self, _name: &str, _options: &IndexOptions) -> Result<(), EngineError> {
        Err(store_unsupported(Self::NAME, "create_index"))
    }

    fn delete_index(&self, _name: &str) -> Result<(), EngineError> {
        Err(store_unsupported(Self::NAME, "delete_index"))
    }

    fn update_index_settings(&self, _name: &str, _settings: &Document) -> Result<(), EngineError> {
        Err(store_unsupported(Self::NAME, "update_index_settings"))
    }

    fn delete_all_indexes(&self) -> Result<(), EngineError> {
        Err(store_unsupported(Self::NAME, "delete_all_indexes"))
    }
}
