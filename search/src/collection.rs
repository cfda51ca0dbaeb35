//! Engines that search the store directly instead of an index.

use crate::scan::{self, Candidate};
use scout_core::engine::error::EngineError;
use scout_core::store;
use scout_core::types::{Record, Row, ScoutKey, value_text};
use scout_core::{Engine, IndexOptions, Model, QueryDescriptor, RawResults, Store, Window};
use std::sync::Arc;
use tracing::trace;

/// Scans every visible row of the model and keeps the searchable ones
/// admitted by the filters and accepted by `matches`.
pub(crate) fn search_store<F>(
    store: &dyn Store,
    query: &QueryDescriptor,
    window: Window,
    matches: F,
) -> Result<RawResults, EngineError>
where
    F: Fn(&Model, &Row, &str) -> bool,
{
    let plan = query.scan_plan(window, false);
    let term = plan.term.trim();

    let mut candidates = Vec::new();
    for row in store::scan(store, &query.model, query.scope()) {
        let row = row?;
        if !query.model.should_be_searchable(&row) || !plan.admits(&row.attributes) {
            continue;
        }
        if !term.is_empty() && !matches(&query.model, &row, term) {
            continue;
        }
        candidates.push(Candidate {
            key: row.key,
            document: row.attributes,
            score: None,
        });
    }

    trace!(
        model = query.model.name(),
        term,
        matched = candidates.len(),
        "store scan finished"
    );
    Ok(scan::finish(candidates, &plan))
}

pub(crate) fn store_unsupported(engine: &'static str, operation: &'static str) -> EngineError {
    EngineError::unsupported(engine, operation, "the store is the index")
}

/// Case-insensitive substring match over the searchable payload.
pub struct CollectionEngine {
    store: Arc<dyn Store>,
}

impl CollectionEngine {
    pub const NAME: &'static str = "collection";

    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn matches(model: &Model, row: &Row, term: &str) -> bool {
        let needle = term.to_lowercase();
        model
            .searchable_payload(row)
            .values()
            .any(|value| value_text(value).to_lowercase().contains(&needle))
    }
}

impl Engine for CollectionEngine {
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

    fn update_index_settings(
        &self,
        _name: &str,
        _settings: &scout_core::Document,
    ) -> Result<(), EngineError> {
        Err(store_unsupported(Self::NAME, "update_index_settings"))
    }

    fn delete_all_indexes(&self) -> Result<(), EngineError> {
        Err(store_unsupported(Self::NAME, "delete_all_indexes"))
    }
}
