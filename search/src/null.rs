use scout_core::engine::error::EngineError;
use scout_core::types::{Document, Record, ScoutKey};
use scout_core::{Engine, IndexOptions, Model, QueryDescriptor, RawResults};

/// Discards writes and finds nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEngine;

impl NullEngine {
    pub const NAME: &'static str = "null";
}

impl Engine for NullEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&self, _model: &Model, _records: &[Record]) -> Result<(), EngineError> {
        Ok(())
    }

    fn delete(&self, _model: &Model, _keys: &[ScoutKey]) -> Result<(), EngineError> {
        Ok(())
    }

    fn search(&self, _query: &QueryDescriptor) -> Result<RawResults, EngineError> {
        Ok(RawResults::empty())
    }

    fn paginate(
        &self,
        _query: &QueryDescriptor,
        _per_page: usize,
        _page: usize,
    ) -> Result<RawResults, EngineError> {
        Ok(RawResults::empty())
    }

    fn total_count(&self, _raw: &RawResults) -> usize {
        0
    }

    fn flush(&self, _model: &Model) -> Result<(), EngineError> {
        Ok(())
    }

    fn create_index(&self, _name: &str, _options: &IndexOptions) -> Result<(), EngineError> {
        Ok(())
    }

    fn delete_index(&self, _name: &str) -> Result<(), EngineError> {
        Ok(())
    }

    fn update_index_settings(&self, _name: &str, _settings: &Document) -> Result<(), EngineError> {
        Ok(())
    }

    fn delete_all_indexes(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
