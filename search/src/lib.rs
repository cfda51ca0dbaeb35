//! Search engines for scout.
//!
//! - `null`: discards writes, finds nothing.
//! - `collection` and `database`: search the store itself, no index to maintain.
//! - `fuzzy`: in-process index matched with nucleo.
//! - `meilisearch`: adapter over the Meilisearch HTTP API.

mod collection;
mod database;
mod fuzzy;
mod meilisearch;
mod null;
mod scan;

pub use collection::CollectionEngine;
pub use database::DatabaseEngine;
pub use fuzzy::FuzzyEngine;
pub use meilisearch::MeilisearchEngine;
pub use null::NullEngine;

use scout_core::engine::error::EngineError;
use scout_core::types::MeilisearchConfig;
use scout_core::{EngineManager, ScoutConfig, Store};
use std::sync::Arc;


/// Registers every engine under its driver name with the configured driver
/// as default. Meilisearch is only registered when configured or selected.
pub fn build_engines(
    config: &ScoutConfig,
    store: Arc<dyn Store>,
) -> Result<EngineManager, EngineError> {
    let mut engines = EngineManager::new(config.driver.clone());
    engines
        .register(NullEngine::NAME, Arc::new(NullEngine))
        .register(CollectionEngine::NAME, Arc::new(CollectionEngine::new(store.clone())))
        .register(DatabaseEngine::NAME, Arc::new(DatabaseEngine::new(store)))
        .register(FuzzyEngine::NAME, Arc::new(FuzzyEngine::new(&config.fuzzy)));

    let meilisearch = match &config.meilisearch {
        Some(meilisearch) => Some(meilisearch.clone()),
        None if config.driver == MeilisearchEngine::NAME => Some(MeilisearchConfig::default()),
        None => None,
    };
    if let Some(meilisearch) = meilisearch {
        engines.register(
            MeilisearchEngine::NAME,
            Arc::new(MeilisearchEngine::new(&meilisearch)?),
        );
    }

    Ok(engines)
}
