#![allow(dead_code)]

use scout_core::types::{Document, FuzzyConfig, ScoutKey};
use scout_core::{EngineManager, RedbStore, Scout, ScoutConfig, TaskQueue};
use scout_search::FuzzyEngine;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Harness {
    pub scout: Scout,
    pub store: Arc<RedbStore>,
    pub fuzzy: Arc<FuzzyEngine>,
    _temp_dir: TempDir,
}

/// Facade over a fresh redb store with the fuzzy engine as default driver.
pub fn create_harness(config: ScoutConfig) -> Harness {
    build(config, None)
}

pub fn create_queued_harness(config: ScoutConfig, queue: Arc<dyn TaskQueue>) -> Harness {
    build(config, Some(queue))
}

fn build(config: ScoutConfig, queue: Option<Arc<dyn TaskQueue>>) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(RedbStore::open(&temp_dir.path().join("scout.redb")).unwrap());
    let fuzzy = Arc::new(FuzzyEngine::new(&FuzzyConfig::default()));
    let engines = EngineManager::new(FuzzyEngine::NAME).with(FuzzyEngine::NAME, fuzzy.clone());
    let mut scout = Scout::new(config, store.clone(), engines);
    if let Some(queue) = queue {
        scout = scout.with_queue(queue);
    }
    Harness {
        scout,
        store,
        fuzzy,
        _temp_dir: temp_dir,
    }
}

pub fn key(s: &str) -> ScoutKey {
    ScoutKey::try_from(s).unwrap()
}

pub fn doc(value: Value) -> Document {
    let Value::Object(map) = value else {
        panic!("document must be an object");
    };
    map
}

pub fn keys(values: &[&str]) -> Vec<ScoutKey> {
    values.iter().map(|s| key(s)).collect()
}
