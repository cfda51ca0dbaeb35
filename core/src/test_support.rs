use crate::engine::error::EngineError;
use crate::engine::{Engine, EngineManager, Hit, IndexOptions, RawResults};
use crate::model::Model;
use crate::query::{QueryDescriptor, Window};
use crate::scout::Scout;
use crate::store::db::RedbStore;
use crate::store::error::StoreError;
use crate::store::{Scope, Store};
use crate::types::{Document, Record, Row, ScoutConfig, ScoutKey};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub(crate) fn create_test_store() -> (RedbStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = RedbStore::open(&temp_dir.path().join("scout.redb")).unwrap();
    (store, temp_dir)
}

pub(crate) fn key(s: &str) -> ScoutKey {
    ScoutKey::try_from(s).unwrap()
}

pub(crate) fn doc(value: Value) -> Document {
    let Value::Object(map) = value else {
        panic!("document must be an object");
    };
    map
}

pub(crate) fn row(k: &str, value: Value) -> Row {
    Row::new(key(k), doc(value))
}

/// Seeds `count` rows keyed `1..=count` with a title per row.
pub(crate) fn seed(store: &RedbStore, model: &Model, count: usize) {
    let rows = (1..=count).map(|i| (key(&i.to_string()), doc(json!({"title": format!("Post {i}")}))));
    store.save_many(model, rows).unwrap();
}

/// Facade over a fresh store and a scripted engine registered as the default driver.
pub(crate) fn create_test_scout(
    config: ScoutConfig,
    engine: Arc<ScriptedEngine>,
) -> (Scout, Arc<RedbStore>, TempDir) {
    let (store, temp_dir) = create_test_store();
    let store = Arc::new(store);
    let engines = EngineManager::new("scripted").with("scripted", engine);
    let scout = Scout::new(config, store.clone(), engines);
    (scout, store, temp_dir)
}

/// Engine returning a fixed hit list and recording writes.
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    hits: Mutex<Vec<ScoutKey>>,
    pub(crate) updates: Mutex<Vec<Vec<Record>>>,
    pub(crate) deletes: Mutex<Vec<Vec<ScoutKey>>>,
    pub(crate) settings: Mutex<Vec<(String, Document)>>,
}

impl ScriptedEngine {
    pub(crate) fn with_hits(keys: &[&str]) -> Self {
        let engine = Self::default();
        *engine.hits.lock().unwrap() = keys.iter().map(|k| key(k)).collect();
        engine
    }

    pub(crate) fn updated_keys(&self) -> Vec<Vec<String>> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.iter().map(|r| r.key.to_string()).collect())
            .collect()
    }

    pub(crate) fn deleted_keys(&self) -> Vec<Vec<String>> {
        self.deletes
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.iter().map(ToString::to_string).collect())
            .collect()
    }

    fn results(&self, window: Window) -> RawResults {
        let all = self.hits.lock().unwrap().clone();
        let total = all.len();
        let hits = window
            .apply(all)
            .into_iter()
            .map(|key| {
                let mut hit = Hit::new(key.clone());
                hit.fields.insert("id".to_string(), key.to_json());
                hit.fields.insert("_rankingScore".to_string(), json!(0.5));
                hit
            })
            .collect();
        RawResults {
            hits,
            body: json!({ "total": total }),
        }
    }
}

impl Engine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn update(&self, _model: &Model, records: &[Record]) -> Result<(), EngineError> {
        if !records.is_empty() {
            self.updates.lock().unwrap().push(records.to_vec());
        }
        Ok(())
    }

    fn delete(&self, _model: &Model, keys: &[ScoutKey]) -> Result<(), EngineError> {
        self.deletes.lock().unwrap().push(keys.to_vec());
        Ok(())
    }

    fn search(&self, query: &QueryDescriptor) -> Result<RawResults, EngineError> {
        Ok(self.results(Window::first(query.limit)))
    }

    fn paginate(
        &self,
        _query: &QueryDescriptor,
        per_page: usize,
        page: usize,
    ) -> Result<RawResults, EngineError> {
        Ok(self.results(Window::page(per_page, page)))
    }

    fn total_count(&self, raw: &RawResults) -> usize {
        raw.body["total"].as_u64().unwrap_or(0) as usize
    }

    fn metadata_prefix(&self) -> Option<&str> {
        Some("_")
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

    fn update_index_settings(&self, name: &str, settings: &Document) -> Result<(), EngineError> {
        self.settings
            .lock()
            .unwrap()
            .push((name.to_string(), settings.clone()));
        Ok(())
    }
}

/// Store wrapper counting `fetch_by_keys` calls.
pub(crate) struct CountingStore<S> {
    inner: S,
    pub(crate) fetches: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl<S: Store> Store for CountingStore<S> {
    fn fetch_by_keys(
        &self,
        model: &Model,
        keys: &[ScoutKey],
        scope: &Scope,
    ) -> Result<Vec<Row>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_by_keys(model, keys, scope)
    }

    fn chunk_after(
        &self,
        model: &Model,
        after: Option<&ScoutKey>,
        size: usize,
        scope: &Scope,
    ) -> Result<Vec<Row>, StoreError> {
        self.inner.chunk_after(model, after, size, scope)
    }
}
