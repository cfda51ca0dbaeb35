//! The facade tying models, store, engines and synchronization together.

use crate::bulk::{self, BulkAction, BulkObserver, BulkReport};
use crate::dispatch::{DispatchOutcome, SyncTask, TaskPayload, TaskQueue, WriteDispatcher};
use crate::engine::{Engine, EngineManager, IndexOptions};
use crate::error::ScoutError;
use crate::model::Model;
use crate::query::{Builder, QueryDescriptor};
use crate::store::{Scope, Store, TrashedMode};
use crate::sync::{LifecycleEvent, SyncDecision, SyncPolicy, Synchronizer};
use crate::types::{Document, Row, SOFT_DELETED_FIELD, ScoutConfig, ScoutKey};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};


pub struct Scout {
    config: ScoutConfig,
    store: Arc<dyn Store>,
    engines: EngineManager,
    dispatcher: WriteDispatcher,
    synchronizer: Synchronizer,
    models: BTreeMap<String, Arc<Model>>,
}

impl Scout {
    /// Creates the facade and registers every model of `config.models`.
    pub fn new(config: ScoutConfig, store: Arc<dyn Store>, engines: EngineManager) -> Self {
        let dispatcher = WriteDispatcher::new(config.queue.clone());
        let synchronizer = Synchronizer::new(SyncPolicy::new(config.soft_delete));
        let mut scout = Self {
            config,
            store,
            engines,
            dispatcher,
            synchronizer,
            models: BTreeMap::new(),
        };
        let configured: Vec<Model> = scout
            .config
            .models
            .iter()
            .map(|(name, model)| Model::from_config(name, model))
            .collect();
        for model in configured {
            scout.register(model);
        }
        scout
    }

    pub fn with_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.dispatcher.set_queue(queue);
        self
    }

    /// Registers a model, applying the configured index prefix. Replaces a
    /// model of the same name.
    pub fn register(&mut self, model: Model) -> Arc<Model> {
        let model = Arc::new(model.prefixed(self.config.prefix.clone()));
        self.models
            .insert(model.name().to_string(), Arc::clone(&model));
        model
    }

    pub fn model(&self, name: &str) -> Result<Arc<Model>, ScoutError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ScoutError::UnknownModel(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.models.values()
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn engines(&self) -> &EngineManager {
        &self.engines
    }

    pub fn engine_for(&self, model: &Model) -> Result<&Arc<dyn Engine>, ScoutError> {
        self.engines.for_model(model)
    }
}

/// Search operations.
impl Scout {
    pub fn search(&self, model: &Arc<Model>, term: impl Into<String>) -> Builder<'_> {
        let mut query = QueryDescriptor::new(Arc::clone(model), term);
        query.soft_delete_flagged = self.synchronizer.policy().keeps_flagged(model);
        Builder::new(self, query)
    }
}

/// Synchronization operations.
impl Scout {
    /// Decides what a store mutation means for the index and dispatches it.
    pub fn observe(
        &self,
        model: &Model,
        event: &LifecycleEvent,
    ) -> Result<SyncDecision, ScoutError> {
        let decision = self.synchronizer.decide(model, event);
        match decision {
            SyncDecision::Index => {
                self.searchable(model, std::slice::from_ref(&event.row))?;
            }
            SyncDecision::Remove => {
                self.unsearchable(model, vec![event.row.key.clone()])?;
            }
            SyncDecision::Skip => {}
        }
        Ok(decision)
    }

    /// Pushes rows to the index, leaving out rows that should not be searchable.
    pub fn searchable(&self, model: &Model, rows: &[Row]) -> Result<DispatchOutcome, ScoutError> {
        let engine = self.engines.for_model(model)?;
        let rows: Vec<Row> = rows
            .iter()
            .filter(|row| model.should_be_searchable(row))
            .cloned()
            .collect();
        let records = self
            .dispatcher
            .records(self.synchronizer.policy(), model, &rows);
        self.dispatcher.index(engine.as_ref(), model, records)
    }

    pub fn unsearchable(
        &self,
        model: &Model,
        keys: Vec<ScoutKey>,
    ) -> Result<DispatchOutcome, ScoutError> {
        let engine = self.engines.for_model(model)?;
        self.dispatcher.remove(engine.as_ref(), model, keys)
    }

    /// Executes a task taken off the queue.
    pub fn handle_task(&self, task: &SyncTask) -> Result<(), ScoutError> {
        let model = self.model(&task.model)?;
        let engine = self.engines.for_model(&model)?;
        debug!(
            model = model.name(),
            action = %task.action(),
            unique_key = %task.unique_key,
            "handling task"
        );
        match &task.payload {
            TaskPayload::Update(records) => engine.update(&model, records)?,
            TaskPayload::Remove(keys) => engine.delete(&model, keys)?,
        }
        Ok(())
    }

    pub fn policy(&self) -> &SyncPolicy {
        self.synchronizer.policy()
    }

    pub fn disable_syncing_for(&mut self, model: &Model) {
        self.synchronizer.policy_mut().disable(model.name());
    }

    pub fn enable_syncing_for(&mut self, model: &Model) {
        self.synchronizer.policy_mut().enable(model.name());
    }

    /// Runs `f` with syncing disabled for `model`, then restores the previous state.
    pub fn without_syncing_for<R, F>(&mut self, model: &Model, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let was_enabled = self.synchronizer.policy_mut().disable(model.name());
        let result = f(self);
        if was_enabled {
            self.synchronizer.policy_mut().enable(model.name());
        }
        result
    }
}

/// Bulk operations.
impl Scout {
    /// Reindexes every row of the model in chunks.
    pub fn make_all_searchable(
        &self,
        model: &Model,
        observer: &mut dyn BulkObserver,
    ) -> Result<BulkReport, ScoutError> {
        let engine = self.engines.for_model(model)?;
        let policy = self.synchronizer.policy();
        let size = model
            .chunk_size_override()
            .unwrap_or(self.config.chunk.searchable);
        let scope = if policy.keeps_flagged(model) {
            Scope::new(TrashedMode::Include)
        } else {
            Scope::default()
        };

        let report = bulk::run(
            self.store.as_ref(),
            model,
            BulkAction::Index,
            size,
            &scope,
            observer,
            |rows| {
                let records = self.dispatcher.records(policy, model, &rows);
                let sent = records.len();
                self.dispatcher.index(engine.as_ref(), model, records)?;
                Ok(sent)
            },
        )?;
        info!(model = model.name(), chunks = report.chunks, rows = report.rows, "imported");
        Ok(report)
    }

    /// Removes every row of the model from its index in chunks.
    pub fn remove_all_from_search(
        &self,
        model: &Model,
        observer: &mut dyn BulkObserver,
    ) -> Result<BulkReport, ScoutError> {
        let engine = self.engines.for_model(model)?;
        let size = model
            .chunk_size_override()
            .unwrap_or(self.config.chunk.unsearchable);
        let scope = Scope::new(TrashedMode::Include);

        bulk::run(
            self.store.as_ref(),
            model,
            BulkAction::Remove,
            size,
            &scope,
            observer,
            |rows| {
                let keys = Model::keys_of(&rows);
                let sent = keys.len();
                self.dispatcher.remove(engine.as_ref(), model, keys)?;
                Ok(sent)
            },
        )
    }
}

/// Index lifecycle operations.
impl Scout {
    pub fn flush(&self, model: &Model) -> Result<(), ScoutError> {
        self.engines.for_model(model)?.flush(model)?;
        Ok(())
    }

    pub fn create_index(&self, name: &str, options: &IndexOptions) -> Result<(), ScoutError> {
        self.engines.engine()?.create_index(name, options)?;
        Ok(())
    }

    pub fn delete_index(&self, name: &str) -> Result<(), ScoutError> {
        self.engines.engine()?.delete_index(name)?;
        Ok(())
    }

    pub fn delete_all_indexes(&self) -> Result<(), ScoutError> {
        self.engines.engine()?.delete_all_indexes()?;
        Ok(())
    }

    /// Pushes configured index settings. Indexes of models that keep
    /// soft-deleted rows get `__soft_deleted` as a filterable attribute.
    ///
    /// Returns the names of the updated indexes.
    pub fn sync_index_settings(&self) -> Result<Vec<String>, ScoutError> {
        let configured = self
            .config
            .meilisearch
            .as_ref()
            .map(|meilisearch| &meilisearch.index_settings);
        let configured_for = |name: &str| configured.and_then(|settings| settings.get(name));

        let mut synced = Vec::new();
        for model in self.models.values() {
            let index = model.index_name();
            let settings = model
                .settings()
                .or_else(|| configured_for(&index))
                .or_else(|| configured_for(model.name()));
            let flagged = self.synchronizer.policy().keeps_flagged(model);
            if settings.is_none() && !flagged {
                continue;
            }
            let mut settings = settings.cloned().unwrap_or_default();
            if flagged {
                add_filterable(&mut settings, SOFT_DELETED_FIELD);
            }
            self.engines
                .for_model(model)?
                .update_index_settings(&index, &settings)?;
            synced.push(index);
        }

        if let Some(configured) = configured {
            for (index, settings) in configured {
                let covered = synced.contains(index)
                    || self.models.values().any(|model| model.name() == index.as_str());
                if covered {
                    continue;
                }
                self.engines.engine()?.update_index_settings(index, settings)?;
                synced.push(index.clone());
            }
        }

        Ok(synced)
    }
}

fn add_filterable(settings: &mut Document, field: &str) {
    let entry = settings
        .entry("filterableAttributes")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(attributes) = entry
        && !attributes.iter().any(|attribute| attribute == field)
    {
        attributes.push(Value::from(field));
    }
}
