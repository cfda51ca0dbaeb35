//! Write dispatch: index writes run in-line or travel as queued tasks.

use crate::engine::Engine;
use crate::error::ScoutError;
use crate::model::Model;
use crate::sync::SyncPolicy;
use crate::types::{QueueConfig, QueueTarget, Record, Row, ScoutKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[cfg(test)]
mod tests;

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum QueueError {
        #[error("Queueing is enabled but no task queue is attached")]
        NotConfigured,

        #[error("Task encoding error: {0}")]
        Json(#[from] serde_json::Error),
    }
}

use error::QueueError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    Update,
    Remove,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Update => write!(f, "update"),
            TaskAction::Remove => write!(f, "remove"),
        }
    }
}

/// Batch carried by a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "batch", rename_all = "snake_case")]
pub enum TaskPayload {
    Update(Vec<Record>),
    Remove(Vec<ScoutKey>),
}

/// A deferred engine write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncTask {
    pub model: String,
    pub payload: TaskPayload,
    pub connection: Option<String>,
    pub queue: Option<String>,
    pub unique_key: String,
}

impl SyncTask {
    pub fn update(model: &Model, records: Vec<Record>, target: QueueTarget) -> Self {
        let keys: Vec<&ScoutKey> = records.iter().map(|record| &record.key).collect();
        let unique_key = Self::unique_key(TaskAction::Update, model.name(), &keys);
        Self {
            model: model.name().to_string(),
            payload: TaskPayload::Update(records),
            connection: target.connection,
            queue: target.queue,
            unique_key,
        }
    }

    pub fn remove(model: &Model, keys: Vec<ScoutKey>, target: QueueTarget) -> Self {
        let refs: Vec<&ScoutKey> = keys.iter().collect();
        let unique_key = Self::unique_key(TaskAction::Remove, model.name(), &refs);
        Self {
            model: model.name().to_string(),
            payload: TaskPayload::Remove(keys),
            connection: target.connection,
            queue: target.queue,
            unique_key,
        }
    }

    pub fn action(&self) -> TaskAction {
        match self.payload {
            TaskPayload::Update(_) => TaskAction::Update,
            TaskPayload::Remove(_) => TaskAction::Remove,
        }
    }

    /// `scout:<action>:<model>:<digest>` where the digest covers the sorted keys,
    /// so the same batch in any order deduplicates.
    pub fn unique_key(action: TaskAction, model: &str, keys: &[&ScoutKey]) -> String {
        let mut sorted: Vec<&str> = keys.iter().map(|key| key.as_str()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        let digest = blake3::hash(sorted.join("\0").as_bytes());
        format!("scout:{action}:{model}:{}", digest.to_hex())
    }

    pub fn to_json(&self) -> Result<String, QueueError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, QueueError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// An identical task is still pending.
    Duplicate,
}

pub trait TaskQueue: Send + Sync {
    fn push(&self, task: SyncTask) -> Result<Enqueued, QueueError>;
}

/// In-memory FIFO queue that refuses tasks whose unique key is pending.
#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<SyncTask>,
    pending: HashSet<String>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.state().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().tasks.is_empty()
    }

    /// Takes the oldest task and releases its unique key.
    pub fn pop(&self) -> Option<SyncTask> {
        let mut state = self.state();
        let task = state.tasks.pop_front()?;
        state.pending.remove(&task.unique_key);
        Some(task)
    }

    pub fn drain(&self) -> Vec<SyncTask> {
        let mut state = self.state();
        state.pending.clear();
        state.tasks.drain(..).collect()
    }
}

impl TaskQueue for MemoryQueue {
    fn push(&self, task: SyncTask) -> Result<Enqueued, QueueError> {
        let mut state = self.state();
        if !state.pending.insert(task.unique_key.clone()) {
            return Ok(Enqueued::Duplicate);
        }
        state.tasks.push_back(task);
        Ok(Enqueued::Queued)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The engine call ran in-line.
    Executed,
    Queued,
    Duplicate,
    /// Nothing to write.
    Empty,
}

/// Routes index writes to an engine directly or through a task queue.
pub struct WriteDispatcher {
    queue: Option<Arc<dyn TaskQueue>>,
    config: QueueConfig,
}

impl WriteDispatcher {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            queue: None,
            config,
        }
    }

    pub fn set_queue(&mut self, queue: Arc<dyn TaskQueue>) {
        self.queue = Some(queue);
    }

    pub fn is_queued(&self) -> bool {
        self.config.enabled
    }

    fn target(&self, model: &Model) -> QueueTarget {
        let global = self.config.target();
        match model.queue_target() {
            Some(target) => target.or(&global),
            None => global,
        }
    }

    /// Records for rows, flagged when the index keeps soft-deleted rows.
    pub fn records(&self, policy: &SyncPolicy, model: &Model, rows: &[Row]) -> Vec<Record> {
        let flag = policy.keeps_flagged(model);
        rows.iter().map(|row| model.to_record(row, flag)).collect()
    }

    pub fn index(
        &self,
        engine: &dyn Engine,
        model: &Model,
        records: Vec<Record>,
    ) -> Result<DispatchOutcome, ScoutError> {
        if records.is_empty() {
            return Ok(DispatchOutcome::Empty);
        }
        if self.config.enabled {
            return self.enqueue(SyncTask::update(model, records, self.target(model)));
        }
        debug!(
            model = model.name(),
            engine = engine.name(),
            records = records.len(),
            "updating index"
        );
        engine.update(model, &records)?;
        Ok(DispatchOutcome::Executed)
    }

    pub fn remove(
        &self,
        engine: &dyn Engine,
        model: &Model,
        keys: Vec<ScoutKey>,
    ) -> Result<DispatchOutcome, ScoutError> {
        if keys.is_empty() {
            return Ok(DispatchOutcome::Empty);
        }
        if self.config.enabled {
            return self.enqueue(SyncTask::remove(model, keys, self.target(model)));
        }
        debug!(
            model = model.name(),
            engine = engine.name(),
            keys = keys.len(),
            "removing from index"
        );
        engine.delete(model, &keys)?;
        Ok(DispatchOutcome::Executed)
    }

    fn enqueue(&self, task: SyncTask) -> Result<DispatchOutcome, ScoutError> {
        let queue = self.queue.as_ref().ok_or(QueueError::NotConfigured)?;
        let action = task.action();
        let model = task.model.clone();
        let unique_key = task.unique_key.clone();
        match queue.push(task)? {
            Enqueued::Queued => {
                debug!(%action, model = %model, unique_key = %unique_key, "task queued");
                Ok(DispatchOutcome::Queued)
            }
            Enqueued::Duplicate => {
                debug!(%action, model = %model, unique_key = %unique_key, "duplicate task dropped");
                Ok(DispatchOutcome::Duplicate)
            }
        }
    }
}
