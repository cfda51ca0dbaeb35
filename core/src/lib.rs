//! Keeps an authoritative store in sync with search indexes and searches
//! them through one backend-agnostic interface.

pub mod bulk;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod model;
pub mod query;
pub mod scout;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use bulk::{BulkAction, BulkObserver, BulkReport, ChunkProgress, Silent};
pub use dispatch::{
    DispatchOutcome, Enqueued, MemoryQueue, SyncTask, TaskAction, TaskPayload, TaskQueue,
};
pub use engine::error::EngineError;
pub use engine::{Engine, EngineManager, Hit, IndexOptions, RawResults};
pub use error::ScoutError;
pub use mapper::LazyMap;
pub use model::{ColumnMatch, Model, SearchColumns};
pub use query::{
    Builder, CompiledQuery, Direction, Order, Page, Predicate, QueryDescriptor, ScanPlan, Window,
};
pub use scout::Scout;
pub use store::db::RedbStore;
pub use store::error::StoreError;
pub use store::{RowCursor, Scope, Store, TrashedMode};
pub use sync::{LifecycleEvent, SyncDecision, SyncPolicy, Synchronizer, Transition};
pub use types::{Document, Record, Row, ScoutConfig, ScoutKey};
