//! Chunked reindexing and purging of a model's whole row set.

use crate::error::ScoutError;
use crate::model::Model;
use crate::store::{self, Scope, Store};
use crate::types::{Row, ScoutKey};
use tracing::info;

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkAction {
    Index,
    Remove,
}

/// Delivered after every processed chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkProgress {
    pub model: String,
    pub action: BulkAction,
    /// Last key of the chunk in store order.
    pub last_key: ScoutKey,
    /// Rows read in this chunk.
    pub rows: usize,
    /// Rows dispatched to the engine in this chunk.
    pub dispatched: usize,
    /// 1-based chunk number.
    pub chunk: usize,
}

/// Hooks into a bulk run.
pub trait BulkObserver {
    /// Adjusts a chunk before it is filtered and dispatched.
    fn prepare(&mut self, rows: &mut Vec<Row>) {
        let _ = rows;
    }

    fn chunk_processed(&mut self, progress: &ChunkProgress) {
        let _ = progress;
    }
}

/// Observer that ignores every hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl BulkObserver for Silent {}

impl<F> BulkObserver for F
where
    F: FnMut(&ChunkProgress),
{
    fn chunk_processed(&mut self, progress: &ChunkProgress) {
        self(progress)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub chunks: usize,
    pub rows: usize,
    pub dispatched: usize,
}

impl BulkReport {
    pub(crate) fn record(&mut self, progress: &ChunkProgress) {
        self.chunks += 1;
        self.rows += progress.rows;
        self.dispatched += progress.dispatched;
    }
}

/// Walks the model in keyset-paginated chunks of `size` rows, handing each
/// prepared chunk to `dispatch`. `dispatch` returns how many rows it sent.
///
/// Only one chunk is held at a time.
pub(crate) fn run<F>(
    store: &dyn Store,
    model: &Model,
    action: BulkAction,
    size: usize,
    scope: &Scope,
    observer: &mut dyn BulkObserver,
    mut dispatch: F,
) -> Result<BulkReport, ScoutError>
where
    F: FnMut(Vec<Row>) -> Result<usize, ScoutError>,
{
    let mut report = BulkReport::default();

    store::chunk(store, model, size, scope, |mut rows: Vec<Row>| {
        let Some(last_key) = rows.last().map(|row| row.key.clone()) else {
            return Ok(());
        };
        let read = rows.len();

        observer.prepare(&mut rows);
        if action == BulkAction::Index {
            rows.retain(|row| model.should_be_searchable(row));
        }
        let dispatched = if rows.is_empty() { 0 } else { dispatch(rows)? };

        let progress = ChunkProgress {
            model: model.name().to_string(),
            action,
            last_key,
            rows: read,
            dispatched,
            chunk: report.chunks + 1,
        };
        report.record(&progress);
        info!(
            model = model.name(),
            action = ?action,
            chunk = progress.chunk,
            last_key = %progress.last_key,
            rows = read,
            dispatched,
            "chunk processed"
        );
        observer.chunk_processed(&progress);
        Ok::<(), ScoutError>(())
    })?;

    Ok(report)
}
