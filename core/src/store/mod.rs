//! Store contract consumed by the search layer.
//!
//! A store resolves keys to rows and walks a model's rows in key order.
//! Everything else (streaming, chunked walks) is built on those two
//! primitives by the free functions in this module.

use crate::model::Model;
use crate::store::error::StoreError;
use crate::types::{Row, ScoutKey};
use std::fmt;
use std::sync::Arc;

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum StoreError {
        #[error("Database error: {0}")]
        Redb(#[from] redb::DatabaseError),

        #[error("Table error: {0}")]
        TableError(#[from] redb::TableError),

        #[error("Storage error: {0}")]
        StorageError(#[from] redb::StorageError),

        #[error("Transaction error: {0}")]
        TransactionError(#[from] redb::TransactionError),

        #[error("Commit error: {0}")]
        CommitError(#[from] redb::CommitError),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Row encoding error: {0}")]
        Json(#[from] serde_json::Error),

        #[error("Row not found")]
        NotFound,

        #[error("Row is trashed")]
        Trashed,

        #[error("Row is not trashed")]
        NotTrashed,

        #[error("Corrupt row: {0}")]
        Corrupt(String),

        #[error("Invalid key: {0}")]
        InvalidKey(String),
    }
}

pub mod db;

/// Batch size used when streaming rows for a key list.
pub const STREAM_BATCH_SIZE: usize = 100;

/// Which rows a fetch sees with respect to the trash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrashedMode {
    #[default]
    Exclude,
    Only,
    Include,
}

impl TrashedMode {
    pub fn admits(&self, row: &Row) -> bool {
        match self {
            TrashedMode::Exclude => !row.is_trashed(),
            TrashedMode::Only => row.is_trashed(),
            TrashedMode::Include => true,
        }
    }
}

/// Extra predicate applied by the store while resolving hits.
pub type Refinement = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// Visibility rules of a fetch.
#[derive(Clone, Default)]
pub struct Scope {
    pub trashed: TrashedMode,
    pub refine: Option<Refinement>,
}

impl Scope {
    pub fn new(trashed: TrashedMode) -> Self {
        Self {
            trashed,
            refine: None,
        }
    }

    pub fn admits(&self, row: &Row) -> bool {
        self.trashed.admits(row) && self.refine.as_ref().is_none_or(|refine| refine(row))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("trashed", &self.trashed)
            .field("refine", &self.refine.is_some())
            .finish()
    }
}

/// Lazily produced rows. Errors end the stream.
pub type RowCursor<'a> = Box<dyn Iterator<Item = Result<Row, StoreError>> + 'a>;

pub trait Store: Send + Sync {
    /// Rows of the given keys admitted by `scope`. Missing keys are skipped and
    /// the order of the result is unspecified.
    fn fetch_by_keys(
        &self,
        model: &Model,
        keys: &[ScoutKey],
        scope: &Scope,
    ) -> Result<Vec<Row>, StoreError>;

    /// Up to `size` rows admitted by `scope`, strictly after `after` in the
    /// store's key order.
    fn chunk_after(
        &self,
        model: &Model,
        after: Option<&ScoutKey>,
        size: usize,
        scope: &Scope,
    ) -> Result<Vec<Row>, StoreError>;
}

/// Fetches the rows of `keys` one batch of [`STREAM_BATCH_SIZE`] keys at a
/// time. Each item holds the rows found for the next batch, in any order.
pub fn stream_by_keys<'a>(
    store: &'a dyn Store,
    model: &Model,
    keys: Vec<ScoutKey>,
    scope: Scope,
) -> KeyBatches<'a> {
    KeyBatches {
        store,
        model: model.clone(),
        scope,
        keys: keys.into_iter(),
    }
}

/// Walks every row of a model admitted by `scope`, one page at a time.
pub fn scan<'a>(store: &'a dyn Store, model: &Model, scope: Scope) -> RowCursor<'a> {
    Box::new(Pages {
        store,
        model: model.clone(),
        scope,
        after: None,
        buffer: Vec::new().into_iter(),
        done: false,
    })
}

/// Calls `f` with consecutive chunks of at most `size` rows. Returns the
/// number of chunks visited.
pub fn chunk<E, F>(
    store: &dyn Store,
    model: &Model,
    size: usize,
    scope: &Scope,
    mut f: F,
) -> Result<usize, E>
where
    E: From<StoreError>,
    F: FnMut(Vec<Row>) -> Result<(), E>,
{
    let size = size.max(1);
    let mut after: Option<ScoutKey> = None;
    let mut chunks = 0;

    loop {
        let rows = store.chunk_after(model, after.as_ref(), size, scope)?;
        let Some(last) = rows.last() else {
            break;
        };
        after = Some(last.key.clone());
        let full = rows.len() == size;
        chunks += 1;
        f(rows)?;
        if !full {
            break;
        }
    }

    Ok(chunks)
}

/// Cursor over key batches. An error ends it.
pub struct KeyBatches<'a> {
    store: &'a dyn Store,
    model: Model,
    scope: Scope,
    keys: std::vec::IntoIter<ScoutKey>,
}

impl Iterator for KeyBatches<'_> {
    type Item = Result<Vec<Row>, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<ScoutKey> = self.keys.by_ref().take(STREAM_BATCH_SIZE).collect();
        if batch.is_empty() {
            return None;
        }
        let fetched = self.store.fetch_by_keys(&self.model, &batch, &self.scope);
        if fetched.is_err() {
            self.keys = Vec::new().into_iter();
        }
        Some(fetched)
    }
}

const SCAN_PAGE_SIZE: usize = 500;

struct Pages<'a> {
    store: &'a dyn Store,
    model: Model,
    scope: Scope,
    after: Option<ScoutKey>,
    buffer: std::vec::IntoIter<Row>,
    done: bool,
}

impl Iterator for Pages<'_> {
    type Item = Result<Row, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.next() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            match self
                .store
                .chunk_after(&self.model, self.after.as_ref(), SCAN_PAGE_SIZE, &self.scope)
            {
                Ok(rows) => {
                    self.done = rows.len() < SCAN_PAGE_SIZE;
                    if let Some(last) = rows.last() {
                        self.after = Some(last.key.clone());
                    }
                    self.buffer = rows.into_iter();
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
