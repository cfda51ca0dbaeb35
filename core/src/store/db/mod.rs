//! Reference store backed by redb.
//!
//! Each model gets its own table keyed by the row key. Values carry a
//! version byte followed by the JSON encoded row.

use crate::model::Model;
use crate::store::error::StoreError;
use crate::store::{Scope, Store};
use crate::sync::LifecycleEvent;
use crate::types::{Document, Row, ScoutKey};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::ops::Bound;
use std::path::Path;
use std::time::SystemTime;


/// Current on-disk row format.
const ROW_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct StoredRow {
    attributes: Document,
    #[serde(default)]
    trashed_at: Option<SystemTime>,
}

fn table_for(model: &Model) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(model.name())
}

fn encode(row: &Row) -> Result<Vec<u8>, StoreError> {
    let stored = StoredRow {
        attributes: row.attributes.clone(),
        trashed_at: row.trashed_at,
    };
    let mut bytes = vec![ROW_VERSION];
    serde_json::to_writer(&mut bytes, &stored)?;
    Ok(bytes)
}

fn decode(key: &str, bytes: &[u8]) -> Result<Row, StoreError> {
    let Some((&version, data)) = bytes.split_first() else {
        return Err(StoreError::Corrupt(format!("empty value for key {key}")));
    };
    if version != ROW_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported row version {version} for key {key}"
        )));
    }
    let stored: StoredRow = serde_json::from_slice(data)?;
    let key = ScoutKey::try_new(key.to_string())
        .map_err(|e| StoreError::InvalidKey(e.to_string()))?;
    Ok(Row {
        key,
        attributes: stored.attributes,
        trashed_at: stored.trashed_at,
        metadata: Document::new(),
    })
}

/// The reference store wrapping redb.
pub struct RedbStore {
    db: redb::Database,
}

impl RedbStore {
    /// Creates or opens the store file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;
        Ok(Self { db })
    }
}

/// Read operations.
impl RedbStore {
    /// Returns the row regardless of its trash state.
    pub fn get(&self, model: &Model, key: &ScoutKey) -> Result<Option<Row>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(table_for(model)) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match table.get(key.as_str())? {
            Some(guard) => Ok(Some(decode(key.as_str(), guard.value())?)),
            None => Ok(None),
        }
    }

    /// Number of rows of a model, trashed rows included.
    pub fn count(&self, model: &Model) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read()?;
        match read_txn.open_table(table_for(model)) {
            Ok(table) => Ok(table.iter()?.count() as u64),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write operations.
///
/// Every mutation returns the lifecycle event describing it, ready to be
/// handed to the synchronizer.
impl RedbStore {
    /// Inserts or updates a row. A trashed row stays trashed.
    pub fn save(
        &self,
        model: &Model,
        key: &ScoutKey,
        attributes: Document,
    ) -> Result<LifecycleEvent, StoreError> {
        let mut events = self.save_many(model, [(key.clone(), attributes)])?;
        events.pop().ok_or(StoreError::NotFound)
    }

    /// Saves several rows in one transaction.
    pub fn save_many<I>(&self, model: &Model, rows: I) -> Result<Vec<LifecycleEvent>, StoreError>
    where
        I: IntoIterator<Item = (ScoutKey, Document)>,
    {
        let mut events = Vec::new();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table_for(model))?;
            for (key, attributes) in rows {
                let previous = table
                    .get(key.as_str())?
                    .map(|guard| decode(key.as_str(), guard.value()))
                    .transpose()?;
                let row = Row {
                    key: key.clone(),
                    attributes,
                    trashed_at: previous.as_ref().and_then(|p| p.trashed_at),
                    metadata: Document::new(),
                };
                let bytes = encode(&row)?;
                table.insert(key.as_str(), bytes.as_slice())?;
                events.push(LifecycleEvent::saved(row, previous));
            }
        }
        write_txn.commit()?;
        Ok(events)
    }

    /// Deletes a row: trashes it when the model soft deletes, otherwise
    /// removes it.
    ///
    /// Returns `Err(NotFound)` if the key doesn't exist, `Err(Trashed)` if a
    /// soft-deleted row is already in the trash.
    pub fn delete(
        &self,
        model: &Model,
        key: &ScoutKey,
        now: SystemTime,
    ) -> Result<LifecycleEvent, StoreError> {
        if !model.uses_soft_deletes() {
            let row = self.remove(model, key)?;
            return Ok(LifecycleEvent::deleted(row.clone(), Some(row)));
        }

        let write_txn = self.db.begin_write()?;
        let event = {
            let mut table = write_txn.open_table(table_for(model))?;
            let previous = table
                .get(key.as_str())?
                .map(|guard| decode(key.as_str(), guard.value()))
                .transpose()?
                .ok_or(StoreError::NotFound)?;
            if previous.is_trashed() {
                return Err(StoreError::Trashed);
            }
            let row = previous.clone().trashed(now);
            let bytes = encode(&row)?;
            table.insert(key.as_str(), bytes.as_slice())?;
            LifecycleEvent::deleted(row, Some(previous))
        };
        write_txn.commit()?;
        Ok(event)
    }

    /// Permanently removes a row, trashed or not.
    pub fn force_delete(&self, model: &Model, key: &ScoutKey) -> Result<LifecycleEvent, StoreError> {
        let row = self.remove(model, key)?;
        Ok(LifecycleEvent::force_deleted(row))
    }

    /// Moves a trashed row back to active.
    ///
    /// Returns `Err(NotTrashed)` if the row is not in the trash.
    pub fn restore(&self, model: &Model, key: &ScoutKey) -> Result<LifecycleEvent, StoreError> {
        let write_txn = self.db.begin_write()?;
        let event = {
            let mut table = write_txn.open_table(table_for(model))?;
            let previous = table
                .get(key.as_str())?
                .map(|guard| decode(key.as_str(), guard.value()))
                .transpose()?
                .ok_or(StoreError::NotFound)?;
            if !previous.is_trashed() {
                return Err(StoreError::NotTrashed);
            }
            let mut row = previous.clone();
            row.trashed_at = None;
            let bytes = encode(&row)?;
            table.insert(key.as_str(), bytes.as_slice())?;
            LifecycleEvent::restored(row, Some(previous))
        };
        write_txn.commit()?;
        Ok(event)
    }

    fn remove(&self, model: &Model, key: &ScoutKey) -> Result<Row, StoreError> {
        let write_txn = self.db.begin_write()?;
        let row = {
            let mut table = write_txn.open_table(table_for(model))?;
            table
                .remove(key.as_str())?
                .map(|guard| decode(key.as_str(), guard.value()))
                .transpose()?
                .ok_or(StoreError::NotFound)?
        };
        write_txn.commit()?;
        Ok(row)
    }
}

impl Store for RedbStore {
    fn fetch_by_keys(
        &self,
        model: &Model,
        keys: &[ScoutKey],
        scope: &Scope,
    ) -> Result<Vec<Row>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(table_for(model)) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sorted: Vec<&ScoutKey> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut rows = Vec::with_capacity(sorted.len());
        for key in sorted {
            let Some(guard) = table.get(key.as_str())? else {
                continue;
            };
            let row = decode(key.as_str(), guard.value())?;
            if scope.admits(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn chunk_after(
        &self,
        model: &Model,
        after: Option<&ScoutKey>,
        size: usize,
        scope: &Scope,
    ) -> Result<Vec<Row>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(table_for(model)) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let range = match after {
            Some(key) => table.range::<&str>((Bound::Excluded(key.as_str()), Bound::Unbounded))?,
            None => table.range::<&str>(..)?,
        };

        let mut rows = Vec::with_capacity(size);
        for entry in range {
            let (key, value) = entry?;
            let row = decode(key.value(), value.value())?;
            if !scope.admits(&row) {
                continue;
            }
            rows.push(row);
            if rows.len() >= size {
                break;
            }
        }
        Ok(rows)
    }
}
