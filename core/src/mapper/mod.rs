//! Reconciles backend hit lists with live store rows.
//!
//! Hits may reference rows that no longer exist or that the query scope
//! hides; those are dropped. Surviving rows come back in hit order with
//! backend metadata attached, and the backend total is left untouched.

use crate::engine::{Hit, RawResults};
use crate::query::QueryDescriptor;
use crate::store::error::StoreError;
use crate::store::{self, KeyBatches, STREAM_BATCH_SIZE, Store};
use crate::types::{Row, ScoutKey};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;


/// Hit keys without duplicates, in hit order.
struct Positions {
    /// Rank of every key among `keys`.
    ranks: HashMap<ScoutKey, usize>,
    keys: Vec<ScoutKey>,
    /// Index into the hit list for every rank.
    hit_at: Vec<usize>,
}

impl Positions {
    fn new(hits: &[Hit]) -> Self {
        let mut ranks = HashMap::with_capacity(hits.len());
        let mut keys = Vec::with_capacity(hits.len());
        let mut hit_at = Vec::with_capacity(hits.len());
        for (index, hit) in hits.iter().enumerate() {
            if !ranks.contains_key(&hit.key) {
                ranks.insert(hit.key.clone(), keys.len());
                keys.push(hit.key.clone());
                hit_at.push(index);
            }
        }
        Self {
            ranks,
            keys,
            hit_at,
        }
    }
}

fn attach_metadata(row: &mut Row, hit: &Hit, prefix: Option<&str>) {
    let Some(prefix) = prefix else {
        return;
    };
    for (name, value) in &hit.fields {
        if name.starts_with(prefix) {
            row.metadata.insert(name.clone(), value.clone());
        }
    }
}

/// Maps hits to rows with one bulk fetch.
pub fn map(
    store: &dyn Store,
    query: &QueryDescriptor,
    raw: &RawResults,
    metadata_prefix: Option<&str>,
) -> Result<Vec<Row>, StoreError> {
    if raw.hits.is_empty() {
        return Ok(Vec::new());
    }

    let positions = Positions::new(&raw.hits);
    let fetched = store.fetch_by_keys(&query.model, &positions.keys, &query.scope())?;

    let mut seen = HashSet::with_capacity(fetched.len());
    let mut placed: Vec<(usize, Row)> = Vec::with_capacity(fetched.len());
    for row in fetched {
        let Some(&rank) = positions.ranks.get(&row.key) else {
            continue;
        };
        if seen.insert(rank) {
            placed.push((rank, row));
        }
    }
    placed.sort_by_key(|(rank, _)| *rank);

    if placed.len() < positions.keys.len() {
        debug!(
            model = query.model.name(),
            hits = positions.keys.len(),
            mapped = placed.len(),
            "dropped hits without a visible row"
        );
    }

    Ok(placed
        .into_iter()
        .map(|(rank, mut row)| {
            let hit = &raw.hits[positions.hit_at[rank]];
            attach_metadata(&mut row, hit, metadata_prefix);
            row
        })
        .collect())
}

/// Maps hits to rows over a streaming cursor.
pub fn lazy_map<'a>(
    store: &'a dyn Store,
    query: &QueryDescriptor,
    raw: RawResults,
    metadata_prefix: Option<&str>,
) -> LazyMap<'a> {
    let Positions {
        ranks,
        keys,
        hit_at,
    } = Positions::new(&raw.hits);
    let len = keys.len();
    LazyMap {
        batches: store::stream_by_keys(store, &query.model, keys, query.scope()),
        hits: raw.hits,
        ranks,
        hit_at,
        len,
        fetched: 0,
        pending: BTreeMap::new(),
        next: 0,
        prefix: metadata_prefix.map(str::to_owned),
    }
}

/// Iterator yielding mapped rows in hit order.
///
/// Keys are fetched in batches of [`STREAM_BATCH_SIZE`] ranks. Only the
/// current batch is buffered: a rank whose batch came back without its row
/// is skipped.
pub struct LazyMap<'a> {
    batches: KeyBatches<'a>,
    hits: Vec<Hit>,
    ranks: HashMap<ScoutKey, usize>,
    hit_at: Vec<usize>,
    /// Number of distinct hit keys.
    len: usize,
    /// Ranks below this have been fetched.
    fetched: usize,
    pending: BTreeMap<usize, Row>,
    next: usize,
    prefix: Option<String>,
}

impl LazyMap<'_> {
    fn emit(&mut self, rank: usize, mut row: Row) -> Row {
        self.next = rank + 1;
        let hit = &self.hits[self.hit_at[rank]];
        attach_metadata(&mut row, hit, self.prefix.as_deref());
        row
    }
}

impl Iterator for LazyMap<'_> {
    type Item = Result<Row, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.len {
            if let Some(row) = self.pending.remove(&self.next) {
                return Some(Ok(self.emit(self.next, row)));
            }
            if self.next < self.fetched {
                self.next += 1;
                continue;
            }
            match self.batches.next()? {
                Err(e) => {
                    self.next = self.len;
                    self.pending.clear();
                    return Some(Err(e));
                }
                Ok(rows) => {
                    let end = (self.fetched + STREAM_BATCH_SIZE).min(self.len);
                    for row in rows {
                        if let Some(&rank) = self.ranks.get(&row.key)
                            && (self.fetched..end).contains(&rank)
                        {
                            self.pending.entry(rank).or_insert(row);
                        }
                    }
                    self.fetched = end;
                }
            }
        }
        None
    }
}
