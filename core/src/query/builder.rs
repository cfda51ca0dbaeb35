use crate::engine::RawResults;
use crate::error::ScoutError;
use crate::mapper::LazyMap;
use crate::query::{CompiledQuery, Direction, Order, Page, Predicate, QueryDescriptor};
use crate::scout::Scout;
use crate::store::TrashedMode;
use crate::types::{Row, ScoutKey};
use serde_json::Value;
use std::sync::Arc;

/// Fluent search over one model, bound to the facade that executes it.
pub struct Builder<'a> {
    scout: &'a Scout,
    query: QueryDescriptor,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(scout: &'a Scout, query: QueryDescriptor) -> Self {
        Self { scout, query }
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.query
    }

    pub fn into_descriptor(self) -> QueryDescriptor {
        self.query
    }
}

/// Constraints.
impl Builder<'_> {
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.filters.push(Predicate::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn filter_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.query.filters.push(Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn filter_not_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.query.filters.push(Predicate::NotIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.query.orders.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn take(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Searches a custom index instead of the model's own.
    pub fn within(mut self, index: impl Into<String>) -> Self {
        self.query.index = Some(index.into());
        self
    }

    pub fn with_trashed(mut self) -> Self {
        self.query.trashed = TrashedMode::Include;
        self
    }

    pub fn only_trashed(mut self) -> Self {
        self.query.trashed = TrashedMode::Only;
        self
    }

    /// Row predicate the store applies while resolving hits.
    pub fn refine<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.query.refine = Some(Arc::new(predicate));
        self
    }

    /// Receives the compiled backend query right before it runs.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(CompiledQuery<'_>) + Send + Sync + 'static,
    {
        self.query.callback = Some(Arc::new(callback));
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.options.insert(name.into(), value.into());
        self
    }
}

/// Execution.
impl<'a> Builder<'a> {
    /// Unmapped backend results.
    pub fn raw(self) -> Result<RawResults, ScoutError> {
        let engine = self.scout.engine_for(&self.query.model)?;
        Ok(engine.search(&self.query)?)
    }

    pub fn keys(self) -> Result<Vec<ScoutKey>, ScoutError> {
        let engine = self.scout.engine_for(&self.query.model)?;
        let raw = engine.search(&self.query)?;
        Ok(engine.keys(&raw))
    }

    pub fn get(self) -> Result<Vec<Row>, ScoutError> {
        let engine = self.scout.engine_for(&self.query.model)?;
        let raw = engine.search(&self.query)?;
        Ok(engine.map(self.scout.store(), &self.query, &raw)?)
    }

    pub fn first(self) -> Result<Option<Row>, ScoutError> {
        Ok(self.get()?.into_iter().next())
    }

    /// One 1-based page. `total` is the backend count, not the mapped item count.
    pub fn paginate(self, per_page: usize, page: usize) -> Result<Page<Row>, ScoutError> {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let engine = self.scout.engine_for(&self.query.model)?;
        let raw = engine.paginate(&self.query, per_page, page)?;
        let total = engine.total_count(&raw);
        let items = engine.map(self.scout.store(), &self.query, &raw)?;
        Ok(Page {
            items,
            total,
            per_page,
            current_page: page,
        })
    }

    /// Lazily mapped rows in hit order.
    pub fn cursor(self) -> Result<LazyMap<'a>, ScoutError> {
        let engine = self.scout.engine_for(&self.query.model)?;
        let raw = engine.search(&self.query)?;
        Ok(engine.lazy_map(self.scout.store(), &self.query, raw))
    }
}
