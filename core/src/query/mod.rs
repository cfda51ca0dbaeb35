//! Backend-agnostic query representation.

use crate::model::Model;
use crate::store::{Refinement, Scope, TrashedMode};
use crate::types::{Document, SOFT_DELETED_FIELD, loosely_equal};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub mod builder;
pub use builder::Builder;

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// A single filter clause. Clauses of a query are combined with AND.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    NotIn { field: String, values: Vec<Value> },
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. }
            | Predicate::In { field, .. }
            | Predicate::NotIn { field, .. } => field,
        }
    }

    /// Evaluates the clause against a document value. Array fields match when
    /// any element does.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let contains = |wanted: &Value| match value {
            Some(Value::Array(items)) => items.iter().any(|item| loosely_equal(item, wanted)),
            Some(value) => loosely_equal(value, wanted),
            None => false,
        };
        match self {
            Predicate::Eq { value, .. } => contains(value),
            Predicate::In { values, .. } => values.iter().any(contains),
            Predicate::NotIn { values, .. } => !values.iter().any(contains),
        }
    }
}

/// Slice of the ordered result set an engine returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Window {
    pub fn first(limit: Option<usize>) -> Self {
        Self { offset: 0, limit }
    }

    /// 1-based page of `per_page` items. Pages past `usize::MAX` items are empty.
    pub fn page(per_page: usize, page: usize) -> Self {
        Self {
            offset: per_page.saturating_mul(page.saturating_sub(1)),
            limit: Some(per_page),
        }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let items = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => items.take(limit).collect(),
            None => items.collect(),
        }
    }
}

/// Compiled form of a query for engines that evaluate it in process.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanPlan {
    pub term: String,
    pub filters: Vec<Predicate>,
    pub orders: Vec<Order>,
    pub window: Window,
}

impl ScanPlan {
    pub fn admits(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|filter| filter.matches(document.get(filter.field())))
    }
}

/// Compiled query handed to the escape-hatch callback before execution.
pub enum CompiledQuery<'a> {
    /// JSON request body of an HTTP backend.
    Request(&'a mut Value),
    Scan(&'a mut ScanPlan),
}

pub type SearchCallback = Arc<dyn Fn(CompiledQuery<'_>) + Send + Sync>;

/// Everything a search asked for. Building one never fails; values are
/// checked by the engine that executes it.
#[derive(Clone)]
pub struct QueryDescriptor {
    pub model: Arc<Model>,
    pub term: String,
    pub index: Option<String>,
    pub filters: Vec<Predicate>,
    pub orders: Vec<Order>,
    pub limit: Option<usize>,
    pub callback: Option<SearchCallback>,
    pub refine: Option<Refinement>,
    pub trashed: TrashedMode,
    /// Extra backend parameters merged into the request.
    pub options: Document,
    /// The index carries `__soft_deleted` flags for this model.
    pub soft_delete_flagged: bool,
}

impl QueryDescriptor {
    pub fn new(model: Arc<Model>, term: impl Into<String>) -> Self {
        Self {
            model,
            term: term.into(),
            index: None,
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            callback: None,
            refine: None,
            trashed: TrashedMode::default(),
            options: Document::new(),
            soft_delete_flagged: false,
        }
    }

    pub fn index_name(&self) -> String {
        match &self.index {
            Some(index) => index.clone(),
            None => self.model.index_name(),
        }
    }

    /// Store visibility used when mapping hits back to rows.
    pub fn scope(&self) -> Scope {
        Scope {
            trashed: self.trashed,
            refine: self.refine.clone(),
        }
    }

    /// Filters including the soft delete flag clause, when the index carries one.
    pub fn effective_filters(&self) -> Vec<Predicate> {
        let mut filters = self.filters.clone();
        if self.soft_delete_flagged {
            let flag = match self.trashed {
                TrashedMode::Exclude => Some(0),
                TrashedMode::Only => Some(1),
                TrashedMode::Include => None,
            };
            if let Some(flag) = flag {
                filters.push(Predicate::Eq {
                    field: SOFT_DELETED_FIELD.to_string(),
                    value: Value::from(flag),
                });
            }
        }
        filters
    }

    /// Compiles the query for in-process execution. `with_flag` adds the soft
    /// delete clause for engines that evaluate against indexed documents.
    pub fn scan_plan(&self, window: Window, with_flag: bool) -> ScanPlan {
        let mut plan = ScanPlan {
            term: self.term.clone(),
            filters: if with_flag {
                self.effective_filters()
            } else {
                self.filters.clone()
            },
            orders: self.orders.clone(),
            window,
        };
        self.apply_callback(CompiledQuery::Scan(&mut plan));
        plan
    }

    pub fn apply_callback(&self, compiled: CompiledQuery<'_>) {
        if let Some(callback) = &self.callback {
            callback(compiled);
        }
    }
}

impl fmt::Debug for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDescriptor")
            .field("model", &self.model.name())
            .field("term", &self.term)
            .field("index", &self.index)
            .field("filters", &self.filters)
            .field("orders", &self.orders)
            .field("limit", &self.limit)
            .field("callback", &self.callback.is_some())
            .field("refine", &self.refine.is_some())
            .field("trashed", &self.trashed)
            .field("options", &self.options)
            .field("soft_delete_flagged", &self.soft_delete_flagged)
            .finish()
    }
}

/// One page of mapped results. `total` is the engine's count.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub per_page: usize,
    pub current_page: usize,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> usize {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }
}
