//! Translation between queries and Meilisearch request and response bodies.

use scout_core::engine::error::EngineError;
use scout_core::types::{Record, ScoutKey};
use scout_core::{CompiledQuery, Hit, Predicate, QueryDescriptor};
use serde_json::{Map, Value, json};
use tracing::debug;

/// How a search request selects its window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Paging {
    Limit(Option<usize>),
    Page { per_page: usize, page: usize },
}

/// Renders one filter operand. Strings are quoted, numbers and booleans are
/// written as is.
pub(crate) fn filter_value(field: &str, value: &Value) -> Result<String, EngineError> {
    match value {
        Value::String(s) => Ok(format!(
            "\"{}\"",
            s.replace('\\', "\\\\").replace('"', "\\\"")
        )),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(EngineError::InvalidFilterValue {
            field: field.to_string(),
            reason: "null is not comparable".to_string(),
        }),
        Value::Array(_) | Value::Object(_) => Err(EngineError::InvalidFilterValue {
            field: field.to_string(),
            reason: "expected a scalar".to_string(),
        }),
    }
}

fn filter_list(field: &str, values: &[Value]) -> Result<String, EngineError> {
    let rendered = values
        .iter()
        .map(|value| filter_value(field, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("[{}]", rendered.join(", ")))
}

/// Joins every clause with `AND`. `None` when there is nothing to filter.
pub(crate) fn compile_filters(filters: &[Predicate]) -> Result<Option<String>, EngineError> {
    let clauses = filters
        .iter()
        .map(|predicate| match predicate {
            Predicate::Eq { field, value } => Ok(format!("{field}={}", filter_value(field, value)?)),
            Predicate::In { field, values } => {
                Ok(format!("{field} IN {}", filter_list(field, values)?))
            }
            Predicate::NotIn { field, values } => {
                Ok(format!("{field} NOT IN {}", filter_list(field, values)?))
            }
        })
        .collect::<Result<Vec<String>, EngineError>>()?;

    if clauses.is_empty() {
        return Ok(None);
    }
    Ok(Some(clauses.join(" AND ")))
}

/// Builds the body of `POST /indexes/{index}/search`. Engine options are
/// merged last, then the query callback sees the finished request.
pub(crate) fn search_body(query: &QueryDescriptor, paging: Paging) -> Result<Value, EngineError> {
    let mut body = Map::new();
    body.insert("q".to_string(), Value::from(query.term.as_str()));

    if let Some(filter) = compile_filters(&query.effective_filters())? {
        body.insert("filter".to_string(), Value::from(filter));
    }

    if !query.orders.is_empty() {
        let sort: Vec<Value> = query
            .orders
            .iter()
            .map(|order| Value::from(format!("{}:{}", order.field, order.direction.as_str())))
            .collect();
        body.insert("sort".to_string(), Value::Array(sort));
    }

    match paging {
        Paging::Limit(Some(limit)) => {
            body.insert("limit".to_string(), Value::from(limit));
        }
        Paging::Limit(None) => {}
        Paging::Page { per_page, page } => {
            body.insert("hitsPerPage".to_string(), Value::from(per_page));
            body.insert("page".to_string(), Value::from(page));
        }
    }

    for (name, value) in &query.options {
        body.insert(name.clone(), value.clone());
    }

    let mut body = Value::Object(body);
    query.apply_callback(CompiledQuery::Request(&mut body));
    Ok(body)
}

/// Reads hits out of a search response. Hits without a usable primary key
/// are dropped.
pub(crate) fn parse_hits(body: &Value, primary_key: &str) -> Vec<Hit> {
    let Some(hits) = body.get("hits").and_then(Value::as_array) else {
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| {
            let fields = hit.as_object()?;
            let Some(key) = fields.get(primary_key).and_then(ScoutKey::from_json) else {
                debug!(primary_key, "hit without a primary key dropped");
                return None;
            };
            Some(Hit {
                key,
                fields: fields.clone(),
            })
        })
        .collect()
}

/// `totalHits` for paged responses, `estimatedTotalHits` otherwise.
pub(crate) fn total_hits(body: &Value) -> usize {
    body.get("totalHits")
        .or_else(|| body.get("estimatedTotalHits"))
        .and_then(Value::as_u64)
        .map(|total| total as usize)
        .or_else(|| body.get("hits").and_then(Value::as_array).map(Vec::len))
        .unwrap_or(0)
}

/// Documents to upsert, skipping records with an empty payload.
pub(crate) fn documents(records: &[Record]) -> Vec<Value> {
    records
        .iter()
        .filter(|record| !record.is_empty())
        .map(|record| Value::Object(record.to_document()))
        .collect()
}

pub(crate) fn create_index_body(name: &str, primary_key: Option<&str>) -> Value {
    match primary_key {
        Some(primary_key) => json!({ "uid": name, "primaryKey": primary_key }),
        None => json!({ "uid": name }),
    }
}

/// Index uids listed by `GET /indexes`.
pub(crate) fn index_uids(body: &Value) -> Vec<String> {
    body.get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|index| index.get("uid").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Error body of a failed request: `{message, code}`.
pub(crate) fn api_error(status: u16, body: &str) -> EngineError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    EngineError::Api {
        status,
        code: field("code"),
        message: field("message").unwrap_or_else(|| body.to_string()),
    }
}
