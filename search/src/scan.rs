//! Ranking and windowing shared by the in-process engines.

use scout_core::types::{Document, ScoutKey, compare_values};
use scout_core::{Direction, Hit, Order, RawResults, ScanPlan};
use serde_json::{Value, json};
use std::cmp::Ordering;

/// Field carrying the match score of in-process engines.
pub(crate) const RANKING_SCORE_FIELD: &str = "_rankingScore";

pub(crate) struct Candidate {
    pub(crate) key: ScoutKey,
    pub(crate) document: Document,
    /// Match score, `None` for engines without relevance.
    pub(crate) score: Option<u32>,
}

fn compare_orders(a: &Candidate, b: &Candidate, orders: &[Order]) -> Ordering {
    for order in orders {
        let left = a.document.get(&order.field).unwrap_or(&Value::Null);
        let right = b.document.get(&order.field).unwrap_or(&Value::Null);
        let ord = match order.direction {
            Direction::Asc => compare_values(left, right),
            Direction::Desc => compare_values(right, left),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Requested orders first, otherwise score descending. Remaining ties go to
/// the higher key.
pub(crate) fn rank(candidates: &mut [Candidate], orders: &[Order]) {
    candidates.sort_by(|a, b| {
        let primary = if orders.is_empty() {
            b.score.cmp(&a.score)
        } else {
            compare_orders(a, b, orders)
        };
        primary.then_with(|| b.key.natural_cmp(&a.key))
    });
}

/// Ranks, windows and packs candidates. The body mirrors what the engine
/// reports: `total` counts every match before windowing.
pub(crate) fn finish(mut candidates: Vec<Candidate>, plan: &ScanPlan) -> RawResults {
    let total = candidates.len();
    rank(&mut candidates, &plan.orders);

    let hits: Vec<Hit> = plan
        .window
        .apply(candidates)
        .into_iter()
        .map(|candidate| {
            let mut fields = candidate.document;
            if let Some(score) = candidate.score {
                fields.insert(RANKING_SCORE_FIELD.to_string(), Value::from(score));
            }
            Hit {
                key: candidate.key,
                fields,
            }
        })
        .collect();
    let keys: Vec<Value> = hits.iter().map(|hit| hit.key.to_json()).collect();

    RawResults {
        hits,
        body: json!({ "hits": keys, "total": total }),
    }
}

pub(crate) fn total(raw: &RawResults) -> usize {
    raw.body
        .get("total")
        .and_then(Value::as_u64)
        .map_or(raw.hits.len(), |total| total as usize)
}
