use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Attribute map of a row or an engine document. Insertion order is preserved.
pub type Document = Map<String, Value>;

/// Metadata field flagging soft-deleted records in an index.
pub const SOFT_DELETED_FIELD: &str = "__soft_deleted";

/// Prefix marking engine-provided hit fields (ranking scores, highlights).
pub const METADATA_PREFIX: &str = "_";

/// Total order over JSON values used by in-process engines.
///
/// Null sorts first, then booleans, numbers, strings, arrays and objects.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Equality with the coercions a SQL `=` would apply: numbers compare by
/// value and a numeric string equals the number it spells.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        (Value::Bool(flag), Value::Number(n)) | (Value::Number(n), Value::Bool(flag)) => {
            n.as_f64() == Some(if *flag { 1.0 } else { 0.0 })
        }
        _ => a == b,
    }
}

/// Appends the searchable text of a value. Nested values are flattened,
/// nulls contribute nothing.
pub fn push_text(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => push_word(out, s),
        Value::Bool(b) => push_word(out, if *b { "true" } else { "false" }),
        Value::Number(n) => push_word(out, &n.to_string()),
        Value::Array(items) => items.iter().for_each(|item| push_text(item, out)),
        Value::Object(map) => map.values().for_each(|item| push_text(item, out)),
    }
}

pub fn value_text(value: &Value) -> String {
    let mut out = String::new();
    push_text(value, &mut out);
    out
}

fn push_word(out: &mut String, word: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(word);
}
