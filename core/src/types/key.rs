use nutype::nutype;
use serde_json::Value;
use std::cmp::Ordering;


pub const MAX_KEY_LENGTH: usize = 256;

/// Store key of a searchable row. Integral keys are kept in their decimal form.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = MAX_KEY_LENGTH),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Into,
        Hash,
        Borrow,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct ScoutKey(String);

impl ScoutKey {
    /// Returns the key as an integer when it is written in canonical decimal form.
    pub fn as_integer(&self) -> Option<i64> {
        let n: i64 = self.as_str().parse().ok()?;
        (n.to_string() == self.as_str()).then_some(n)
    }

    /// Integral keys compare numerically and sort before textual ones.
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self.as_integer(), other.as_integer()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.as_str().cmp(other.as_str()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self.as_integer() {
            Some(n) => Value::from(n),
            None => Value::from(self.as_str()),
        }
    }

    /// Reads a key out of an engine document field.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::try_new(s.clone()).ok(),
            Value::Number(n) => Self::try_new(n.to_string()).ok(),
            _ => None,
        }
    }
}
