use crate::types::{Document, SOFT_DELETED_FIELD, ScoutKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Engine-facing projection of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: ScoutKey,
    pub key_name: String,
    pub payload: Document,
    /// Engine-side annotations such as the soft delete flag.
    #[serde(default)]
    pub metadata: Document,
}

impl Record {
    /// Records with an empty payload are never sent to an engine.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn is_soft_deleted(&self) -> bool {
        self.metadata.get(SOFT_DELETED_FIELD) == Some(&Value::from(1))
    }

    /// Flat document as an engine stores it: payload, then metadata, then the key.
    pub fn to_document(&self) -> Document {
        let mut document = self.payload.clone();
        for (name, value) in &self.metadata {
            document.insert(name.clone(), value.clone());
        }
        document.insert(self.key_name.clone(), self.key.to_json());
        document
    }
}
