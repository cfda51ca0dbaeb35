use crate::types::{Document, ScoutKey};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::SystemTime;

/// A store row as seen by the search layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: ScoutKey,
    pub attributes: Document,
    /// Set while the row sits in the trash of a soft-deleting model.
    pub trashed_at: Option<SystemTime>,
    /// Engine metadata attached while mapping hits.
    pub metadata: Document,
}

impl Row {
    pub fn new(key: ScoutKey, attributes: Document) -> Self {
        Self {
            key,
            attributes,
            trashed_at: None,
            metadata: Document::new(),
        }
    }

    pub fn trashed(mut self, at: SystemTime) -> Self {
        self.trashed_at = Some(at);
        self
    }

    pub fn is_trashed(&self) -> bool {
        self.trashed_at.is_some()
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Names of attributes whose value differs between the two maps,
    /// including attributes present on only one side.
    pub fn changed_between(previous: &Document, current: &Document) -> BTreeSet<String> {
        let mut changed: BTreeSet<String> = current
            .iter()
            .filter(|(name, value)| previous.get(name.as_str()) != Some(*value))
            .map(|(name, _)| name.clone())
            .collect();
        changed.extend(
            previous
                .keys()
                .filter(|name| !current.contains_key(name.as_str()))
                .cloned(),
        );
        changed
    }
}
