//! One in-process fuzzy index.

use scout_core::types::{Document, Record, SOFT_DELETED_FIELD, ScoutKey, push_text};
use serde_json::Value;
use std::collections::BTreeMap;

const SEARCHABLE_ATTRIBUTES: &str = "searchableAttributes";

pub(crate) struct Entry {
    pub(crate) document: Document,
    /// Text the pattern is matched against.
    pub(crate) haystack: String,
}

/// Documents of one index keyed by record key.
///
/// The haystack of each entry is derived from its document and the
/// `searchableAttributes` setting, so it is rebuilt whenever settings change.
pub(crate) struct Index {
    entries: BTreeMap<ScoutKey, Entry>,
    primary_key: Option<String>,
    settings: Document,
}

impl Index {
    pub(crate) fn new(primary_key: Option<String>, settings: Document) -> Self {
        Self {
            entries: BTreeMap::new(),
            primary_key,
            settings,
        }
    }

    pub(crate) fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub(crate) fn settings(&self) -> &Document {
        &self.settings
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&ScoutKey, &Entry)> {
        self.entries.iter()
    }

    pub(crate) fn upsert(&mut self, record: &Record) {
        if self.primary_key.is_none() {
            self.primary_key = Some(record.key_name.clone());
        }
        let document = record.to_document();
        let haystack = self.haystack(&document);
        self.entries
            .insert(record.key.clone(), Entry { document, haystack });
    }

    pub(crate) fn remove(&mut self, key: &ScoutKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Merges settings over the current ones.
    pub(crate) fn apply_settings(&mut self, settings: &Document) {
        for (name, value) in settings {
            self.settings.insert(name.clone(), value.clone());
        }
        let rebuilt: Vec<(ScoutKey, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), self.haystack(&entry.document)))
            .collect();
        for (key, haystack) in rebuilt {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.haystack = haystack;
            }
        }
    }

    /// `None` means every attribute is searchable.
    fn searchable_attributes(&self) -> Option<Vec<&str>> {
        let attributes = self.settings.get(SEARCHABLE_ATTRIBUTES)?.as_array()?;
        let names: Vec<&str> = attributes.iter().filter_map(Value::as_str).collect();
        if names.contains(&"*") {
            return None;
        }
        Some(names)
    }

    fn haystack(&self, document: &Document) -> String {
        let mut out = String::new();
        match self.searchable_attributes() {
            Some(names) => {
                for name in names {
                    if let Some(value) = document.get(name) {
                        push_text(value, &mut out);
                    }
                }
            }
            None => {
                for (name, value) in document {
                    if name != SOFT_DELETED_FIELD {
                        push_text(value, &mut out);
                    }
                }
            }
        }
        out
    }
}
