//! In-process fuzzy engine backed by the nucleo matcher.

mod index;


use crate::scan::{self, Candidate};
use index::Index;
use nucleo::pattern::{CaseMatching as NucleoCaseMatching, Normalization, Pattern};
use nucleo::{Config as NucleoConfig, Matcher, Utf32Str};
use scout_core::engine::error::EngineError;
use scout_core::types::{
    CaseMatching, Document, FuzzyConfig, METADATA_PREFIX, Record, ScoutKey,
};
use scout_core::{Engine, IndexOptions, Model, QueryDescriptor, RawResults, Window};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

pub struct FuzzyEngine {
    indexes: RwLock<HashMap<String, Index>>,
    case_matching: NucleoCaseMatching,
    normalization: Normalization,
}

impl FuzzyEngine {
    pub const NAME: &'static str = "fuzzy";

    pub fn new(config: &FuzzyConfig) -> Self {
        let case_matching = match config.case_matching {
            CaseMatching::Sensitive => NucleoCaseMatching::Respect,
            CaseMatching::Insensitive => NucleoCaseMatching::Ignore,
            CaseMatching::Smart => NucleoCaseMatching::Smart,
        };

        let normalization = if config.unicode_normalization {
            Normalization::Smart
        } else {
            Normalization::Never
        };

        Self {
            indexes: RwLock::new(HashMap::new()),
            case_matching,
            normalization,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Index>>, EngineError> {
        self.indexes
            .read()
            .map_err(|_| EngineError::Poisoned("fuzzy indexes"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Index>>, EngineError> {
        self.indexes
            .write()
            .map_err(|_| EngineError::Poisoned("fuzzy indexes"))
    }
}

/// Introspection.
impl FuzzyEngine {
    /// Number of documents in the index, `None` when it does not exist.
    pub fn document_count(&self, index: &str) -> Result<Option<usize>, EngineError> {
        Ok(self.read()?.get(index).map(Index::len))
    }

    pub fn index_names(&self) -> Result<Vec<String>, EngineError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn primary_key(&self, index: &str) -> Result<Option<String>, EngineError> {
        Ok(self
            .read()?
            .get(index)
            .and_then(|index| index.primary_key().map(str::to_string)))
    }

    pub fn settings(&self, index: &str) -> Result<Option<Document>, EngineError> {
        Ok(self.read()?.get(index).map(|index| index.settings().clone()))
    }
}

/// Search operations.
impl FuzzyEngine {
    fn run(&self, query: &QueryDescriptor, window: Window) -> Result<RawResults, EngineError> {
        let plan = query.scan_plan(window, query.soft_delete_flagged);
        let name = query.index_name();
        let indexes = self.read()?;
        let Some(index) = indexes.get(&name) else {
            debug!(index = %name, "searching a missing index");
            return Ok(scan::finish(Vec::new(), &plan));
        };

        let term = plan.term.trim();
        let pattern = Pattern::parse(term, self.case_matching, self.normalization);
        let mut matcher = Matcher::new(NucleoConfig::DEFAULT);
        let mut buf = Vec::new();

        let mut candidates = Vec::new();
        for (key, entry) in index.entries() {
            if !plan.admits(&entry.document) {
                continue;
            }
            let score = if term.is_empty() {
                0
            } else {
                match pattern.score(Utf32Str::new(&entry.haystack, &mut buf), &mut matcher) {
                    Some(score) => score,
                    None => continue,
                }
            };
            candidates.push(Candidate {
                key: key.clone(),
                document: entry.document.clone(),
                score: Some(score),
            });
        }

        Ok(scan::finish(candidates, &plan))
    }
}

impl Engine for FuzzyEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&self, model: &Model, records: &[Record]) -> Result<(), EngineError> {
        if records.is_empty() {
            return Ok(());
        }
        let name = model.index_name();
        let mut indexes = self.write()?;
        let index = indexes.entry(name.clone()).or_insert_with(|| {
            Index::new(
                Some(model.key_field().to_string()),
                model.settings().cloned().unwrap_or_default(),
            )
        });

        let mut written = 0;
        for record in records.iter().filter(|record| !record.is_empty()) {
            index.upsert(record);
            written += 1;
        }
        debug!(index = %name, written, skipped = records.len() - written, "fuzzy update");
        Ok(())
    }

    fn delete(&self, model: &Model, keys: &[ScoutKey]) -> Result<(), EngineError> {
        if keys.is_empty() {
            return Ok(());
        }
        let name = model.index_name();
        let mut indexes = self.write()?;
        let Some(index) = indexes.get_mut(&name) else {
            debug!(index = %name, "delete on a missing index ignored");
            return Ok(());
        };
        let removed = keys.iter().filter(|key| index.remove(key)).count();
        debug!(index = %name, removed, requested = keys.len(), "fuzzy delete");
        Ok(())
    }

    fn search(&self, query: &QueryDescriptor) -> Result<RawResults, EngineError> {
        self.run(query, Window::first(query.limit))
    }

    fn paginate(
        &self,
        query: &QueryDescriptor,
        per_page: usize,
        page: usize,
    ) -> Result<RawResults, EngineError> {
        self.run(query, Window::page(per_page, page))
    }

    fn total_count(&self, raw: &RawResults) -> usize {
        scan::total(raw)
    }

    fn metadata_prefix(&self) -> Option<&str> {
        Some(METADATA_PREFIX)
    }

    fn flush(&self, model: &Model) -> Result<(), EngineError> {
        if let Some(index) = self.write()?.get_mut(&model.index_name()) {
            index.clear();
        }
        Ok(())
    }

    fn create_index(&self, name: &str, options: &IndexOptions) -> Result<(), EngineError> {
        let mut indexes = self.write()?;
        if indexes.contains_key(name) {
            return Err(EngineError::IndexExists(name.to_string()));
        }
        indexes.insert(
            name.to_string(),
            Index::new(options.primary_key.clone(), options.settings.clone()),
        );
        Ok(())
    }

    fn delete_index(&self, name: &str) -> Result<(), EngineError> {
        match self.write()?.remove(name) {
            Some(_) => Ok(()),
            None => Err(EngineError::IndexNotFound(name.to_string())),
        }
    }

    fn update_index_settings(&self, name: &str, settings: &Document) -> Result<(), EngineError> {
        self.write()?
            .entry(name.to_string())
            .or_insert_with(|| Index::new(None, Document::new()))
            .apply_settings(settings);
        Ok(())
    }

    fn delete_all_indexes(&self) -> Result<(), EngineError> {
        self.write()?.clear();
        Ok(())
    }
}
