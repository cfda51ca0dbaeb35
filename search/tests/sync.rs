mod common;

use common::{create_harness, create_queued_harness, doc, key, keys};
use scout_core::types::SoftDeletePolicy;
use scout_core::{DispatchOutcome, MemoryQueue, Model, Row, ScoutConfig, SyncDecision, TaskAction};
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

/// Verify records sent to the engine are found by a search right away.
#[test]
fn test_update_then_search_returns_keys() {
    let mut harness = create_harness(ScoutConfig::default());
    let model = harness.scout.register(Model::new("posts"));
    let events = harness
        .store
        .save_many(
            &model,
            [
                (key("1"), doc(json!({"title": "Hello world"}))),
                (key("2"), doc(json!({"title": "Hello there"}))),
                (key("3"), doc(json!({"title": "Goodbye"}))),
            ],
        )
        .unwrap();
    for event in &events {
        harness.scout.observe(&model, event).unwrap();
    }

    let found = harness.scout.search(&model, "hello").keys().unwrap();

    let mut found: Vec<String> = found.iter().map(ToString::to_string).collect();
    found.sort();
    assert_eq!(found, vec!["1", "2"]);
}

/// Verify removing the same record twice succeeds.
#[test]
fn test_delete_twice_succeeds() {
    let mut harness = create_harness(ScoutConfig::default());
    let model = harness.scout.register(Model::new("posts"));
    let rows = harness
        .store
        .save_many(&model, [(key("1"), doc(json!({"title": "Hello"})))])
        .unwrap();
    harness.scout.observe(&model, &rows[0]).unwrap();

    harness.scout.unsearchable(&model, keys(&["1"])).unwrap();
    harness.scout.unsearchable(&model, keys(&["1"])).unwrap();

    assert!(harness.scout.search(&model, "hello").keys().unwrap().is_empty());
}

/// Verify a renamed record is no longer found under its old title.
#[test]
fn test_renamed_record_leaves_old_term() {
    let mut harness = create_harness(ScoutConfig::default());
    let model = harness.scout.register(Model::new("posts"));

    let created = harness
        .store
        .save(&model, &key("1"), doc(json!({"title": "Laravel tips"})))
        .unwrap();
    harness.scout.observe(&model, &created).unwrap();
    assert_eq!(
        harness.scout.search(&model, "Laravel").keys().unwrap(),
        keys(&["1"])
    );

    let renamed = harness
        .store
        .save(&model, &key("1"), doc(json!({"title": "Symfony tips"})))
        .unwrap();
    let decision = harness.scout.observe(&model, &renamed).unwrap();

    assert_eq!(decision, SyncDecision::Index);
    assert!(harness.scout.search(&model, "Laravel").keys().unwrap().is_empty());
    let rows = harness.scout.search(&model, "Symfony").get().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("title"), Some(&json!("Symfony tips")));
}

/// Verify a deleted record drops out of search when soft deletes are not kept.
#[test]
fn test_hard_delete_removes_from_index() {
    let mut harness = create_harness(ScoutConfig::default());
    let model = harness.scout.register(Model::new("posts"));
    let created = harness
        .store
        .save(&model, &key("1"), doc(json!({"title": "Hello"})))
        .unwrap();
    harness.scout.observe(&model, &created).unwrap();

    let deleted = harness
        .store
        .delete(&model, &key("1"), SystemTime::now())
        .unwrap();
    let decision = harness.scout.observe(&model, &deleted).unwrap();

    assert_eq!(decision, SyncDecision::Remove);
    assert_eq!(harness.fuzzy.document_count("posts").unwrap(), Some(0));
}

/// Verify trashed records stay indexed with a flag and are filtered by trashed mode.
#[test]
fn test_keep_flagged_soft_deletes() {
    let config = ScoutConfig {
        soft_delete: SoftDeletePolicy::KeepFlagged,
        ..ScoutConfig::default()
    };
    let mut harness = create_harness(config);
    let model = harness
        .scout
        .register(Model::new("posts").soft_deletes(true));
    let events = harness
        .store
        .save_many(
            &model,
            [
                (key("1"), doc(json!({"title": "First post"}))),
                (key("2"), doc(json!({"title": "Second post"}))),
            ],
        )
        .unwrap();
    for event in &events {
        harness.scout.observe(&model, event).unwrap();
    }

    let trashed = harness
        .store
        .delete(&model, &key("1"), SystemTime::now())
        .unwrap();
    assert_eq!(
        harness.scout.observe(&model, &trashed).unwrap(),
        SyncDecision::Index
    );

    assert_eq!(harness.fuzzy.document_count("posts").unwrap(), Some(2));
    assert_eq!(
        harness.scout.search(&model, "post").keys().unwrap(),
        keys(&["2"])
    );
    assert_eq!(
        harness.scout.search(&model, "post").only_trashed().keys().unwrap(),
        keys(&["1"])
    );
    let all = harness.scout.search(&model, "post").with_trashed().get().unwrap();
    assert_eq!(all.len(), 2);

    let restored = harness.store.restore(&model, &key("1")).unwrap();
    harness.scout.observe(&model, &restored).unwrap();
    assert_eq!(
        harness.scout.search(&model, "post").keys().unwrap().len(),
        2
    );
}

/// Verify disabled syncing skips every lifecycle event until re-enabled.
#[test]
fn test_without_syncing_skips_index() {
    let mut harness = create_harness(ScoutConfig::default());
    let model = harness.scout.register(Model::new("posts"));
    let created = harness
        .store
        .save(&model, &key("1"), doc(json!({"title": "Hello"})))
        .unwrap();

    let decision = harness
        .scout
        .without_syncing_for(&model, |scout| scout.observe(&model, &created).unwrap());

    assert_eq!(decision, SyncDecision::Skip);
    assert_eq!(harness.fuzzy.document_count("posts").unwrap(), None);
    assert!(harness.scout.policy().is_enabled(model.name()));
}

/// Verify queued writes reach the engine only when the task is handled.
#[test]
fn test_queued_write_applies_on_handle() {
    let mut config = ScoutConfig::default();
    config.queue.enabled = true;
    let queue = Arc::new(MemoryQueue::new());
    let mut harness = create_queued_harness(config, queue.clone());
    let model = harness.scout.register(Model::new("posts"));

    let rows = vec![Row::new(key("1"), doc(json!({"title": "Hello"})))];
    assert_eq!(
        harness.scout.searchable(&model, &rows).unwrap(),
        DispatchOutcome::Queued
    );
    assert_eq!(
        harness.scout.searchable(&model, &rows).unwrap(),
        DispatchOutcome::Duplicate
    );
    assert_eq!(harness.fuzzy.document_count("posts").unwrap(), None);

    let task = queue.pop().unwrap();
    assert_eq!(task.action(), TaskAction::Update);
    harness.scout.handle_task(&task).unwrap();

    assert_eq!(
        harness.scout.search(&model, "hello").keys().unwrap(),
        keys(&["1"])
    );
}
