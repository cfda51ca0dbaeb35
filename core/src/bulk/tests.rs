mod import {
    use crate::bulk::{BulkObserver, ChunkProgress, Silent};
    use crate::model::Model;
    use crate::test_support::{ScriptedEngine, create_test_scout, key, seed};
    use crate::types::{Row, ScoutConfig, SoftDeletePolicy};
    use std::sync::Arc;
    use std::time::SystemTime;

    #[test]
    fn test_small_model_imports_in_one_chunk() {
        let engine = Arc::new(ScriptedEngine::default());
        let (mut scout, store, _temp) = create_test_scout(ScoutConfig::default(), engine.clone());
        let model = scout.register(Model::new("posts"));
        seed(&store, &model, 44);

        let mut progress: Vec<ChunkProgress> = Vec::new();
        let mut observer = |p: &ChunkProgress| progress.push(p.clone());
        let report = scout.make_all_searchable(&model, &mut observer).unwrap();

        assert_eq!(report.chunks, 1);
        assert_eq!(report.rows, 44);
        assert_eq!(report.dispatched, 44);
        assert_eq!(engine.updated_keys().len(), 1);
        assert_eq!(engine.updated_keys()[0].len(), 44);
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].chunk, 1);
    }

    #[test]
    fn test_large_model_imports_in_bounded_chunks() {
        let engine = Arc::new(ScriptedEngine::default());
        let (mut scout, store, _temp) = create_test_scout(ScoutConfig::default(), engine.clone());
        let model = scout.register(Model::new("posts").chunk_size(100));
        seed(&store, &model, 250);

        let mut last_keys = Vec::new();
        let mut observer = |p: &ChunkProgress| last_keys.push(p.last_key.to_string());
        let report = scout.make_all_searchable(&model, &mut observer).unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(report.rows, 250);
        let sizes: Vec<usize> = engine.updated_keys().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(last_keys.len(), 3);
        assert_eq!(
            last_keys.last().map(String::as_str),
            engine.updated_keys()[2].last().map(String::as_str)
        );
    }

    #[test]
    fn test_import_filters_unsearchable_rows() {
        let engine = Arc::new(ScriptedEngine::default());
        let (mut scout, store, _temp) = create_test_scout(ScoutConfig::default(), engine.clone());
        let model = scout.register(
            Model::new("posts")
                .searchable_when(|row| row.key.as_integer().is_some_and(|n| n % 2 == 0)),
        );
        seed(&store, &model, 10);

        let report = scout.make_all_searchable(&model, &mut Silent).unwrap();
        assert_eq!(report.rows, 10);
        assert_eq!(report.dispatched, 5);
    }

    #[test]
    fn test_import_includes_trashed_rows_only_when_kept() {
        for (policy, expected) in [(SoftDeletePolicy::Remove, 2), (SoftDeletePolicy::KeepFlagged, 3)] {
            let engine = Arc::new(ScriptedEngine::default());
            let config = ScoutConfig {
                soft_delete: policy,
                ..ScoutConfig::default()
            };
            let (mut scout, store, _temp) = create_test_scout(config, engine.clone());
            let model = scout.register(Model::new("posts").soft_deletes(true));
            seed(&store, &model, 3);
            store.delete(&model, &key("1"), SystemTime::now()).unwrap();

            let report = scout.make_all_searchable(&model, &mut Silent).unwrap();
            assert_eq!(report.dispatched, expected, "policy {policy}");
        }
    }

    struct SkipFirst;

    impl BulkObserver for SkipFirst {
        fn prepare(&mut self, rows: &mut Vec<Row>) {
            rows.remove(0);
        }
    }

    #[test]
    fn test_prepare_hook_adjusts_chunks() {
        let engine = Arc::new(ScriptedEngine::default());
        let (mut scout, store, _temp) = create_test_scout(ScoutConfig::default(), engine.clone());
        let model = scout.register(Model::new("posts").chunk_size(2));
        seed(&store, &model, 4);

        let report = scout.make_all_searchable(&model, &mut SkipFirst).unwrap();
        assert_eq!(report.rows, 4);
        assert_eq!(report.dispatched, 2);
    }

    #[test]
    fn test_import_of_empty_model() {
        let engine = Arc::new(ScriptedEngine::default());
        let (mut scout, _store, _temp) = create_test_scout(ScoutConfig::default(), engine.clone());
        let model = scout.register(Model::new("posts"));

        let report = scout.make_all_searchable(&model, &mut Silent).unwrap();
        assert_eq!(report.chunks, 0);
        assert!(engine.updated_keys().is_empty());
    }
}

mod remove {
    use crate::bulk::Silent;
    use crate::model::Model;
    use crate::test_support::{ScriptedEngine, create_test_scout, key, seed};
    use crate::types::ScoutConfig;
    use std::sync::Arc;
    use std::time::SystemTime;

    #[test]
    fn test_remove_all_includes_trashed_rows() {
        let engine = Arc::new(ScriptedEngine::default());
        let mut config = ScoutConfig::default();
        config.chunk.unsearchable = 2;
        let (mut scout, store, _temp) = create_test_scout(config, engine.clone());
        let model = scout.register(Model::new("posts").soft_deletes(true));
        seed(&store, &model, 5);
        store.delete(&model, &key("3"), SystemTime::now()).unwrap();

        let report = scout.remove_all_from_search(&model, &mut Silent).unwrap();
        assert_eq!(report.chunks, 3);
        assert_eq!(report.dispatched, 5);
        assert!(engine.updated_keys().is_empty());
        let removed: usize = engine.deleted_keys().iter().map(Vec::len).sum();
        assert_eq!(removed, 5);
    }
}

mod queued {
    use crate::bulk::Silent;
    use crate::dispatch::MemoryQueue;
    use crate::model::Model;
    use crate::test_support::{ScriptedEngine, create_test_scout, seed};
    use crate::types::ScoutConfig;
    use std::sync::Arc;

    #[test]
    fn test_queued_import_pushes_one_task_per_chunk() {
        let engine = Arc::new(ScriptedEngine::default());
        let mut config = ScoutConfig::default();
        config.queue.enabled = true;
        let (scout, store, _temp) = create_test_scout(config, engine.clone());
        let queue = Arc::new(MemoryQueue::new());
        let mut scout = scout.with_queue(queue.clone());
        let model = scout.register(Model::new("posts").chunk_size(10));
        seed(&store, &model, 25);

        scout.make_all_searchable(&model, &mut Silent).unwrap();
        assert!(engine.updated_keys().is_empty());
        assert_eq!(queue.len(), 3);

        for task in queue.drain() {
            scout.handle_task(&task).unwrap();
        }
        let sizes: Vec<usize> = engine.updated_keys().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }
}
