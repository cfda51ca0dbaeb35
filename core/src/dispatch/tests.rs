mod task {
    use crate::dispatch::{SyncTask, TaskAction, TaskPayload};
    use crate::model::Model;
    use crate::test_support::{key, row};
    use crate::types::QueueTarget;
    use serde_json::json;

    #[test]
    fn test_unique_key_ignores_key_order() {
        let a = [key("1"), key("2"), key("3")];
        let b = [key("3"), key("1"), key("2")];
        let a: Vec<_> = a.iter().collect();
        let b: Vec<_> = b.iter().collect();

        let key_a = SyncTask::unique_key(TaskAction::Update, "posts", &a);
        assert_eq!(key_a, SyncTask::unique_key(TaskAction::Update, "posts", &b));
        assert!(key_a.starts_with("scout:update:posts:"));
        assert_ne!(key_a, SyncTask::unique_key(TaskAction::Remove, "posts", &a));
        assert_ne!(key_a, SyncTask::unique_key(TaskAction::Update, "users", &a));
    }

    #[test]
    fn test_task_survives_json() {
        let model = Model::new("posts");
        let record = model.to_record(&row("1", json!({"title": "a"})), false);
        let target = QueueTarget {
            connection: Some("redis".to_string()),
            queue: Some("search".to_string()),
        };

        let task = SyncTask::update(&model, vec![record], target);
        let decoded = SyncTask::from_json(&task.to_json().unwrap()).unwrap();
        assert_eq!(decoded, task);
        assert_eq!(decoded.action(), TaskAction::Update);
        assert!(matches!(decoded.payload, TaskPayload::Update(ref records) if records.len() == 1));
        assert_eq!(decoded.queue.as_deref(), Some("search"));
    }
}

mod queue {
    use crate::dispatch::{Enqueued, MemoryQueue, SyncTask, TaskQueue};
    use crate::model::Model;
    use crate::test_support::key;
    use crate::types::QueueTarget;

    #[test]
    fn test_duplicate_pending_task_is_rejected() {
        let queue = MemoryQueue::new();
        let model = Model::new("posts");
        let task = || SyncTask::remove(&model, vec![key("1"), key("2")], QueueTarget::default());

        assert_eq!(queue.push(task()).unwrap(), Enqueued::Queued);
        assert_eq!(queue.push(task()).unwrap(), Enqueued::Duplicate);
        assert_eq!(queue.len(), 1);

        let taken = queue.pop().unwrap();
        assert_eq!(taken.unique_key, task().unique_key);
        assert!(queue.is_empty());
        assert_eq!(queue.push(task()).unwrap(), Enqueued::Queued);
    }

    #[test]
    fn test_queue_is_fifo() {
        let queue = MemoryQueue::new();
        let model = Model::new("posts");
        queue
            .push(SyncTask::remove(&model, vec![key("1")], QueueTarget::default()))
            .unwrap();
        queue
            .push(SyncTask::remove(&model, vec![key("2")], QueueTarget::default()))
            .unwrap();

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(
            drained[0].unique_key,
            SyncTask::remove(&model, vec![key("1")], QueueTarget::default()).unique_key
        );
        assert!(queue.is_empty());
    }
}

mod dispatcher {
    use crate::dispatch::{DispatchOutcome, MemoryQueue, TaskPayload, WriteDispatcher};
    use crate::error::ScoutError;
    use crate::dispatch::error::QueueError;
    use crate::model::Model;
    use crate::sync::SyncPolicy;
    use crate::test_support::{ScriptedEngine, key, row};
    use crate::types::{QueueConfig, QueueTarget, SoftDeletePolicy};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::SystemTime;

    fn queued_config() -> QueueConfig {
        QueueConfig {
            enabled: true,
            connection: Some("redis".to_string()),
            queue: Some("default".to_string()),
        }
    }

    #[test]
    fn test_synchronous_dispatch_calls_engine() {
        let engine = ScriptedEngine::default();
        let dispatcher = WriteDispatcher::new(QueueConfig::default());
        let model = Model::new("posts");
        let records = dispatcher.records(
            &SyncPolicy::default(),
            &model,
            &[row("1", json!({"title": "a"}))],
        );

        let outcome = dispatcher.index(&engine, &model, records).unwrap();
        assert_eq!(outcome, DispatchOutcome::Executed);
        assert_eq!(engine.updated_keys(), vec![vec!["1".to_string()]]);

        let outcome = dispatcher.remove(&engine, &model, vec![key("1")]).unwrap();
        assert_eq!(outcome, DispatchOutcome::Executed);
        assert_eq!(engine.deleted_keys(), vec![vec!["1".to_string()]]);
    }

    #[test]
    fn test_empty_batches_are_not_dispatched() {
        let engine = ScriptedEngine::default();
        let dispatcher = WriteDispatcher::new(QueueConfig::default());
        let model = Model::new("posts");

        assert_eq!(
            dispatcher.index(&engine, &model, Vec::new()).unwrap(),
            DispatchOutcome::Empty
        );
        assert_eq!(
            dispatcher.remove(&engine, &model, Vec::new()).unwrap(),
            DispatchOutcome::Empty
        );
        assert!(engine.deleted_keys().is_empty());
    }

    #[test]
    fn test_queued_dispatch_deduplicates_and_routes() {
        let engine = ScriptedEngine::default();
        let queue = Arc::new(MemoryQueue::new());
        let mut dispatcher = WriteDispatcher::new(queued_config());
        dispatcher.set_queue(queue.clone());
        let model = Model::new("posts").queue(QueueTarget {
            connection: None,
            queue: Some("search".to_string()),
        });

        let first = dispatcher.remove(&engine, &model, vec![key("1"), key("2")]).unwrap();
        let second = dispatcher.remove(&engine, &model, vec![key("2"), key("1")]).unwrap();
        assert_eq!(first, DispatchOutcome::Queued);
        assert_eq!(second, DispatchOutcome::Duplicate);
        assert!(engine.deleted_keys().is_empty());

        let task = queue.pop().unwrap();
        assert_eq!(task.connection.as_deref(), Some("redis"));
        assert_eq!(task.queue.as_deref(), Some("search"));
        assert!(matches!(task.payload, TaskPayload::Remove(ref keys) if keys.len() == 2));
    }

    #[test]
    fn test_enabled_queue_without_backend_fails() {
        let engine = ScriptedEngine::default();
        let dispatcher = WriteDispatcher::new(queued_config());
        let model = Model::new("posts");

        let result = dispatcher.remove(&engine, &model, vec![key("1")]);
        assert!(matches!(
            result,
            Err(ScoutError::Queue(QueueError::NotConfigured))
        ));
    }

    #[test]
    fn test_records_carry_soft_delete_flag_when_kept() {
        let dispatcher = WriteDispatcher::new(QueueConfig::default());
        let model = Model::new("posts").soft_deletes(true);
        let trashed = row("1", json!({"title": "a"})).trashed(SystemTime::now());

        let kept = SyncPolicy::new(SoftDeletePolicy::KeepFlagged);
        let records = dispatcher.records(&kept, &model, std::slice::from_ref(&trashed));
        assert!(records[0].is_soft_deleted());

        let removed = SyncPolicy::new(SoftDeletePolicy::Remove);
        let records = dispatcher.records(&removed, &model, &[trashed]);
        assert!(records[0].metadata.is_empty());
    }
}
