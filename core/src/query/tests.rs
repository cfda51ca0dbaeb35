use super::*;
use crate::model::Model;
use crate::test_support::doc;
use serde_json::json;

fn callback<F>(f: F) -> SearchCallback
where
    F: Fn(CompiledQuery<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn descriptor() -> QueryDescriptor {
    QueryDescriptor::new(Arc::new(Model::new("posts").prefixed("test_")), "rust")
}

#[test]
fn test_index_name_override() {
    let mut query = descriptor();
    assert_eq!(query.index_name(), "test_posts");

    query.index = Some("custom".to_string());
    assert_eq!(query.index_name(), "custom");
}

#[test]
fn test_predicates_match_like_sql() {
    let eq = Predicate::Eq {
        field: "user_id".to_string(),
        value: json!(1),
    };
    assert!(eq.matches(Some(&json!(1))));
    assert!(eq.matches(Some(&json!("1"))));
    assert!(!eq.matches(Some(&json!(2))));
    assert!(!eq.matches(None));

    let tags = Predicate::In {
        field: "tags".to_string(),
        values: vec![json!("rust"), json!("go")],
    };
    assert!(tags.matches(Some(&json!(["python", "rust"]))));
    assert!(!tags.matches(Some(&json!(["python"]))));

    let not_in = Predicate::NotIn {
        field: "status".to_string(),
        values: vec![json!("draft")],
    };
    assert!(not_in.matches(Some(&json!("published"))));
    assert!(not_in.matches(None));
    assert!(!not_in.matches(Some(&json!("draft"))));
}

#[test]
fn test_scan_plan_admits_documents() {
    let mut query = descriptor();
    query.filters.push(Predicate::Eq {
        field: "user_id".to_string(),
        value: json!(1),
    });
    let plan = query.scan_plan(Window::default(), false);

    assert!(plan.admits(&doc(json!({"user_id": 1}))));
    assert!(!plan.admits(&doc(json!({"user_id": 2}))));
}

#[test]
fn test_soft_delete_flag_clause_follows_trashed_mode() {
    let mut query = descriptor();
    query.soft_delete_flagged = true;

    let flag = |query: &QueryDescriptor| {
        query
            .effective_filters()
            .into_iter()
            .find(|p| p.field() == crate::types::SOFT_DELETED_FIELD)
    };

    assert_eq!(
        flag(&query),
        Some(Predicate::Eq {
            field: "__soft_deleted".to_string(),
            value: json!(0)
        })
    );

    query.trashed = TrashedMode::Only;
    assert_eq!(
        flag(&query),
        Some(Predicate::Eq {
            field: "__soft_deleted".to_string(),
            value: json!(1)
        })
    );

    query.trashed = TrashedMode::Include;
    assert_eq!(flag(&query), None);

    query.soft_delete_flagged = false;
    query.trashed = TrashedMode::Exclude;
    assert_eq!(flag(&query), None);
}

#[test]
fn test_callback_rewrites_scan_plan() {
    let mut query = descriptor();
    query.callback = Some(callback(|compiled| {
        if let CompiledQuery::Scan(plan) = compiled {
            plan.term = "rewritten".to_string();
        }
    }));

    let plan = query.scan_plan(Window::first(Some(3)), false);
    assert_eq!(plan.term, "rewritten");
    assert_eq!(plan.window.limit, Some(3));
}

#[test]
fn test_window_pages_are_one_based() {
    let window = Window::page(5, 2);
    assert_eq!(window.offset, 5);
    assert_eq!(window.apply((0..10).collect()), vec![5, 6, 7, 8, 9]);

    assert_eq!(Window::page(5, 0).offset, 0);
    assert_eq!(Window::first(None).apply(vec![1, 2]), vec![1, 2]);
}

#[test]
fn test_window_for_huge_page_is_empty() {
    let window = Window::page(2, usize::MAX);
    assert_eq!(window.offset, usize::MAX);
    assert_eq!(window.limit, Some(2));
    assert!(window.apply((0..10).collect::<Vec<u8>>()).is_empty());
}

#[test]
fn test_page_counts() {
    let page: Page<u8> = Page {
        items: Vec::new(),
        total: 11,
        per_page: 5,
        current_page: 2,
    };
    assert_eq!(page.last_page(), 3);
    assert!(page.has_more_pages());

    let empty: Page<u8> = Page {
        items: Vec::new(),
        total: 0,
        per_page: 5,
        current_page: 1,
    };
    assert_eq!(empty.last_page(), 1);
    assert!(!empty.has_more_pages());
}
