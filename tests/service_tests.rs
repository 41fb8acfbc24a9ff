//! Integration tests for the service layer against an in-memory database.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use task_forest::ai::{DisabledProvider, RawSuggestion, SuggestionProvider};
use task_forest::db::{self, Database};
use task_forest::error::ErrorCode;
use task_forest::filter::TaskFilter;
use task_forest::service::{NewTask, TaskPatch, TaskService};
use task_forest::types::TaskStatus;

fn setup() -> (TaskService, i64) {
    let db = Database::open_in_memory().unwrap();
    let service = TaskService::new(db, Arc::new(DisabledProvider));
    let user = service.get_or_create_user("tester").unwrap();
    (service, user.id)
}

async fn add(service: &TaskService, user_id: i64, title: &str, parent: Option<i64>, time: i64) -> i64 {
    service
        .add_task(
            user_id,
            NewTask {
                title: title.to_string(),
                parent_id: parent,
                time_minutes: Some(time),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id
}

/// Provider stub that records the prompt inputs and returns fixed items.
struct StubProvider {
    calls: Mutex<Vec<(String, Option<String>, Option<String>)>>,
    reply: Vec<RawSuggestion>,
}

impl StubProvider {
    fn new(reply: Vec<RawSuggestion>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply,
        }
    }
}

#[async_trait]
impl SuggestionProvider for StubProvider {
    async fn suggest(
        &self,
        title: &str,
        branch_context: Option<&str>,
        leaf_title: Option<&str>,
    ) -> Result<Option<Vec<RawSuggestion>>> {
        self.calls.lock().unwrap().push((
            title.to_string(),
            branch_context.map(String::from),
            leaf_title.map(String::from),
        ));
        Ok(Some(self.reply.clone()))
    }
}

struct FailingProvider;

#[async_trait]
impl SuggestionProvider for FailingProvider {
    async fn suggest(
        &self,
        _title: &str,
        _branch_context: Option<&str>,
        _leaf_title: Option<&str>,
    ) -> Result<Option<Vec<RawSuggestion>>> {
        anyhow::bail!("provider offline")
    }
}

#[tokio::test]
async fn add_strips_and_registers_title_tags() {
    let (service, user_id) = setup();
    let task = service
        .add_task(
            user_id,
            NewTask {
                title: "Buy milk #Errand #home".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(task.title, "Buy milk");
    let names: Vec<&str> = task.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["errand", "home"]);
}

#[tokio::test]
async fn add_rejects_empty_title_and_missing_parent() {
    let (service, user_id) = setup();
    let err = service
        .add_task(user_id, NewTask::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);

    let err = service
        .add_task(
            user_id,
            NewTask {
                title: "orphan".to_string(),
                parent_id: Some(999),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TaskNotFound);
}

#[tokio::test]
async fn listing_builds_forest_with_branch_totals() {
    let (service, user_id) = setup();
    let root = add(&service, user_id, "root", None, 10).await;
    let child = add(&service, user_id, "child", Some(root), 5).await;
    let _grandchild = add(&service, user_id, "grandchild", Some(child), 20).await;

    let (forest, stats) = service.list_tasks(user_id, &TaskFilter::default()).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].branch_total, 35);
    assert_eq!(forest[0].children[0].branch_total, 25);
    assert_eq!(stats.total_minutes, 35);
}

#[tokio::test]
async fn stats_ignore_the_filter() {
    let (service, user_id) = setup();
    add(&service, user_id, "alpha #home", None, 20).await;
    add(&service, user_id, "beta", None, 15).await;

    let filter = TaskFilter {
        search: Some("alpha".to_string()),
        ..Default::default()
    };
    let (forest, stats) = service.list_tasks(user_id, &filter).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(stats.total_minutes, 35);
    assert_eq!(
        stats.tag_summary.iter().find(|(n, _)| n == "home").map(|(_, m)| *m),
        Some(20)
    );
}

#[tokio::test]
async fn completion_cascades_and_uncompletion_reverses() {
    let (service, user_id) = setup();
    let root = add(&service, user_id, "root", None, 10).await;
    let child = add(&service, user_id, "child", Some(root), 5).await;

    let flipped = service.complete_task(user_id, root).unwrap();
    assert_eq!(flipped, 2);
    for id in [root, child] {
        let task = service.get_task(user_id, id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
    }

    let (forest, stats) = service.list_tasks(user_id, &TaskFilter::default()).unwrap();
    assert_eq!(stats.total_minutes, 0);
    assert_eq!(forest[0].branch_total, 0);

    service.uncomplete_task(user_id, root).unwrap();
    for id in [root, child] {
        let task = service.get_task(user_id, id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());
    }
}

#[tokio::test]
async fn hidden_tasks_leave_listings_until_the_window_passes() {
    let (service, user_id) = setup();
    let id = add(&service, user_id, "quiet", None, 5).await;
    let hide_until = service.hide_task(user_id, id, "1h").unwrap();
    assert!(hide_until > db::now_ms());

    let (forest, stats) = service.list_tasks(user_id, &TaskFilter::default()).unwrap();
    assert!(forest.is_empty());
    // Hidden rows drop out of the stats too.
    assert_eq!(stats.total_minutes, 0);

    let err = service.hide_task(user_id, id, "soon").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
}

#[tokio::test]
async fn update_ignores_unparseable_values_and_registers_new_tags() {
    let (service, user_id) = setup();
    let id = add(&service, user_id, "draft", None, 30).await;

    let task = service
        .update_task(
            user_id,
            id,
            TaskPatch {
                title: Some("Write report #work".to_string()),
                time_minutes: Some("lots".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(task.title, "Write report");
    assert_eq!(task.time_minutes, 30);
    assert_eq!(task.tags[0].name, "work");

    let task = service
        .update_task(
            user_id,
            id,
            TaskPatch {
                time_minutes: Some("45".to_string()),
                due_at: Some("2026-09-01".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(task.time_minutes, 45);
    assert!(task.due_at.is_some());

    // An empty due string clears the date.
    let task = service
        .update_task(
            user_id,
            id,
            TaskPatch {
                due_at: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(task.due_at.is_none());

    let err = service
        .update_task(user_id, 999, TaskPatch::default())
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TaskNotFound);
}

#[tokio::test]
async fn delete_removes_the_subtree() {
    let (service, user_id) = setup();
    let root = add(&service, user_id, "root", None, 1).await;
    let child = add(&service, user_id, "child", Some(root), 1).await;

    service.delete_task(user_id, root).unwrap();
    assert!(service.get_task(user_id, child).unwrap().is_none());
    let err = service.delete_task(user_id, root).unwrap_err();
    assert_eq!(err.code, ErrorCode::TaskNotFound);
}

#[tokio::test]
async fn provider_runs_with_branch_context_under_a_parent() {
    let db = Database::open_in_memory().unwrap();
    let provider = Arc::new(StubProvider::new(vec![
        RawSuggestion {
            text: "Check dates".to_string(),
            time: Some(10),
        },
        RawSuggestion {
            text: "Compare prices".to_string(),
            time: None,
        },
    ]));
    let service = TaskService::new(db, provider.clone());
    let user_id = service.get_or_create_user("tester").unwrap().id;

    let trip = add(&service, user_id, "Plan trip", None, 0).await;
    let task = service
        .add_task(
            user_id,
            NewTask {
                title: "Book flights".to_string(),
                parent_id: Some(trip),
                run_ai: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(task.suggestions.len(), 2);
    assert_eq!(task.suggestions[0].text(), "Check dates");
    assert_eq!(task.suggestions[0].time_minutes(), 10);
    assert!(!task.suggestions[0].is_done());

    let calls = provider.calls.lock().unwrap();
    let (_, branch, leaf) = &calls[0];
    assert!(branch.as_ref().unwrap().contains("Plan trip"));
    assert_eq!(leaf.as_deref(), Some("Book flights"));
}

#[tokio::test]
async fn provider_failure_degrades_to_no_suggestions() {
    let db = Database::open_in_memory().unwrap();
    let service = TaskService::new(db, Arc::new(FailingProvider));
    let user_id = service.get_or_create_user("tester").unwrap().id;

    let task = service
        .add_task(
            user_id,
            NewTask {
                title: "Still works".to_string(),
                run_ai: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(task.suggestions.is_empty());
}

#[tokio::test]
async fn suggestion_edits_against_a_legacy_blob() {
    let (service, user_id) = setup();
    let id = add(&service, user_id, "task", None, 0).await;
    // Seed a mixed-era blob directly.
    let blob = r#"["Old step", {"text": "Old step", "time": 5, "done": false}, "Keep me"]"#;
    service
        .database()
        .with_conn(|conn| db::tasks::set_suggestion_blob(conn, user_id, id, Some(blob)))
        .unwrap();

    // Toggle hits every match; the legacy copy normalizes to done=true.
    assert!(service.toggle_suggestion_item(user_id, id, "Old step").unwrap());
    let task = service.get_task(user_id, id).unwrap().unwrap();
    assert!(task.suggestions[0].is_done());
    assert!(task.suggestions[1].is_done());

    // Second toggle flips both back off: the pair is now symmetric.
    assert!(service.toggle_suggestion_item(user_id, id, "Old step").unwrap());
    let task = service.get_task(user_id, id).unwrap().unwrap();
    assert!(!task.suggestions[0].is_done());
    assert!(!task.suggestions[1].is_done());

    // Edit rewrites only the first match.
    assert!(service
        .edit_suggestion_item(user_id, id, "Old step", "New step", Some("20"))
        .unwrap());
    let task = service.get_task(user_id, id).unwrap().unwrap();
    assert_eq!(task.suggestions[0].text(), "New step");
    assert_eq!(task.suggestions[0].time_minutes(), 20);
    assert_eq!(task.suggestions[1].text(), "Old step");

    // Remove drops every match; removing again still succeeds.
    service.remove_suggestion_item(user_id, id, "Old step").unwrap();
    service.remove_suggestion_item(user_id, id, "Old step").unwrap();
    let task = service.get_task(user_id, id).unwrap().unwrap();
    let texts: Vec<&str> = task.suggestions.iter().map(|s| s.text()).collect();
    assert_eq!(texts, vec!["New step", "Keep me"]);

    // No-match toggle reports false without error.
    assert!(!service.toggle_suggestion_item(user_id, id, "absent").unwrap());

    service.clear_suggestions(user_id, id).unwrap();
    let task = service.get_task(user_id, id).unwrap().unwrap();
    assert!(task.suggestions.is_empty());
}

#[tokio::test]
async fn tag_attach_and_detach_are_idempotent() {
    let (service, user_id) = setup();
    let id = add(&service, user_id, "task", None, 0).await;

    let tags = service.add_tag(user_id, id, "#Work").unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "work");
    let tag_id = tags[0].id;

    // Re-attaching the same name reuses the registry row.
    let tags = service.add_tag(user_id, id, "work").unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, tag_id);

    let tags = service.remove_tag(user_id, id, tag_id).unwrap();
    assert!(tags.is_empty());
    // Detaching an absent link still succeeds.
    let tags = service.remove_tag(user_id, id, tag_id).unwrap();
    assert!(tags.is_empty());

    let err = service.add_tag(user_id, id, "#").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
}

#[tokio::test]
async fn export_branch_walks_to_the_root() {
    let (service, user_id) = setup();
    let root = add(&service, user_id, "Trip", None, 0).await;
    let child = add(&service, user_id, "Pack", Some(root), 0).await;
    let leaf = add(&service, user_id, "Sunscreen", Some(child), 0).await;

    let branch = service.export_branch(user_id, leaf).unwrap();
    assert_eq!(branch.id, root);
    assert_eq!(branch.subtasks[0].subtasks[0].title, "Sunscreen");

    let err = service.export_branch(user_id, 999).unwrap_err();
    assert_eq!(err.code, ErrorCode::TaskNotFound);
}

#[tokio::test]
async fn on_disk_database_persists_across_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");

    {
        let db = Database::open(&path).unwrap();
        let service = TaskService::new(db, Arc::new(DisabledProvider));
        let user_id = service.get_or_create_user("tester").unwrap().id;
        add(&service, user_id, "durable #keep", None, 5).await;
    }

    let db = Database::open(&path).unwrap();
    let service = TaskService::new(db, Arc::new(DisabledProvider));
    let user_id = service.get_or_create_user("tester").unwrap().id;
    let (forest, stats) = service.list_tasks(user_id, &TaskFilter::default()).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].task.title, "durable");
    assert_eq!(forest[0].task.tags[0].name, "keep");
    assert_eq!(stats.total_minutes, 5);
}

#[tokio::test]
async fn users_are_isolated() {
    let (service, user_id) = setup();
    let other = service.get_or_create_user("other").unwrap();
    let id = add(&service, user_id, "mine", None, 5).await;

    assert!(service.get_task(other.id, id).unwrap().is_none());
    let (forest, _) = service.list_tasks(other.id, &TaskFilter::default()).unwrap();
    assert!(forest.is_empty());
    let err = service.complete_task(other.id, id).unwrap_err();
    assert_eq!(err.code, ErrorCode::TaskNotFound);
}
