//! The service layer: storage, engine and provider wired together.
//!
//! Everything here is synchronous except `add_task`, whose only await point
//! is the suggestion provider call.

use crate::ai::SuggestionProvider;
use crate::db::{self, Database};
use crate::error::{ServiceError, ServiceResult};
use crate::export::{self, BranchNode};
use crate::filter::{self, TaskFilter};
use crate::stats;
use crate::suggestion;
use crate::tags::{extract_tags, strip_tags};
use crate::tree;
use crate::types::{Tag, Task, TaskNode, TaskStats, TaskStatus, User};
use chrono::Local;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct TaskService {
    db: Database,
    provider: Arc<dyn SuggestionProvider>,
}

/// Input for task creation.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub parent_id: Option<i64>,
    pub time_minutes: Option<i64>,
    pub importance: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<i64>,
    /// Ask the provider for sub-step suggestions.
    pub run_ai: bool,
}

/// Field-by-field task update. Time and due values arrive as raw strings;
/// unparseable input leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub time_minutes: Option<String>,
    pub importance: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<String>,
}

impl TaskService {
    pub fn new(db: Database, provider: Arc<dyn SuggestionProvider>) -> Self {
        Self { db, provider }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn get_or_create_user(&self, name: &str) -> ServiceResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::missing_field("user"));
        }
        Ok(db::users::get_or_create_user(&self.db, name)?)
    }

    /// The main view: the filtered forest plus stats over the whole visible
    /// set (stats ignore the filter so the footer stays stable while
    /// searching).
    pub fn list_tasks(
        &self,
        user_id: i64,
        filter: &TaskFilter,
    ) -> ServiceResult<(Vec<TaskNode>, TaskStats)> {
        let tasks = self
            .db
            .with_conn(|conn| db::tasks::list_visible(conn, user_id, db::now_ms()))?;
        let stats = stats::summarize(&tasks);
        let filtered = filter::apply(&tasks, filter, Local::now());
        Ok((tree::build_forest(filtered), stats))
    }

    pub async fn add_task(&self, user_id: i64, new: NewTask) -> ServiceResult<Task> {
        let raw_title = new.title.trim().to_string();
        if raw_title.is_empty() {
            return Err(ServiceError::missing_field("title"));
        }
        let tag_names = extract_tags(&raw_title);
        let stripped = strip_tags(&raw_title);
        let title = if stripped.is_empty() { raw_title } else { stripped };

        if let Some(parent_id) = new.parent_id {
            let parent = self
                .db
                .with_conn(|conn| db::tasks::get_task(conn, user_id, parent_id))?;
            if parent.is_none() {
                return Err(ServiceError::task_not_found(parent_id));
            }
        }

        let suggestions = if new.run_ai {
            self.fetch_suggestions(user_id, &title, new.parent_id).await
        } else {
            Vec::new()
        };
        let blob = if suggestions.is_empty() {
            None
        } else {
            Some(suggestion::encode_list(&suggestions))
        };

        let task_id = self.db.with_conn(|conn| {
            let task_id = db::tasks::insert_task(
                conn,
                user_id,
                &db::tasks::InsertTask {
                    title: title.clone(),
                    parent_id: new.parent_id,
                    time_minutes: new.time_minutes.unwrap_or(0).max(0),
                    importance: new.importance.clone().filter(|s| !s.is_empty()),
                    description: new.description.clone().filter(|s| !s.is_empty()),
                    due_at: new.due_at,
                    ai_suggestion: blob.clone(),
                    created_at: db::now_ms(),
                },
            )?;
            db::tags::register_tags(conn, user_id, task_id, &tag_names)?;
            Ok(task_id)
        })?;
        info!(task_id, user_id, "task created");

        self.require_task(user_id, task_id)
    }

    /// Ask the provider; any failure degrades to no suggestions.
    async fn fetch_suggestions(
        &self,
        user_id: i64,
        title: &str,
        parent_id: Option<i64>,
    ) -> Vec<crate::suggestion::SuggestionItem> {
        let branch = match parent_id {
            Some(pid) => {
                let all = self
                    .db
                    .with_conn(|conn| db::tasks::list_all(conn, user_id))
                    .unwrap_or_default();
                export::branch_context(pid, &all).ok().map(|b| b.to_json())
            }
            None => None,
        };
        let leaf = branch.as_ref().map(|_| title);
        match self.provider.suggest(title, branch.as_deref(), leaf).await {
            Ok(Some(raw)) => {
                debug!(count = raw.len(), "provider suggestions accepted");
                raw.into_iter().fold(Vec::new(), |list, item| {
                    suggestion::push_item(list, item.text, item.time)
                })
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("suggestion provider failed: {err:#}");
                Vec::new()
            }
        }
    }

    pub fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        patch: TaskPatch,
    ) -> ServiceResult<Task> {
        let mut task = self.require_task(user_id, task_id)?;
        let mut new_tags: Vec<String> = Vec::new();

        if let Some(title) = patch.title {
            let raw = title.trim().to_string();
            if !raw.is_empty() {
                new_tags = extract_tags(&raw);
                let stripped = strip_tags(&raw);
                task.title = if stripped.is_empty() { raw } else { stripped };
            }
        }
        if let Some(raw) = patch.time_minutes {
            if let Ok(minutes) = raw.trim().parse::<i64>() {
                task.time_minutes = minutes.max(0);
            }
        }
        if let Some(importance) = patch.importance {
            task.importance = Some(importance).filter(|s| !s.is_empty());
        }
        if let Some(description) = patch.description {
            task.description = Some(description).filter(|s| !s.is_empty());
        }
        if let Some(raw) = patch.due_at {
            let raw = raw.trim();
            if raw.is_empty() {
                task.due_at = None;
            } else if let Some(due) = parse_due(raw) {
                task.due_at = Some(due);
            }
        }

        self.db.with_conn(|conn| {
            if !db::tasks::save_task(conn, &task)? {
                return Ok(false);
            }
            db::tags::register_tags(conn, user_id, task_id, &new_tags)?;
            Ok(true)
        })?;
        self.require_task(user_id, task_id)
    }

    /// Complete the task and its whole descendant subtree. Returns the
    /// number of rows flipped.
    pub fn complete_task(&self, user_id: i64, task_id: i64) -> ServiceResult<usize> {
        self.cascade_status(user_id, task_id, TaskStatus::Completed)
    }

    /// Reopen the task and its whole descendant subtree.
    pub fn uncomplete_task(&self, user_id: i64, task_id: i64) -> ServiceResult<usize> {
        self.cascade_status(user_id, task_id, TaskStatus::Pending)
    }

    fn cascade_status(
        &self,
        user_id: i64,
        task_id: i64,
        status: TaskStatus,
    ) -> ServiceResult<usize> {
        let all = self.db.with_conn(|conn| db::tasks::list_all(conn, user_id))?;
        if !all.iter().any(|t| t.id == task_id) {
            return Err(ServiceError::task_not_found(task_id));
        }

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for task in &all {
            if let Some(pid) = task.parent_id {
                children.entry(pid).or_default().push(task.id);
            }
        }
        let mut ids = vec![task_id];
        let mut seen: HashSet<i64> = ids.iter().copied().collect();
        let mut cursor = 0;
        while cursor < ids.len() {
            let id = ids[cursor];
            cursor += 1;
            for &cid in children.get(&id).into_iter().flatten() {
                if seen.insert(cid) {
                    ids.push(cid);
                }
            }
        }

        // One transaction: the subtree flips together or not at all.
        let completed_at = (status == TaskStatus::Completed).then(db::now_ms);
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            db::tasks::set_status_many(&tx, user_id, &ids, status, completed_at)?;
            tx.commit()?;
            Ok(())
        })?;
        info!(task_id, count = ids.len(), status = status.as_str(), "status cascade");
        Ok(ids.len())
    }

    pub fn delete_task(&self, user_id: i64, task_id: i64) -> ServiceResult<()> {
        let deleted = self
            .db
            .with_conn(|conn| db::tasks::delete_task(conn, user_id, task_id))?;
        if !deleted {
            return Err(ServiceError::task_not_found(task_id));
        }
        info!(task_id, "task deleted");
        Ok(())
    }

    /// Hide the task from listings for a duration like `30m`, `2h`, `1d`
    /// or `1w`. Returns the hide_until timestamp.
    pub fn hide_task(&self, user_id: i64, task_id: i64, duration: &str) -> ServiceResult<i64> {
        let millis = parse_duration_ms(duration)
            .ok_or_else(|| ServiceError::invalid_value("duration", "expected Nm, Nh, Nd or Nw"))?;
        let hide_until = db::now_ms() + millis;
        let found = self
            .db
            .with_conn(|conn| db::tasks::set_hide_until(conn, user_id, task_id, Some(hide_until)))?;
        if !found {
            return Err(ServiceError::task_not_found(task_id));
        }
        Ok(hide_until)
    }

    pub fn clear_suggestions(&self, user_id: i64, task_id: i64) -> ServiceResult<()> {
        let found = self
            .db
            .with_conn(|conn| db::tasks::set_suggestion_blob(conn, user_id, task_id, None))?;
        if !found {
            return Err(ServiceError::task_not_found(task_id));
        }
        Ok(())
    }

    /// Remove every suggestion item matching `text`. Removing an absent
    /// item succeeds.
    pub fn remove_suggestion_item(
        &self,
        user_id: i64,
        task_id: i64,
        text: &str,
    ) -> ServiceResult<()> {
        let task = self.require_task(user_id, task_id)?;
        let list = suggestion::remove_item(task.suggestions, text);
        self.persist_suggestions(user_id, task_id, &list)
    }

    /// Toggle done on every matching item. Returns whether anything changed.
    pub fn toggle_suggestion_item(
        &self,
        user_id: i64,
        task_id: i64,
        text: &str,
    ) -> ServiceResult<bool> {
        let task = self.require_task(user_id, task_id)?;
        let (list, changed) = suggestion::toggle_item(task.suggestions, text);
        if changed {
            self.persist_suggestions(user_id, task_id, &list)?;
        }
        Ok(changed)
    }

    /// Rewrite the first matching item. Returns whether anything changed.
    pub fn edit_suggestion_item(
        &self,
        user_id: i64,
        task_id: i64,
        old: &str,
        new: &str,
        new_time: Option<&str>,
    ) -> ServiceResult<bool> {
        let task = self.require_task(user_id, task_id)?;
        let (list, changed) = suggestion::edit_first_item(task.suggestions, old, new, new_time);
        if changed {
            self.persist_suggestions(user_id, task_id, &list)?;
        }
        Ok(changed)
    }

    pub fn add_tag(&self, user_id: i64, task_id: i64, name: &str) -> ServiceResult<Vec<Tag>> {
        self.require_task(user_id, task_id)?;
        let cleaned = crate::tags::clean_tag_name(name)
            .ok_or_else(|| ServiceError::invalid_value("tag", "tag name is empty"))?;
        Ok(self.db.with_conn(|conn| {
            let tag_id = db::tags::get_or_create_tag(conn, user_id, &cleaned)?;
            db::tags::link_tag(conn, task_id, tag_id)?;
            db::tags::tags_for_task(conn, task_id)
        })?)
    }

    /// Unlink a tag from a task. Unlinking an absent link succeeds.
    pub fn remove_tag(&self, user_id: i64, task_id: i64, tag_id: i64) -> ServiceResult<Vec<Tag>> {
        self.require_task(user_id, task_id)?;
        Ok(self.db.with_conn(|conn| {
            db::tags::unlink_tag(conn, task_id, tag_id)?;
            db::tags::tags_for_task(conn, task_id)
        })?)
    }

    /// The branch containing `task_id`, serialized for external use.
    pub fn export_branch(&self, user_id: i64, task_id: i64) -> ServiceResult<BranchNode> {
        let all = self.db.with_conn(|conn| db::tasks::list_all(conn, user_id))?;
        export::branch_context(task_id, &all)
    }

    pub fn get_task(&self, user_id: i64, task_id: i64) -> ServiceResult<Option<Task>> {
        Ok(self
            .db
            .with_conn(|conn| db::tasks::get_task(conn, user_id, task_id))?)
    }

    fn require_task(&self, user_id: i64, task_id: i64) -> ServiceResult<Task> {
        self.get_task(user_id, task_id)?
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    fn persist_suggestions(
        &self,
        user_id: i64,
        task_id: i64,
        list: &[crate::suggestion::SuggestionItem],
    ) -> ServiceResult<()> {
        let blob = if list.is_empty() {
            None
        } else {
            Some(suggestion::encode_list(list))
        };
        self.db.with_conn(|conn| {
            db::tasks::set_suggestion_blob(conn, user_id, task_id, blob.as_deref())
        })?;
        Ok(())
    }
}

/// Parse a hide duration: an integer count followed by m/h/d/w.
fn parse_duration_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    // Split on the char boundary, not the byte: the unit may be multibyte.
    let (unit_at, unit) = raw.char_indices().last()?;
    let count: i64 = raw[..unit_at].trim().parse().ok()?;
    if count <= 0 {
        return None;
    }
    let minute = 60_000;
    let per_unit = match unit {
        'm' => minute,
        'h' => 60 * minute,
        'd' => 24 * 60 * minute,
        'w' => 7 * 24 * 60 * minute,
        _ => return None,
    };
    Some(count * per_unit)
}

/// Parse a due value: epoch milliseconds, `YYYY-MM-DD` (local midnight) or
/// `YYYY-MM-DD HH:MM` (also with a `T` separator).
pub fn parse_due(raw: &str) -> Option<i64> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    let normalized = raw.replace(' ', "T");
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M") {
        return dt
            .and_local_timezone(Local)
            .earliest()
            .map(|dt| dt.timestamp_millis());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)?
            .and_local_timezone(Local)
            .earliest()
            .map(|dt| dt.timestamp_millis());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_duration_ms("30m"), Some(30 * 60_000));
        assert_eq!(parse_duration_ms("2h"), Some(2 * 60 * 60_000));
        assert_eq!(parse_duration_ms("1d"), Some(24 * 60 * 60_000));
        assert_eq!(parse_duration_ms("1w"), Some(7 * 24 * 60 * 60_000));
        assert_eq!(parse_duration_ms("0m"), None);
        assert_eq!(parse_duration_ms("-5m"), None);
        assert_eq!(parse_duration_ms("soon"), None);
        assert_eq!(parse_duration_ms(""), None);
    }

    #[test]
    fn duration_with_multibyte_unit_is_rejected() {
        // Cyrillic м; the unit is one char but two bytes.
        assert_eq!(parse_duration_ms("30м"), None);
        assert_eq!(parse_duration_ms("м"), None);
        assert_eq!(parse_duration_ms("30µs"), None);
    }

    #[test]
    fn due_parsing() {
        assert_eq!(parse_due("1700000000000"), Some(1_700_000_000_000));
        assert!(parse_due("2026-09-01").is_some());
        assert!(parse_due("2026-09-01 14:30").is_some());
        assert!(parse_due("2026-09-01T14:30").is_some());
        assert_eq!(parse_due("whenever"), None);
    }
}
