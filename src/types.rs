//! Core types for the task forest engine.

use crate::suggestion::SuggestionItem;
use serde::{Deserialize, Serialize};

/// A CLI profile owning a set of tasks and tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// Task status. Everything that is not completed counts as pending work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Pending,
        }
    }
}

/// The three canonical importance buckets used by the stats panel.
pub const IMPORTANCE_LEVELS: [&str; 3] = ["Important", "Medium", "Normal"];

/// Normalize a stored importance value: absent or empty means "Normal".
pub fn normalize_importance(importance: Option<&str>) -> &str {
    match importance {
        Some(s) if !s.is_empty() => s,
        _ => "Normal",
    }
}

/// A tag in the per-user registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A task record as fetched from storage, tags attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub parent_id: Option<i64>,
    /// Own estimated time in minutes (not including children).
    pub time_minutes: i64,
    pub importance: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub hide_until: Option<i64>,
    pub created_at: i64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Decoded suggestion list; empty when the provider never ran.
    #[serde(default)]
    pub suggestions: Vec<SuggestionItem>,
}

impl Task {
    /// The importance label after absent/empty normalization.
    pub fn importance_label(&self) -> &str {
        normalize_importance(self.importance.as_deref())
    }
}

/// A task with its children, as assembled by the tree builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    #[serde(flatten)]
    pub task: Task,
    /// Sum of non-completed own-times across this task and its subtree.
    pub branch_total: i64,
    pub children: Vec<TaskNode>,
}

/// Aggregate time statistics over a user's visible task set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStats {
    /// Total pending minutes across all non-completed tasks.
    pub total_minutes: i64,
    /// Pending minutes bucketed by inherited importance.
    pub importance_summary: Vec<(String, i64)>,
    /// Pending minutes bucketed by inherited tag, sorted by time descending.
    pub tag_summary: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        assert_eq!(TaskStatus::from_str("completed"), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_str("pending"), TaskStatus::Pending);
        // Unknown values degrade to pending rather than failing
        assert_eq!(TaskStatus::from_str("archived"), TaskStatus::Pending);
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn importance_normalization() {
        assert_eq!(normalize_importance(None), "Normal");
        assert_eq!(normalize_importance(Some("")), "Normal");
        assert_eq!(normalize_importance(Some("Important")), "Important");
    }
}
