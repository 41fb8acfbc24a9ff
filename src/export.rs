//! Branch export: the minimal tree slice handed to the suggestion provider.
//!
//! Starting from any task, walk up to the root of its branch, then serialize
//! the whole branch as nested `{id, title, subtasks}` records. The provider
//! sees structure and titles only; times, statuses and descriptions stay
//! local.

use crate::error::{ServiceError, ServiceResult};
use crate::types::Task;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BranchNode {
    pub id: i64,
    pub title: String,
    pub subtasks: Vec<BranchNode>,
}

impl BranchNode {
    /// Render the branch as JSON text for the provider prompt.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Build the branch containing `task_id` from a flat task list.
pub fn branch_context(task_id: i64, tasks: &[Task]) -> ServiceResult<BranchNode> {
    let by_id: HashMap<i64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let start = by_id
        .get(&task_id)
        .ok_or_else(|| ServiceError::task_not_found(task_id))?;

    // Walk up to the branch root. Visited set terminates parent cycles; the
    // last task seen before the guard trips becomes the root.
    let mut visited = HashSet::new();
    let mut root = *start;
    visited.insert(root.id);
    while let Some(pid) = root.parent_id {
        let Some(parent) = by_id.get(&pid) else { break };
        if !visited.insert(pid) {
            break;
        }
        root = parent;
    }

    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for task in tasks {
        if let Some(pid) = task.parent_id {
            children.entry(pid).or_default().push(task.id);
        }
    }

    let mut serialized = HashSet::new();
    Ok(serialize(root.id, &by_id, &children, &mut serialized)
        .ok_or_else(|| ServiceError::task_not_found(task_id))?)
}

fn serialize(
    id: i64,
    by_id: &HashMap<i64, &Task>,
    children: &HashMap<i64, Vec<i64>>,
    visited: &mut HashSet<i64>,
) -> Option<BranchNode> {
    if !visited.insert(id) {
        return None;
    }
    let task = by_id.get(&id)?;
    let subtasks = children
        .get(&id)
        .map(|kids| {
            kids.iter()
                .filter_map(|&cid| serialize(cid, by_id, children, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(BranchNode {
        id,
        title: task.title.clone(),
        subtasks,
    })
}
