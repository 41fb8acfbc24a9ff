//! Assembles flat task rows into a forest with cached branch totals.

use crate::types::{Task, TaskNode, TaskStatus};
use std::collections::{HashMap, HashSet};

/// Build the forest from a flat, ordered task list.
///
/// Roots keep the input order. A task whose parent_id points outside the
/// list (filtered out, hidden, or deleted) is promoted to a root rather
/// than dropped. Nodes that are only reachable through a parent cycle are
/// unreachable from any root and are omitted.
pub fn build_forest(tasks: Vec<Task>) -> Vec<TaskNode> {
    let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    let mut by_id: HashMap<i64, Task> = tasks.into_iter().map(|t| (t.id, t)).collect();

    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut roots: Vec<i64> = Vec::new();
    for &id in &ids {
        let parent = by_id[&id].parent_id;
        match parent {
            Some(pid) if pid != id && by_id.contains_key(&pid) => {
                children.entry(pid).or_default().push(id);
            }
            _ => roots.push(id),
        }
    }

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .filter_map(|id| build_node(id, &mut by_id, &children, &mut visited))
        .collect()
}

fn build_node(
    id: i64,
    by_id: &mut HashMap<i64, Task>,
    children: &HashMap<i64, Vec<i64>>,
    visited: &mut HashSet<i64>,
) -> Option<TaskNode> {
    if !visited.insert(id) {
        return None;
    }
    let task = by_id.remove(&id)?;
    let child_nodes: Vec<TaskNode> = children
        .get(&id)
        .map(|kids| {
            kids.iter()
                .filter_map(|&cid| build_node(cid, by_id, children, visited))
                .collect()
        })
        .unwrap_or_default();

    let own = if task.status == TaskStatus::Completed {
        0
    } else {
        task.time_minutes
    };
    let branch_total = own + child_nodes.iter().map(|c| c.branch_total).sum::<i64>();

    Some(TaskNode {
        task,
        branch_total,
        children: child_nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, parent_id: Option<i64>, time: i64, status: TaskStatus) -> Task {
        Task {
            id,
            user_id: 1,
            title: format!("task {id}"),
            status,
            parent_id,
            time_minutes: time,
            importance: None,
            description: None,
            due_at: None,
            completed_at: None,
            hide_until: None,
            created_at: 0,
            tags: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    #[test]
    fn nests_children_and_sums_branch_totals() {
        let forest = build_forest(vec![
            task(1, None, 10, TaskStatus::Pending),
            task(2, Some(1), 5, TaskStatus::Pending),
            task(3, Some(2), 20, TaskStatus::Pending),
            task(4, None, 7, TaskStatus::Pending),
        ]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].task.id, 1);
        assert_eq!(forest[0].branch_total, 35);
        assert_eq!(forest[0].children[0].task.id, 2);
        assert_eq!(forest[0].children[0].branch_total, 25);
        assert_eq!(forest[1].branch_total, 7);
    }

    #[test]
    fn completed_tasks_contribute_zero_but_children_still_count() {
        let forest = build_forest(vec![
            task(1, None, 10, TaskStatus::Completed),
            task(2, Some(1), 5, TaskStatus::Pending),
        ]);
        assert_eq!(forest[0].branch_total, 5);
    }

    #[test]
    fn orphan_becomes_root_in_input_order() {
        let forest = build_forest(vec![
            task(2, Some(99), 5, TaskStatus::Pending),
            task(1, None, 10, TaskStatus::Pending),
        ]);
        let ids: Vec<i64> = forest.iter().map(|n| n.task.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn parent_cycle_does_not_loop() {
        let forest = build_forest(vec![
            task(1, Some(2), 5, TaskStatus::Pending),
            task(2, Some(1), 5, TaskStatus::Pending),
            task(3, None, 1, TaskStatus::Pending),
        ]);
        // The cycle pair has no root to hang from; the rest survives.
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].task.id, 3);
    }

    #[test]
    fn self_parent_is_promoted_to_root() {
        let forest = build_forest(vec![task(1, Some(1), 5, TaskStatus::Pending)]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].branch_total, 5);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_forest(Vec::new()).is_empty());
    }
}
