//! Time statistics over a user's task set.
//!
//! Each pending task's own minutes are charged to every importance and tag
//! found on the task itself or any of its ancestors, so a subtask under a
//! `#work` parent counts as work time even without its own tag.

use crate::types::{Task, TaskStats, IMPORTANCE_LEVELS};
use std::collections::{HashMap, HashSet};

pub fn summarize(tasks: &[Task]) -> TaskStats {
    let by_id: HashMap<i64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();

    let mut total_minutes = 0;
    let mut importance_summary: Vec<(String, i64)> = IMPORTANCE_LEVELS
        .iter()
        .map(|level| (level.to_string(), 0))
        .collect();
    let mut tag_summary: Vec<(String, i64)> = Vec::new();

    for task in tasks {
        if task.status == crate::types::TaskStatus::Completed {
            continue;
        }
        let own = task.time_minutes;
        total_minutes += own;

        let (importances, tag_names) = heritage(task, &by_id);
        for imp in &importances {
            bump(&mut importance_summary, imp, own);
        }
        for tag in &tag_names {
            bump(&mut tag_summary, tag, own);
        }
    }

    tag_summary.sort_by(|a, b| b.1.cmp(&a.1));

    TaskStats {
        total_minutes,
        importance_summary,
        tag_summary,
    }
}

/// Collect the importances and tag names active for a task: its own plus
/// every ancestor's, deduplicated. An empty importance heritage defaults to
/// "Normal". The upward walk is cycle-guarded.
fn heritage(task: &Task, by_id: &HashMap<i64, &Task>) -> (Vec<String>, Vec<String>) {
    let mut importances: Vec<String> = Vec::new();
    let mut tag_names: Vec<String> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();

    let mut curr = Some(task);
    while let Some(t) = curr {
        if !seen.insert(t.id) {
            break;
        }
        if let Some(imp) = t.importance.as_deref() {
            if !imp.is_empty() && !importances.iter().any(|i| i == imp) {
                importances.push(imp.to_string());
            }
        }
        for tag in &t.tags {
            if !tag.name.is_empty() && !tag_names.iter().any(|n| n == &tag.name) {
                tag_names.push(tag.name.clone());
            }
        }
        curr = t.parent_id.and_then(|pid| by_id.get(&pid).copied());
    }

    if importances.is_empty() {
        importances.push("Normal".to_string());
    }
    (importances, tag_names)
}

fn bump(summary: &mut Vec<(String, i64)>, key: &str, minutes: i64) {
    match summary.iter_mut().find(|(k, _)| k == key) {
        Some((_, total)) => *total += minutes,
        None => summary.push((key.to_string(), minutes)),
    }
}
