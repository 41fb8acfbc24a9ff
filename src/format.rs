//! Human-readable rendering for the CLI. JSON output bypasses this module.

use crate::export::BranchNode;
use crate::types::{TaskNode, TaskStats, TaskStatus};

/// Render minutes as `45m` or `2h30m`.
pub fn fmt_minutes(minutes: i64) -> String {
    if minutes >= 60 {
        let h = minutes / 60;
        let m = minutes % 60;
        if m == 0 {
            format!("{h}h")
        } else {
            format!("{h}h{m:02}m")
        }
    } else {
        format!("{minutes}m")
    }
}

/// Render the forest with two-space indentation per depth level.
pub fn render_forest(forest: &[TaskNode]) -> String {
    let mut out = String::new();
    if forest.is_empty() {
        out.push_str("No tasks.\n");
        return out;
    }
    for node in forest {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &TaskNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let task = &node.task;
    let marker = match task.status {
        TaskStatus::Completed => "[x]",
        TaskStatus::Pending => "[ ]",
    };
    out.push_str(&format!("{indent}{marker} #{} {}", task.id, task.title));
    if task.time_minutes > 0 || node.branch_total != task.time_minutes {
        out.push_str(&format!(
            " ({}, branch {})",
            fmt_minutes(task.time_minutes),
            fmt_minutes(node.branch_total)
        ));
    }
    if let Some(importance) = &task.importance {
        if !importance.is_empty() {
            out.push_str(&format!(" !{importance}"));
        }
    }
    for tag in &task.tags {
        out.push_str(&format!(" #{}", tag.name));
    }
    out.push('\n');

    for item in &task.suggestions {
        let done = if item.is_done() { "x" } else { " " };
        out.push_str(&format!("{indent}    - [{done}] {}", item.text()));
        if item.time_minutes() > 0 {
            out.push_str(&format!(" ({})", fmt_minutes(item.time_minutes())));
        }
        out.push('\n');
    }

    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// The stats footer under a listing.
pub fn render_stats(stats: &TaskStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total pending: {}\n", fmt_minutes(stats.total_minutes)));
    for (level, minutes) in &stats.importance_summary {
        out.push_str(&format!("  {level}: {}\n", fmt_minutes(*minutes)));
    }
    if !stats.tag_summary.is_empty() {
        out.push_str("By tag:\n");
        for (tag, minutes) in &stats.tag_summary {
            out.push_str(&format!("  #{tag}: {}\n", fmt_minutes(*minutes)));
        }
    }
    out
}

/// Indented branch view for the `context` subcommand.
pub fn render_branch(branch: &BranchNode) -> String {
    let mut out = String::new();
    render_branch_node(branch, 0, &mut out);
    out
}

fn render_branch_node(node: &BranchNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{indent}#{} {}\n", node.id, node.title));
    for child in &node.subtasks {
        render_branch_node(child, depth + 1, out);
    }
}
