//! Task row CRUD.
//!
//! Rows come back as `Task` records with the suggestion blob already decoded
//! and tags attached from the junction table. Ownership is enforced here:
//! every statement is scoped by `user_id`.

use crate::suggestion::{decode_list, encode_list};
use crate::types::{Tag, Task, TaskStatus};
use anyhow::Result;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;

/// Column values for a new task row.
#[derive(Debug, Clone, Default)]
pub struct InsertTask {
    pub title: String,
    pub parent_id: Option<i64>,
    pub time_minutes: i64,
    pub importance: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<i64>,
    pub ai_suggestion: Option<String>,
    pub created_at: i64,
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let ai_suggestion: Option<String> = row.get("ai_suggestion")?;
    Ok(Task {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        status: TaskStatus::from_str(&status),
        parent_id: row.get("parent_id")?,
        time_minutes: row.get("time_minutes")?,
        importance: row.get("importance")?,
        description: row.get("description")?,
        due_at: row.get("due_at")?,
        completed_at: row.get("completed_at")?,
        hide_until: row.get("hide_until")?,
        created_at: row.get("created_at")?,
        tags: Vec::new(),
        suggestions: decode_list(ai_suggestion.as_deref()),
    })
}

pub fn insert_task(conn: &Connection, user_id: i64, task: &InsertTask) -> Result<i64> {
    conn.execute(
        "INSERT INTO tasks (user_id, title, parent_id, time_minutes, importance,
                            description, due_at, ai_suggestion, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user_id,
            task.title,
            task.parent_id,
            task.time_minutes,
            task.importance,
            task.description,
            task.due_at,
            task.ai_suggestion,
            task.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch one task with its tags, or None.
pub fn get_task(conn: &Connection, user_id: i64, task_id: i64) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2")?;
    let result = stmt.query_row(params![task_id, user_id], parse_task_row);
    match result {
        Ok(mut task) => {
            task.tags = super::tags::tags_for_task(conn, task_id)?;
            Ok(Some(task))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Every task of the user, hidden ones included, in the canonical order:
/// completed rows last, then by creation time.
pub fn list_all(conn: &Connection, user_id: i64) -> Result<Vec<Task>> {
    list_where(conn, user_id, None)
}

/// Tasks whose hide window has passed (or was never set).
pub fn list_visible(conn: &Connection, user_id: i64, now: i64) -> Result<Vec<Task>> {
    list_where(conn, user_id, Some(now))
}

fn list_where(conn: &Connection, user_id: i64, visible_at: Option<i64>) -> Result<Vec<Task>> {
    let order = "ORDER BY CASE WHEN status = 'completed' THEN 1 ELSE 0 END, created_at, id";
    let mut tasks = match visible_at {
        Some(now) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT * FROM tasks
                 WHERE user_id = ?1 AND (hide_until IS NULL OR hide_until <= ?2) {order}"
            ))?;
            let rows = stmt.query_map(params![user_id, now], parse_task_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT * FROM tasks WHERE user_id = ?1 {order}"))?;
            let rows = stmt.query_map(params![user_id], parse_task_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };
    attach_tags(conn, user_id, &mut tasks)?;
    Ok(tasks)
}

fn attach_tags(conn: &Connection, user_id: i64, tasks: &mut [Task]) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT tt.task_id, t.id, t.name FROM tags t
         JOIN task_tags tt ON t.id = tt.tag_id
         WHERE t.user_id = ?1
         ORDER BY t.name",
    )?;
    let mut by_task: HashMap<i64, Vec<Tag>> = HashMap::new();
    let rows = stmt.query_map(params![user_id], |row| {
        let task_id: i64 = row.get(0)?;
        Ok((
            task_id,
            Tag {
                id: row.get(1)?,
                name: row.get(2)?,
            },
        ))
    })?;
    for row in rows {
        let (task_id, tag) = row?;
        by_task.entry(task_id).or_default().push(tag);
    }
    for task in tasks {
        if let Some(tags) = by_task.remove(&task.id) {
            task.tags = tags;
        }
    }
    Ok(())
}

/// Persist every mutable column of a previously loaded task. Returns false
/// when the row no longer exists.
pub fn save_task(conn: &Connection, task: &Task) -> Result<bool> {
    let blob = if task.suggestions.is_empty() {
        None
    } else {
        Some(encode_list(&task.suggestions))
    };
    let n = conn.execute(
        "UPDATE tasks SET title = ?1, status = ?2, parent_id = ?3, time_minutes = ?4,
                          importance = ?5, description = ?6, due_at = ?7,
                          completed_at = ?8, hide_until = ?9, ai_suggestion = ?10
         WHERE id = ?11 AND user_id = ?12",
        params![
            task.title,
            task.status.as_str(),
            task.parent_id,
            task.time_minutes,
            task.importance,
            task.description,
            task.due_at,
            task.completed_at,
            task.hide_until,
            blob,
            task.id,
            task.user_id,
        ],
    )?;
    Ok(n > 0)
}

/// Flip status on a set of rows, stamping or clearing completed_at in the
/// same statement.
pub fn set_status_many(
    conn: &Connection,
    user_id: i64,
    ids: &[i64],
    status: TaskStatus,
    completed_at: Option<i64>,
) -> Result<()> {
    for &id in ids {
        conn.execute(
            "UPDATE tasks SET status = ?1, completed_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![status.as_str(), completed_at, id, user_id],
        )?;
    }
    Ok(())
}

/// Delete one row; descendants go with it via ON DELETE CASCADE.
pub fn delete_task(conn: &Connection, user_id: i64, task_id: i64) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
        params![task_id, user_id],
    )?;
    Ok(n > 0)
}

pub fn set_hide_until(
    conn: &Connection,
    user_id: i64,
    task_id: i64,
    hide_until: Option<i64>,
) -> Result<bool> {
    let n = conn.execute(
        "UPDATE tasks SET hide_until = ?1 WHERE id = ?2 AND user_id = ?3",
        params![hide_until, task_id, user_id],
    )?;
    Ok(n > 0)
}

pub fn set_suggestion_blob(
    conn: &Connection,
    user_id: i64,
    task_id: i64,
    blob: Option<&str>,
) -> Result<bool> {
    let n = conn.execute(
        "UPDATE tasks SET ai_suggestion = ?1 WHERE id = ?2 AND user_id = ?3",
        params![blob, task_id, user_id],
    )?;
    Ok(n > 0)
}
