//! The per-user tag registry and the task/tag junction table.

use super::now_ms;
use crate::tags::clean_tag_name;
use crate::types::Tag;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Look up or create the tag row for a cleaned name. Returns the tag id.
pub fn get_or_create_tag(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM tags WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO tags (user_id, name, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, name, now_ms()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Link a tag to a task. Re-linking an existing pair is a no-op.
pub fn link_tag(conn: &Connection, task_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES (?1, ?2)",
        params![task_id, tag_id],
    )?;
    Ok(())
}

/// Unlink a tag from a task. Absent links unlink successfully.
pub fn unlink_tag(conn: &Connection, task_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM task_tags WHERE task_id = ?1 AND tag_id = ?2",
        params![task_id, tag_id],
    )?;
    Ok(())
}

/// Clean each raw tag name, register it, and link it to the task. Names that
/// clean to nothing are skipped.
pub fn register_tags(conn: &Connection, user_id: i64, task_id: i64, raw_names: &[String]) -> Result<()> {
    for raw in raw_names {
        let Some(name) = clean_tag_name(raw) else {
            continue;
        };
        let tag_id = get_or_create_tag(conn, user_id, &name)?;
        link_tag(conn, task_id, tag_id)?;
    }
    Ok(())
}

pub fn tags_for_task(conn: &Connection, task_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name FROM tags t
         JOIN task_tags tt ON t.id = tt.tag_id
         WHERE tt.task_id = ?1
         ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map(params![task_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}
