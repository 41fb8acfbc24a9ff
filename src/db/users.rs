//! User profiles. The CLI resolves its `--user` name here.

use super::{now_ms, Database};
use crate::types::User;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub fn get_or_create_user(db: &Database, name: &str) -> Result<User> {
    db.with_conn(|conn| get_or_create_user_internal(conn, name))
}

fn get_or_create_user_internal(conn: &Connection, name: &str) -> Result<User> {
    if let Some(user) = find_user(conn, name)? {
        return Ok(user);
    }
    let created_at = now_ms();
    conn.execute(
        "INSERT INTO users (name, created_at) VALUES (?1, ?2)",
        params![name, created_at],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        created_at,
    })
}

fn find_user(conn: &Connection, name: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, created_at FROM users WHERE name = ?1",
            params![name],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}
