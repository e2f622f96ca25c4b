//! Journal entry storage.
//!
//! Entries are stored as written and are only visible to their owner. Deleting
//! an entry cascades to its episodic summary through the foreign key.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{get_timestamp, timestamp};
use crate::error::{EngineError, EngineResult};
use crate::memory::audit::{actions, write_audit_log};
use crate::memory::types::EntityType;

pub const MAX_CONTENT_CHARS: usize = 4000;

const ENTRY_COLUMNS: &str = "id, user_id, content, created_at, updated_at";

/// A raw daily note.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trim and bound-check entry content.
pub fn validate_content(content: &str) -> EngineResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation("journal content must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(EngineError::Validation(format!(
            "journal content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

pub fn create_entry(
    conn: &mut Connection,
    user_id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> EngineResult<JournalEntry> {
    let content = validate_content(content)?;
    let id = uuid::Uuid::now_v7().to_string();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO journal_entries (id, user_id, content, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, user_id, content, timestamp(&now)],
    )?;
    write_audit_log(
        &tx,
        user_id,
        actions::JOURNAL_CREATED,
        EntityType::JournalEntry,
        Some(&id),
        Some(&serde_json::json!({ "length": content.chars().count() })),
        now,
    )?;
    tx.commit()?;

    tracing::info!(journal_entry_id = %id, "journal entry created");

    Ok(JournalEntry {
        id,
        user_id: user_id.to_string(),
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        created_at: get_timestamp(row, 3)?,
        updated_at: get_timestamp(row, 4)?,
    })
}

pub fn get_entry(conn: &Connection, user_id: &str, id: &str) -> EngineResult<Option<JournalEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Newest first.
pub fn list_entries(conn: &Connection, user_id: &str) -> EngineResult<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE user_id = ?1 \
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![user_id], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Creation time of the user's most recent entry.
pub fn latest_entry_at(conn: &Connection, user_id: &str) -> EngineResult<Option<DateTime<Utc>>> {
    let latest = conn
        .query_row(
            "SELECT created_at FROM journal_entries WHERE user_id = ?1 \
             ORDER BY created_at DESC LIMIT 1",
            params![user_id],
            |row| get_timestamp(row, 0),
        )
        .optional()?;
    Ok(latest)
}

/// Replace an entry's content. `None` when the entry is missing or not owned.
pub fn update_entry(
    conn: &mut Connection,
    user_id: &str,
    id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> EngineResult<Option<JournalEntry>> {
    let content = validate_content(content)?;

    let tx = conn.transaction()?;
    let updated = tx
        .query_row(
            &format!(
                "UPDATE journal_entries SET content = ?1, updated_at = ?2 \
                 WHERE id = ?3 AND user_id = ?4 RETURNING {ENTRY_COLUMNS}"
            ),
            params![content, timestamp(&now), id, user_id],
            entry_from_row,
        )
        .optional()?;

    let Some(entry) = updated else {
        return Ok(None);
    };

    write_audit_log(
        &tx,
        user_id,
        actions::JOURNAL_UPDATED,
        EntityType::JournalEntry,
        Some(id),
        Some(&serde_json::json!({ "length": content.chars().count() })),
        now,
    )?;
    tx.commit()?;

    Ok(Some(entry))
}

/// Delete an entry and, by cascade, its summary. `false` on ownership miss.
pub fn delete_entry(
    conn: &mut Connection,
    user_id: &str,
    id: &str,
    now: DateTime<Utc>,
) -> EngineResult<bool> {
    let tx = conn.transaction()?;
    let affected = tx.execute(
        "DELETE FROM journal_entries WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if affected == 0 {
        return Ok(false);
    }

    write_audit_log(
        &tx,
        user_id,
        actions::JOURNAL_DELETED,
        EntityType::JournalEntry,
        Some(id),
        None,
        now,
    )?;
    tx.commit()?;

    tracing::info!(journal_entry_id = %id, "journal entry deleted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn content_is_trimmed_and_bounded() {
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
        assert!(validate_content(" \n ").is_err());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_CHARS)).is_ok());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_CHARS + 1)).is_err());
    }

    #[test]
    fn create_list_and_latest() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let now = Utc::now();
        create_entry(&mut conn, "u1", "first", now - Duration::days(2)).unwrap();
        let second = create_entry(&mut conn, "u1", "second", now).unwrap();
        create_entry(&mut conn, "u2", "other", now).unwrap();

        let entries = list_entries(&conn, "u1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, second.id);
        assert_eq!(
            latest_entry_at(&conn, "u1").unwrap().map(|t| timestamp(&t)),
            Some(timestamp(&now))
        );
        assert!(latest_entry_at(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn update_and_delete_are_owner_scoped() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let now = Utc::now();
        let entry = create_entry(&mut conn, "u1", "draft", now).unwrap();

        assert!(update_entry(&mut conn, "u2", &entry.id, "hijack", now).unwrap().is_none());
        let updated = update_entry(&mut conn, "u1", &entry.id, " final ", now).unwrap().unwrap();
        assert_eq!(updated.content, "final");

        assert!(!delete_entry(&mut conn, "u2", &entry.id, now).unwrap());
        assert!(delete_entry(&mut conn, "u1", &entry.id, now).unwrap());
        assert!(get_entry(&conn, "u1", &entry.id).unwrap().is_none());
    }

    #[test]
    fn delete_cascades_to_summary() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let now = Utc::now();
        let entry = create_entry(&mut conn, "u1", "Need to rest.", now).unwrap();
        crate::memory::episodic::write_episodic_summary(&mut conn, "u1", &entry.id, &entry.content, now)
            .unwrap();

        delete_entry(&mut conn, "u1", &entry.id, now).unwrap();
        assert!(crate::memory::episodic::list_summaries(&conn, "u1").unwrap().is_empty());
    }
}
