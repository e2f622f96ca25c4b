//! Append-only audit trail.
//!
//! Every memory mutation and scheduler decision lands here so the trust
//! surface can explain "why am I seeing this". Metadata is redacted before it
//! is written; rows are never updated or deleted.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{get_timestamp, timestamp};
use crate::error::EngineResult;
use crate::memory::types::EntityType;
use crate::redact::redact_json;

/// Action names written to `audit_log.action`.
pub mod actions {
    pub const JOURNAL_CREATED: &str = "journal.created";
    pub const JOURNAL_UPDATED: &str = "journal.updated";
    pub const JOURNAL_DELETED: &str = "journal.deleted";
    pub const EPISODIC_GENERATED: &str = "episodic_summary.generated";
    pub const MEMORY_DELETED: &str = "memory.deleted";
    pub const MEMORY_DELETED_ALL: &str = "memory.deleted_all";
    pub const CHECKIN_CREATED: &str = "checkin.created";
    pub const CHECKIN_DISMISSED: &str = "checkin.dismissed";
    pub const CHECKIN_SNOOZED: &str = "checkin.snoozed";
    pub const CHECKIN_DONE: &str = "checkin.done";
    pub const CHECKIN_SETTINGS_UPDATED: &str = "checkin.settings_updated";
}

/// One row of the audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Append an entry. `metadata` passes through [`redact_json`] first.
pub fn write_audit_log(
    conn: &Connection,
    user_id: &str,
    action: &str,
    entity_type: EntityType,
    entity_id: Option<&str>,
    metadata: Option<&serde_json::Value>,
    now: DateTime<Utc>,
) -> EngineResult<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let metadata_json = metadata.map(|m| redact_json(m).to_string());
    conn.execute(
        "INSERT INTO audit_log (id, user_id, action, entity_type, entity_id, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            user_id,
            action,
            entity_type.as_str(),
            entity_id,
            metadata_json,
            timestamp(&now),
        ],
    )?;
    Ok(id)
}

/// Most recent entries for a user, newest first, optionally narrowed to one entity type.
pub fn list_audit_log(
    conn: &Connection,
    user_id: &str,
    entity_type: Option<EntityType>,
    limit: usize,
) -> EngineResult<Vec<AuditLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, action, entity_type, entity_id, metadata, created_at \
         FROM audit_log \
         WHERE user_id = ?1 AND (?2 IS NULL OR entity_type = ?2) \
         ORDER BY created_at DESC, id DESC \
         LIMIT ?3",
    )?;

    let entries = stmt
        .query_map(
            params![user_id, entity_type.map(|t| t.as_str()), limit as i64],
            |row| {
                let metadata: Option<String> = row.get(5)?;
                Ok(AuditLogEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    action: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
                    created_at: get_timestamp(row, 6)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Number of audit rows for a user.
pub fn count_audit_log(conn: &Connection, user_id: &str) -> EngineResult<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM audit_log WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn metadata_is_redacted_before_write() {
        let conn = crate::db::open_memory_database().unwrap();
        let now = Utc::now();
        write_audit_log(
            &conn,
            "u1",
            actions::MEMORY_DELETED,
            EntityType::PreferenceMemory,
            Some("p1"),
            Some(&serde_json::json!({"note": "mail a@b.com", "authToken": "abc"})),
            now,
        )
        .unwrap();

        let raw: String = conn
            .query_row("SELECT metadata FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert!(!raw.contains("a@b.com"));
        assert!(!raw.contains("abc"));
        assert!(raw.contains("[REDACTED:EMAIL]"));
    }

    #[test]
    fn list_is_newest_first_and_filters_by_entity() {
        let conn = crate::db::open_memory_database().unwrap();
        let base = Utc::now();
        write_audit_log(&conn, "u1", actions::CHECKIN_CREATED, EntityType::CheckInSuggestion, Some("c1"), None, base).unwrap();
        write_audit_log(&conn, "u1", actions::MEMORY_DELETED, EntityType::EpisodicSummary, Some("s1"), None, base + Duration::seconds(1)).unwrap();
        write_audit_log(&conn, "u1", actions::CHECKIN_DONE, EntityType::CheckInSuggestion, Some("c1"), None, base + Duration::seconds(2)).unwrap();
        write_audit_log(&conn, "u2", actions::CHECKIN_CREATED, EntityType::CheckInSuggestion, Some("c9"), None, base).unwrap();

        let all = list_audit_log(&conn, "u1", None, 20).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action, actions::CHECKIN_DONE);

        let checkins = list_audit_log(&conn, "u1", Some(EntityType::CheckInSuggestion), 20).unwrap();
        let actions: Vec<&str> = checkins.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec![actions::CHECKIN_DONE, actions::CHECKIN_CREATED]);

        assert_eq!(list_audit_log(&conn, "u1", None, 1).unwrap().len(), 1);
        assert_eq!(count_audit_log(&conn, "u2").unwrap(), 1);
    }
}
