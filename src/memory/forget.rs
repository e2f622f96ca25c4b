//! Memory deletion.
//!
//! Episodic summaries are hard-deleted; preferences are revoked (soft delete)
//! so the consent record survives. Ownership misses return `false`, not an error.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::timestamp;
use crate::error::EngineResult;
use crate::memory::audit::{actions, write_audit_log};
use crate::memory::types::{EntityType, MemoryType};

/// Counts returned by [`delete_all_memories`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResult {
    pub episodic_deleted: usize,
    pub preferences_revoked: usize,
}

/// Delete one memory owned by `user_id`.
///
/// Returns `false` without side effects when the record does not exist, belongs
/// to someone else, or (for preferences) is already revoked.
pub fn delete_memory(
    conn: &mut Connection,
    user_id: &str,
    memory_type: MemoryType,
    id: &str,
    now: DateTime<Utc>,
) -> EngineResult<bool> {
    let tx = conn.transaction()?;

    let affected = match memory_type {
        MemoryType::Episodic => tx.execute(
            "DELETE FROM episodic_summaries WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?,
        MemoryType::Preference => tx.execute(
            "UPDATE preference_memories SET revoked_at = ?1, updated_at = ?1 \
             WHERE id = ?2 AND user_id = ?3 AND revoked_at IS NULL",
            params![timestamp(&now), id, user_id],
        )?,
    };

    if affected == 0 {
        return Ok(false);
    }

    write_audit_log(
        &tx,
        user_id,
        actions::MEMORY_DELETED,
        memory_type.entity_type(),
        Some(id),
        Some(&serde_json::json!({ "memoryType": memory_type.as_str() })),
        now,
    )?;
    tx.commit()?;

    tracing::info!(memory_id = %id, memory_type = %memory_type, "memory deleted");
    Ok(true)
}

/// Delete every episodic summary and revoke every active preference for a user.
pub fn delete_all_memories(
    conn: &mut Connection,
    user_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<DeleteAllResult> {
    let tx = conn.transaction()?;

    let episodic_deleted = tx.execute(
        "DELETE FROM episodic_summaries WHERE user_id = ?1",
        params![user_id],
    )?;
    let preferences_revoked = tx.execute(
        "UPDATE preference_memories SET revoked_at = ?1, updated_at = ?1 \
         WHERE user_id = ?2 AND revoked_at IS NULL",
        params![timestamp(&now), user_id],
    )?;

    let result = DeleteAllResult {
        episodic_deleted,
        preferences_revoked,
    };

    write_audit_log(
        &tx,
        user_id,
        actions::MEMORY_DELETED_ALL,
        EntityType::EpisodicSummary,
        None,
        Some(&serde_json::to_value(result)?),
        now,
    )?;
    tx.commit()?;

    tracing::info!(episodic_deleted, preferences_revoked, "all memories deleted");
    Ok(result)
}
