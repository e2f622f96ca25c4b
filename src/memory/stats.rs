use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::EngineResult;

/// Per-user counts shown by `daybook stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub journal_entries: u64,
    pub episodic_summaries: u64,
    pub open_loops: u64,
    pub active_preferences: u64,
    pub revoked_preferences: u64,
    pub suggestions_by_status: BTreeMap<String, u64>,
    pub audit_entries: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_entry: Option<String>,
}

/// Compute memory statistics for one user.
///
/// `db_path` is used for file size calculation; pass None for in-memory databases.
pub fn memory_stats(
    conn: &Connection,
    user_id: &str,
    db_path: Option<&Path>,
) -> EngineResult<StatsResponse> {
    let count = |sql: &str| -> EngineResult<u64> {
        let n: i64 = conn.query_row(sql, params![user_id], |row| row.get(0))?;
        Ok(n as u64)
    };

    let journal_entries = count("SELECT COUNT(*) FROM journal_entries WHERE user_id = ?1")?;
    let episodic_summaries = count("SELECT COUNT(*) FROM episodic_summaries WHERE user_id = ?1")?;
    let open_loops = count(
        "SELECT COALESCE(SUM(json_array_length(open_loops)), 0) \
         FROM episodic_summaries WHERE user_id = ?1",
    )?;
    let active_preferences = count(
        "SELECT COUNT(*) FROM preference_memories WHERE user_id = ?1 AND revoked_at IS NULL",
    )?;
    let revoked_preferences = count(
        "SELECT COUNT(*) FROM preference_memories WHERE user_id = ?1 AND revoked_at IS NOT NULL",
    )?;
    let audit_entries = count("SELECT COUNT(*) FROM audit_log WHERE user_id = ?1")?;

    let mut suggestions_by_status: BTreeMap<String, u64> = ["pending", "snoozed", "dismissed", "done"]
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM checkin_suggestions WHERE user_id = ?1 GROUP BY status",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (status, n) in rows {
        suggestions_by_status.insert(status, n as u64);
    }

    let (oldest_entry, newest_entry): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM journal_entries WHERE user_id = ?1",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        journal_entries,
        episodic_summaries,
        open_loops,
        active_preferences,
        revoked_preferences,
        suggestions_by_status,
        audit_entries,
        db_size_bytes,
        oldest_entry,
        newest_entry,
    })
}
