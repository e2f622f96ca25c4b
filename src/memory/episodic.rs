//! Episodic summary write path.
//!
//! [`write_episodic_summary`] summarizes a journal entry, redacts the result and
//! upserts it as the entry's single summary row. A regeneration whose redacted
//! output equals the stored row writes nothing and audits nothing.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::Serialize;

use crate::db::{get_json, get_timestamp, timestamp};
use crate::error::EngineResult;
use crate::memory::audit::{actions, write_audit_log};
use crate::memory::summarize::{summarize, SummaryDraft};
use crate::memory::types::{EntityType, EpisodicSummary};
use crate::redact::redact_text;

pub const EPISODIC_WHY_SHOWN: &str =
    "Generated from your journal entry to provide continuity over time.";

const SUMMARY_COLUMNS: &str =
    "id, user_id, journal_entry_id, summary, topics, open_loops, why_shown, created_at, updated_at";

/// Result of an episodic write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodicWriteOutcome {
    pub summary: EpisodicSummary,
    /// `false` when the stored row already matched and nothing was written.
    pub changed: bool,
}

/// Summarize → redact → compare → upsert → audit, in one transaction.
pub fn write_episodic_summary(
    conn: &mut Connection,
    user_id: &str,
    journal_entry_id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> EngineResult<EpisodicWriteOutcome> {
    let draft = redact_draft(summarize(content));

    let tx = conn.transaction()?;

    let existing = tx
        .query_row(
            &format!(
                "SELECT {SUMMARY_COLUMNS} FROM episodic_summaries \
                 WHERE journal_entry_id = ?1 AND user_id = ?2"
            ),
            params![journal_entry_id, user_id],
            summary_from_row,
        )
        .optional()?;

    if let Some(existing) = &existing {
        if existing.summary == draft.summary
            && existing.topics == draft.topics
            && existing.open_loops == draft.open_loops
        {
            tracing::debug!(journal_entry_id, "episodic summary unchanged");
            return Ok(EpisodicWriteOutcome {
                summary: existing.clone(),
                changed: false,
            });
        }
    }

    let summary = match existing {
        Some(existing) => update_summary(&tx, existing, &draft, now)?,
        None => insert_summary(&tx, user_id, journal_entry_id, &draft, now)?,
    };

    write_audit_log(
        &tx,
        user_id,
        actions::EPISODIC_GENERATED,
        EntityType::EpisodicSummary,
        Some(&summary.id),
        Some(&serde_json::json!({
            "journalEntryId": journal_entry_id,
            "topicCount": summary.topics.len(),
            "openLoopCount": summary.open_loops.len(),
        })),
        now,
    )?;

    tx.commit()?;

    tracing::info!(
        summary_id = %summary.id,
        topics = summary.topics.len(),
        open_loops = summary.open_loops.len(),
        "episodic_summary.generated"
    );

    Ok(EpisodicWriteOutcome {
        summary,
        changed: true,
    })
}

/// Topics are fixed labels; only free text needs scrubbing.
fn redact_draft(draft: SummaryDraft) -> SummaryDraft {
    SummaryDraft {
        summary: redact_text(&draft.summary),
        topics: draft.topics,
        open_loops: draft.open_loops.iter().map(|l| redact_text(l)).collect(),
    }
}

fn insert_summary(
    tx: &Transaction,
    user_id: &str,
    journal_entry_id: &str,
    draft: &SummaryDraft,
    now: DateTime<Utc>,
) -> EngineResult<EpisodicSummary> {
    let id = uuid::Uuid::now_v7().to_string();
    tx.execute(
        "INSERT INTO episodic_summaries \
         (id, user_id, journal_entry_id, summary, topics, open_loops, why_shown, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            user_id,
            journal_entry_id,
            draft.summary,
            serde_json::to_string(&draft.topics)?,
            serde_json::to_string(&draft.open_loops)?,
            EPISODIC_WHY_SHOWN,
            timestamp(&now),
        ],
    )?;

    Ok(EpisodicSummary {
        id,
        user_id: user_id.to_string(),
        journal_entry_id: journal_entry_id.to_string(),
        summary: draft.summary.clone(),
        topics: draft.topics.clone(),
        open_loops: draft.open_loops.clone(),
        why_shown: EPISODIC_WHY_SHOWN.to_string(),
        created_at: now,
        updated_at: now,
    })
}

fn update_summary(
    tx: &Transaction,
    existing: EpisodicSummary,
    draft: &SummaryDraft,
    now: DateTime<Utc>,
) -> EngineResult<EpisodicSummary> {
    tx.execute(
        "UPDATE episodic_summaries SET summary = ?1, topics = ?2, open_loops = ?3, updated_at = ?4 \
         WHERE id = ?5",
        params![
            draft.summary,
            serde_json::to_string(&draft.topics)?,
            serde_json::to_string(&draft.open_loops)?,
            timestamp(&now),
            existing.id,
        ],
    )?;

    Ok(EpisodicSummary {
        summary: draft.summary.clone(),
        topics: draft.topics.clone(),
        open_loops: draft.open_loops.clone(),
        updated_at: now,
        ..existing
    })
}

pub(crate) fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<EpisodicSummary> {
    Ok(EpisodicSummary {
        id: row.get(0)?,
        user_id: row.get(1)?,
        journal_entry_id: row.get(2)?,
        summary: row.get(3)?,
        topics: get_json(row, 4)?,
        open_loops: get_json(row, 5)?,
        why_shown: row.get(6)?,
        created_at: get_timestamp(row, 7)?,
        updated_at: get_timestamp(row, 8)?,
    })
}

/// The summary derived from one journal entry, if any.
pub fn get_summary_for_entry(
    conn: &Connection,
    user_id: &str,
    journal_entry_id: &str,
) -> EngineResult<Option<EpisodicSummary>> {
    let summary = conn
        .query_row(
            &format!(
                "SELECT {SUMMARY_COLUMNS} FROM episodic_summaries \
                 WHERE journal_entry_id = ?1 AND user_id = ?2"
            ),
            params![journal_entry_id, user_id],
            summary_from_row,
        )
        .optional()?;
    Ok(summary)
}

/// All summaries for a user, newest first.
pub fn list_summaries(conn: &Connection, user_id: &str) -> EngineResult<Vec<EpisodicSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM episodic_summaries \
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![user_id], summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Up to `limit` summaries created at or after `since`, newest first.
pub fn list_recent_summaries(
    conn: &Connection,
    user_id: &str,
    since: DateTime<Utc>,
    limit: usize,
) -> EngineResult<Vec<EpisodicSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM episodic_summaries \
         WHERE user_id = ?1 AND created_at >= ?2 \
         ORDER BY created_at DESC, id DESC LIMIT ?3"
    ))?;
    let rows = stmt
        .query_map(
            params![user_id, timestamp(&since), limit as i64],
            summary_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seed_entry(conn: &Connection, id: &str, user_id: &str, content: &str) {
        let now = timestamp(&Utc::now());
        conn.execute(
            "INSERT INTO journal_entries (id, user_id, content, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, user_id, content, now],
        )
        .unwrap();
    }

    fn audit_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE action = 'episodic_summary.generated'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn regeneration_from_same_content_is_a_no_op() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let content = "Need to email the landlord. Work was fine.";
        seed_entry(&conn, "j1", "u1", content);
        let now = Utc::now();

        let first = write_episodic_summary(&mut conn, "u1", "j1", content, now).unwrap();
        assert!(first.changed);
        assert_eq!(audit_count(&conn), 1);

        let second =
            write_episodic_summary(&mut conn, "u1", "j1", content, now + Duration::minutes(5))
                .unwrap();
        assert!(!second.changed);
        assert_eq!(second.summary.updated_at, first.summary.updated_at);
        assert_eq!(audit_count(&conn), 1);
    }

    #[test]
    fn changed_content_updates_the_single_row() {
        let mut conn = crate::db::open_memory_database().unwrap();
        seed_entry(&conn, "j1", "u1", "Quiet day.");
        let now = Utc::now();

        let first = write_episodic_summary(&mut conn, "u1", "j1", "Quiet day.", now).unwrap();
        let later = now + Duration::hours(1);
        let second =
            write_episodic_summary(&mut conn, "u1", "j1", "Busy day at work. Follow up later?", later)
                .unwrap();

        assert!(second.changed);
        assert_eq!(second.summary.id, first.summary.id);
        assert_eq!(second.summary.created_at, first.summary.created_at);
        assert_eq!(second.summary.topics, vec!["work"]);
        assert_eq!(list_summaries(&conn, "u1").unwrap().len(), 1);
        assert_eq!(audit_count(&conn), 2);
    }

    #[test]
    fn summary_and_loops_are_redacted() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let content = "Email jane@corp.com about rent. Need to call 555-123-4567 later.";
        seed_entry(&conn, "j1", "u1", content);

        let out = write_episodic_summary(&mut conn, "u1", "j1", content, Utc::now()).unwrap();
        assert!(out.summary.summary.contains("[REDACTED:EMAIL]"));
        assert!(!out.summary.summary.contains("jane@corp.com"));
        assert_eq!(out.summary.open_loops.len(), 1);
        assert!(out.summary.open_loops[0].contains("[REDACTED:PHONE]"));
        assert_eq!(out.summary.why_shown, EPISODIC_WHY_SHOWN);
    }

    #[test]
    fn recent_summaries_respect_window_and_limit() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let now = Utc::now();
        for (i, days_ago) in [0i64, 1, 2, 9].iter().enumerate() {
            let id = format!("j{i}");
            seed_entry(&conn, &id, "u1", "Day.");
            write_episodic_summary(&mut conn, "u1", &id, "Day.", now - Duration::days(*days_ago))
                .unwrap();
        }

        let recent = list_recent_summaries(&conn, "u1", now - Duration::days(7), 10).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].journal_entry_id, "j0");

        let capped = list_recent_summaries(&conn, "u1", now - Duration::days(7), 2).unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn lookup_by_entry_is_owner_scoped() {
        let mut conn = crate::db::open_memory_database().unwrap();
        seed_entry(&conn, "j1", "u1", "Hello.");
        write_episodic_summary(&mut conn, "u1", "j1", "Hello.", Utc::now()).unwrap();

        assert!(get_summary_for_entry(&conn, "u1", "j1").unwrap().is_some());
        assert!(get_summary_for_entry(&conn, "u2", "j1").unwrap().is_none());
    }
}
