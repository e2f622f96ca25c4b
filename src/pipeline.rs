//! Journal-entry pipeline.
//!
//! A new or edited entry runs two steps in a fixed order: the episodic summary
//! write, then check-in generation for the author. The first error stops the
//! pipeline and is returned to the caller.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::checkin::{generate_suggestion, CheckInSuggestion};
use crate::error::EngineResult;
use crate::journal::{self, JournalEntry};
use crate::memory::episodic::{write_episodic_summary, EpisodicWriteOutcome};

/// What the pipeline produced for one entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub episodic: EpisodicWriteOutcome,
    pub suggestion: Option<CheckInSuggestion>,
}

/// Entry plus the pipeline output it triggered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEntry {
    pub entry: JournalEntry,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

/// Run the pipeline for an entry stored elsewhere. `None` when `user_id` does
/// not own `journal_entry_id`.
pub fn on_journal_entry_created(
    conn: &mut Connection,
    user_id: &str,
    journal_entry_id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> EngineResult<Option<PipelineOutcome>> {
    if journal::get_entry(conn, user_id, journal_entry_id)?.is_none() {
        tracing::debug!(journal_entry_id, "pipeline skipped: entry not owned by caller");
        return Ok(None);
    }
    run(conn, user_id, journal_entry_id, content, now).map(Some)
}

fn run(
    conn: &mut Connection,
    user_id: &str,
    journal_entry_id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> EngineResult<PipelineOutcome> {
    let episodic = write_episodic_summary(conn, user_id, journal_entry_id, content, now)?;
    let suggestion = generate_suggestion(conn, user_id, now)?;

    tracing::debug!(
        journal_entry_id,
        summary_changed = episodic.changed,
        suggested = suggestion.is_some(),
        "journal pipeline complete"
    );

    Ok(PipelineOutcome {
        episodic,
        suggestion,
    })
}

/// Store a new entry and run the pipeline on it.
pub fn record_entry(
    conn: &mut Connection,
    user_id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> EngineResult<ProcessedEntry> {
    let entry = journal::create_entry(conn, user_id, content, now)?;
    let outcome = run(conn, user_id, &entry.id, &entry.content, now)?;
    Ok(ProcessedEntry { entry, outcome })
}

/// Edit an entry and re-run the pipeline. `None` on ownership miss.
pub fn revise_entry(
    conn: &mut Connection,
    user_id: &str,
    id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> EngineResult<Option<ProcessedEntry>> {
    let Some(entry) = journal::update_entry(conn, user_id, id, content, now)? else {
        return Ok(None);
    };
    let outcome = run(conn, user_id, &entry.id, &entry.content, now)?;
    Ok(Some(ProcessedEntry { entry, outcome }))
}
