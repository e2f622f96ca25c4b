//! Recall: substring search over episodic and preference memory.
//!
//! Each hit carries a [`RecallReason`] explaining why it matched, plus the
//! provenance text shown next to it. Results are merged and ordered newest first.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::memory::episodic::list_summaries;
use crate::memory::preference::{list_active_preferences, PREFERENCE_WHY_SHOWN};
use crate::memory::types::{EpisodicSummary, MemoryRecord, MemoryType, PreferenceMemory};

pub const MAX_QUERY_CHARS: usize = 500;

/// Why a memory matched a recall query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecallReason {
    #[serde(rename = "topic overlap")]
    TopicOverlap,
    #[serde(rename = "open loop")]
    OpenLoop,
    #[serde(rename = "query match")]
    QueryMatch,
}

impl RecallReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopicOverlap => "topic overlap",
            Self::OpenLoop => "open loop",
            Self::QueryMatch => "query match",
        }
    }
}

impl std::fmt::Display for RecallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recall hit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallItem {
    pub id: String,
    pub memory_type: MemoryType,
    pub source_date: DateTime<Utc>,
    pub content: String,
    pub reason: RecallReason,
    pub journal_entry_id: Option<String>,
    pub why_shown: String,
}

/// Search a user's memories. An empty query matches everything.
pub fn recall(conn: &Connection, user_id: &str, raw_query: &str) -> EngineResult<Vec<RecallItem>> {
    if raw_query.chars().count() > MAX_QUERY_CHARS {
        return Err(EngineError::Validation(format!(
            "query must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    let query = raw_query.trim().to_lowercase();

    let records = list_summaries(conn, user_id)?
        .into_iter()
        .map(MemoryRecord::Episodic)
        .chain(
            list_active_preferences(conn, user_id)?
                .into_iter()
                .map(MemoryRecord::Preference),
        );

    let mut items: Vec<RecallItem> = records
        .filter_map(|record| {
            let reason = match &record {
                MemoryRecord::Episodic(summary) => classify_episodic(summary, &query),
                MemoryRecord::Preference(pref) => {
                    preference_matches(pref, &query).then_some(RecallReason::QueryMatch)
                }
            }?;
            Some(into_item(record, reason))
        })
        .collect();

    // stable: equal dates keep episodic-before-preference order
    items.sort_by(|a, b| b.source_date.cmp(&a.source_date));

    tracing::debug!(results = items.len(), "recall complete");
    Ok(items)
}

/// Topic hits win over open-loop hits, which win over plain summary text.
fn classify_episodic(summary: &EpisodicSummary, query: &str) -> Option<RecallReason> {
    if query.is_empty() {
        return Some(RecallReason::QueryMatch);
    }
    if summary.topics.iter().any(|t| t.to_lowercase().contains(query)) {
        return Some(RecallReason::TopicOverlap);
    }
    if summary.open_loops.iter().any(|l| l.to_lowercase().contains(query)) {
        return Some(RecallReason::OpenLoop);
    }
    if summary.summary.to_lowercase().contains(query) {
        return Some(RecallReason::QueryMatch);
    }
    None
}

fn preference_matches(pref: &PreferenceMemory, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {} {}",
        pref.key,
        pref.source.as_deref().unwrap_or_default(),
        pref.value_text()
    );
    haystack.to_lowercase().contains(query)
}

fn into_item(record: MemoryRecord, reason: RecallReason) -> RecallItem {
    let memory_type = record.memory_type();
    let source_date = record.source_date();
    match record {
        MemoryRecord::Episodic(summary) => RecallItem {
            id: summary.id,
            memory_type,
            source_date,
            content: summary.summary,
            reason,
            journal_entry_id: Some(summary.journal_entry_id),
            why_shown: summary.why_shown,
        },
        MemoryRecord::Preference(pref) => RecallItem {
            content: format!("{}: {}", pref.key, pref.value_text()),
            id: pref.id,
            memory_type,
            source_date,
            reason,
            journal_entry_id: None,
            why_shown: PREFERENCE_WHY_SHOWN.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(topics: &[&str], loops: &[&str], text: &str) -> EpisodicSummary {
        let now = Utc::now();
        EpisodicSummary {
            id: "s1".into(),
            user_id: "u1".into(),
            journal_entry_id: "j1".into(),
            summary: text.into(),
            topics: topics.iter().map(|s| s.to_string()).collect(),
            open_loops: loops.iter().map(|s| s.to_string()).collect(),
            why_shown: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn topic_beats_summary_text() {
        let s = summary(&["work"], &[], "Work was long.");
        assert_eq!(classify_episodic(&s, "work"), Some(RecallReason::TopicOverlap));
    }

    #[test]
    fn open_loop_beats_summary_text() {
        let s = summary(&[], &["Need to follow up."], "Need to follow up.");
        assert_eq!(classify_episodic(&s, "follow"), Some(RecallReason::OpenLoop));
    }

    #[test]
    fn summary_text_and_misses() {
        let s = summary(&["health"], &[], "Walked the dog.");
        assert_eq!(classify_episodic(&s, "dog"), Some(RecallReason::QueryMatch));
        assert_eq!(classify_episodic(&s, "cat"), None);
        assert_eq!(classify_episodic(&s, ""), Some(RecallReason::QueryMatch));
    }

    #[test]
    fn reasons_serialize_with_spaces() {
        assert_eq!(
            serde_json::to_string(&RecallReason::TopicOverlap).unwrap(),
            "\"topic overlap\""
        );
    }

    #[test]
    fn overlong_query_is_rejected() {
        let conn = crate::db::open_memory_database().unwrap();
        let err = recall(&conn, "u1", &"q".repeat(MAX_QUERY_CHARS + 1)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
