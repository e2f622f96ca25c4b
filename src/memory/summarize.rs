//! Deterministic episodic summarization.
//!
//! [`summarize`] turns raw journal text into a short summary, topic tags and
//! open-loop sentences using fixed tables only. No I/O and no randomness: the
//! same input always yields the same output, which is what makes summary
//! regeneration idempotent.

use serde::{Deserialize, Serialize};

/// Summaries longer than this are truncated.
pub const MAX_SUMMARY_CHARS: usize = 180;
const TRUNCATED_PREFIX_CHARS: usize = MAX_SUMMARY_CHARS - ELLIPSIS.len();
const ELLIPSIS: &str = "...";

pub const MAX_TOPICS: usize = 5;
pub const MAX_OPEN_LOOPS: usize = 5;

/// Summary used when the entry has no text at all.
pub const EMPTY_SUMMARY: &str = "No details were provided for this day.";

/// Topic → keywords, scanned in order.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("work", &["work", "meeting", "deadline", "client", "project"]),
    ("health", &["health", "sleep", "exercise", "workout", "doctor"]),
    (
        "relationships",
        &["family", "friend", "partner", "relationship", "mom", "dad"],
    ),
    ("finance", &["money", "budget", "bill", "expense", "salary"]),
    ("learning", &["study", "learn", "course", "read", "practice"]),
];

/// Any segment containing one of these (case-insensitive) is an open loop.
const OPEN_LOOP_MARKERS: &[&str] = &[
    "todo",
    "to do",
    "need to",
    "follow up",
    "follow-up",
    "waiting",
    "pending",
    "later",
    "next step",
    "remember to",
    "should",
    "?",
];

/// Output of [`summarize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDraft {
    pub summary: String,
    pub topics: Vec<String>,
    pub open_loops: Vec<String>,
}

/// Summarize one journal entry.
pub fn summarize(content: &str) -> SummaryDraft {
    let normalized = normalize_whitespace(content);

    SummaryDraft {
        summary: short_summary(&normalized),
        topics: detect_topics(&normalized),
        open_loops: detect_open_loops(content),
    }
}

/// Collapse whitespace runs to single spaces and trim.
fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split on line breaks and after `.`, `!` or `?` followed by whitespace.
fn split_into_segments(content: &str) -> Vec<String> {
    let mut raw = Vec::new();
    for line in content.split('\n') {
        let mut current = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|next| next.is_whitespace())
            {
                raw.push(std::mem::take(&mut current));
            }
        }
        raw.push(current);
    }

    raw.iter()
        .map(|segment| normalize_whitespace(segment))
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn short_summary(normalized: &str) -> String {
    let Some(first) = split_into_segments(normalized).into_iter().next() else {
        return EMPTY_SUMMARY.to_string();
    };

    if first.chars().count() <= MAX_SUMMARY_CHARS {
        return first;
    }

    let prefix: String = first.chars().take(TRUNCATED_PREFIX_CHARS).collect();
    format!("{}{ELLIPSIS}", prefix.trim_end())
}

fn detect_topics(normalized: &str) -> Vec<String> {
    let lowered = normalized.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(topic, _)| topic.to_string())
        .take(MAX_TOPICS)
        .collect()
}

fn detect_open_loops(content: &str) -> Vec<String> {
    split_into_segments(content)
        .into_iter()
        .filter(|segment| {
            let lowered = segment.to_lowercase();
            OPEN_LOOP_MARKERS.iter().any(|m| lowered.contains(m))
        })
        .take(MAX_OPEN_LOOPS)
        .collect()
}
