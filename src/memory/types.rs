//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (the two recallable memory kinds), the persisted
//! records [`EpisodicSummary`] and [`PreferenceMemory`], and [`MemoryRecord`],
//! the tagged union the recall and deletion paths operate on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two kinds of memory a user can recall or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Derived digest of a single journal entry.
    Episodic,
    /// Explicitly consented key/value fact.
    Preference,
}

impl MemoryType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Preference => "preference",
        }
    }

    /// Audit-log entity name for records of this type.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Episodic => EntityType::EpisodicSummary,
            Self::Preference => EntityType::PreferenceMemory,
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episodic" => Ok(Self::Episodic),
            "preference" => Ok(Self::Preference),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// Entity names recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    JournalEntry,
    EpisodicSummary,
    PreferenceMemory,
    NotificationSetting,
    CheckInSuggestion,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JournalEntry => "JournalEntry",
            Self::EpisodicSummary => "EpisodicSummary",
            Self::PreferenceMemory => "PreferenceMemory",
            Self::NotificationSetting => "NotificationSetting",
            Self::CheckInSuggestion => "CheckInSuggestion",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JournalEntry" => Ok(Self::JournalEntry),
            "EpisodicSummary" => Ok(Self::EpisodicSummary),
            "PreferenceMemory" => Ok(Self::PreferenceMemory),
            "NotificationSetting" => Ok(Self::NotificationSetting),
            "CheckInSuggestion" => Ok(Self::CheckInSuggestion),
            _ => Err(format!("unknown entity type: {s}")),
        }
    }
}

/// A redacted digest of one journal entry, matching the `episodic_summaries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodicSummary {
    /// UUID v7 primary key.
    pub id: String,
    pub user_id: String,
    /// Source entry; at most one summary exists per entry.
    pub journal_entry_id: String,
    /// First sentence of the entry, at most 180 characters.
    pub summary: String,
    /// Topic labels in keyword-table order, no duplicates.
    pub topics: Vec<String>,
    /// Sentences flagged as unresolved, in entry order.
    pub open_loops: Vec<String>,
    /// Human-readable provenance shown next to the memory.
    pub why_shown: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A consented preference, matching the `preference_memories` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceMemory {
    pub id: String,
    pub user_id: String,
    /// Unique per user.
    pub key: String,
    /// Opaque structured value, already redacted.
    pub value: serde_json::Value,
    pub source: Option<String>,
    /// When the user consented; doubles as the provenance record.
    pub consent_given_at: DateTime<Utc>,
    /// Soft-delete marker. Revoked preferences are never recalled.
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PreferenceMemory {
    /// Strings verbatim, anything else as compact JSON.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Either kind of memory, carrying its own payload.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryRecord {
    Episodic(EpisodicSummary),
    Preference(PreferenceMemory),
}

impl MemoryRecord {
    pub fn memory_type(&self) -> MemoryType {
        match self {
            Self::Episodic(_) => MemoryType::Episodic,
            Self::Preference(_) => MemoryType::Preference,
        }
    }

    /// The date a recall result is ordered by.
    pub fn source_date(&self) -> DateTime<Utc> {
        match self {
            Self::Episodic(s) => s.created_at,
            Self::Preference(p) => p.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_round_trips_through_str() {
        for t in [MemoryType::Episodic, MemoryType::Preference] {
            assert_eq!(t.as_str().parse::<MemoryType>().unwrap(), t);
        }
        assert!("semantic".parse::<MemoryType>().is_err());
    }

    #[test]
    fn entity_type_round_trips_through_str() {
        assert_eq!(
            "CheckInSuggestion".parse::<EntityType>().unwrap(),
            EntityType::CheckInSuggestion
        );
        assert_eq!(MemoryType::Preference.entity_type().as_str(), "PreferenceMemory");
        assert!("checkin".parse::<EntityType>().is_err());
    }

    #[test]
    fn preference_value_text() {
        let now = Utc::now();
        let mut pref = PreferenceMemory {
            id: "p1".into(),
            user_id: "u1".into(),
            key: "tone".into(),
            value: serde_json::json!("gentle"),
            source: None,
            consent_given_at: now,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(pref.value_text(), "gentle");
        pref.value = serde_json::json!({"hours": [9, 17]});
        assert_eq!(pref.value_text(), r#"{"hours":[9,17]}"#);
    }
}
