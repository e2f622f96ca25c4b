//! Check-in suggestions and their lifecycle.
//!
//! ```text
//! pending ──dismiss──▶ dismissed
//!    │  ──done─────▶ done
//!    └──snooze──▶ snoozed ──(snoozed_until elapsed, on read)──▶ pending
//! ```
//!
//! Expiry of a snooze is never written back; it is evaluated at read time.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{get_json, get_opt_timestamp, get_timestamp, timestamp};
use crate::error::EngineResult;
use crate::memory::audit::actions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    Pending,
    Snoozed,
    Dismissed,
    Done,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Snoozed => "snoozed",
            Self::Dismissed => "dismissed",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for CheckInStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckInStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "snoozed" => Ok(Self::Snoozed),
            "dismissed" => Ok(Self::Dismissed),
            "done" => Ok(Self::Done),
            _ => Err(format!("unknown check-in status: {s}")),
        }
    }
}

/// A user response to a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckInAction {
    Dismiss,
    Snooze,
    Done,
}

impl CheckInAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dismiss => "dismiss",
            Self::Snooze => "snooze",
            Self::Done => "done",
        }
    }

    /// Resulting status and the audit action recorded for it.
    pub fn transition(&self) -> (CheckInStatus, &'static str) {
        match self {
            Self::Dismiss => (CheckInStatus::Dismissed, actions::CHECKIN_DISMISSED),
            Self::Snooze => (CheckInStatus::Snoozed, actions::CHECKIN_SNOOZED),
            Self::Done => (CheckInStatus::Done, actions::CHECKIN_DONE),
        }
    }
}

impl std::str::FromStr for CheckInAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dismiss" => Ok(Self::Dismiss),
            "snooze" => Ok(Self::Snooze),
            "done" => Ok(Self::Done),
            _ => Err(format!("unknown check-in action: {s}")),
        }
    }
}

/// An open loop that justified a suggestion, with the summary it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenLoopRef {
    pub summary_id: String,
    pub summary: String,
    #[serde(rename = "loop")]
    pub loop_text: String,
}

/// Signals that fired when the suggestion was generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonDetails {
    pub open_loops: Vec<OpenLoopRef>,
    /// Set only when the inactivity threshold was reached.
    pub inactivity_days: Option<i64>,
    /// Distinct, in first-seen order.
    pub source_summary_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSuggestion {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub why: String,
    pub reason_details: ReasonDetails,
    pub status: CheckInStatus,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckInSuggestion {
    /// Pending, or snoozed with the snooze already elapsed.
    pub fn is_effectively_pending(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            CheckInStatus::Pending => true,
            CheckInStatus::Snoozed => self.snoozed_until.is_some_and(|until| until <= now),
            CheckInStatus::Dismissed | CheckInStatus::Done => false,
        }
    }
}

const SUGGESTION_COLUMNS: &str =
    "id, user_id, message, why, reason_details, status, snoozed_until, created_at, updated_at";

fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<CheckInSuggestion> {
    let status: String = row.get(5)?;
    Ok(CheckInSuggestion {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        why: row.get(3)?,
        reason_details: get_json(row, 4)?,
        status: status.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, e.into())
        })?,
        snoozed_until: get_opt_timestamp(row, 6)?,
        created_at: get_timestamp(row, 7)?,
        updated_at: get_timestamp(row, 8)?,
    })
}

pub(crate) fn insert_suggestion(
    conn: &Connection,
    user_id: &str,
    message: &str,
    why: &str,
    reason_details: &ReasonDetails,
    now: DateTime<Utc>,
) -> EngineResult<CheckInSuggestion> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO checkin_suggestions \
         (id, user_id, message, why, reason_details, status, snoozed_until, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', NULL, ?6, ?6)",
        params![
            id,
            user_id,
            message,
            why,
            serde_json::to_string(reason_details)?,
            timestamp(&now),
        ],
    )?;

    Ok(CheckInSuggestion {
        id,
        user_id: user_id.to_string(),
        message: message.to_string(),
        why: why.to_string(),
        reason_details: reason_details.clone(),
        status: CheckInStatus::Pending,
        snoozed_until: None,
        created_at: now,
        updated_at: now,
    })
}

/// Suggestions created in `[start, end)`.
pub(crate) fn count_created_between(
    conn: &Connection,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> EngineResult<u32> {
    let n: u32 = conn.query_row(
        "SELECT COUNT(*) FROM checkin_suggestions \
         WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3",
        params![user_id, timestamp(&start), timestamp(&end)],
        |row| row.get(0),
    )?;
    Ok(n)
}

pub(crate) fn find_suggestion(
    conn: &Connection,
    user_id: &str,
    id: &str,
) -> EngineResult<Option<CheckInSuggestion>> {
    let found = conn
        .query_row(
            &format!("SELECT {SUGGESTION_COLUMNS} FROM checkin_suggestions WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            suggestion_from_row,
        )
        .optional()?;
    Ok(found)
}

/// Pending plus re-surfaced snoozed suggestions, newest first.
pub(crate) fn query_active(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Utc>,
    limit: usize,
) -> EngineResult<Vec<CheckInSuggestion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUGGESTION_COLUMNS} FROM checkin_suggestions \
         WHERE user_id = ?1 \
           AND (status = 'pending' OR (status = 'snoozed' AND snoozed_until <= ?2)) \
         ORDER BY created_at DESC, id DESC LIMIT ?3"
    ))?;
    let rows = stmt
        .query_map(
            params![user_id, timestamp(&now), limit as i64],
            suggestion_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn set_status(
    conn: &Connection,
    id: &str,
    status: CheckInStatus,
    snoozed_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> EngineResult<CheckInSuggestion> {
    let updated = conn.query_row(
        &format!(
            "UPDATE checkin_suggestions SET status = ?1, snoozed_until = ?2, updated_at = ?3 \
             WHERE id = ?4 RETURNING {SUGGESTION_COLUMNS}"
        ),
        params![
            status.as_str(),
            snoozed_until.as_ref().map(timestamp),
            timestamp(&now),
            id,
        ],
        suggestion_from_row,
    )?;
    Ok(updated)
}
