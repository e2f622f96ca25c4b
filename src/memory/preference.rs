//! Consent-gated preference memory.
//!
//! A preference is only ever written when the caller passes explicit consent.
//! The gate runs before validation, redaction or any store access.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{get_json, get_opt_timestamp, get_timestamp, timestamp};
use crate::error::{EngineError, EngineResult};
use crate::memory::types::PreferenceMemory;
use crate::redact::{redact_json, redact_text};

pub const PREFERENCE_WHY_SHOWN: &str =
    "Saved because you explicitly consented to store this preference.";

pub const MAX_KEY_CHARS: usize = 128;
pub const MAX_SOURCE_CHARS: usize = 256;

const PREFERENCE_COLUMNS: &str =
    "id, user_id, key, value, source, consent_given_at, revoked_at, created_at, updated_at";

/// Input for [`write_preference_memory`].
#[derive(Debug, Clone)]
pub struct PreferenceWrite {
    pub user_id: String,
    pub key: String,
    pub value: serde_json::Value,
    pub source: Option<String>,
    pub consent_granted: bool,
    /// Defaults to the write time.
    pub consent_given_at: Option<DateTime<Utc>>,
}

/// Upsert a preference by `(user_id, key)`, clearing any revocation.
pub fn write_preference_memory(
    conn: &Connection,
    input: &PreferenceWrite,
    now: DateTime<Utc>,
) -> EngineResult<PreferenceMemory> {
    if !input.consent_granted {
        return Err(EngineError::ConsentRequired);
    }

    let key = input.key.trim();
    if key.is_empty() || key.chars().count() > MAX_KEY_CHARS {
        return Err(EngineError::Validation(format!(
            "preference key must be 1-{MAX_KEY_CHARS} characters"
        )));
    }
    let source = input
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if source.is_some_and(|s| s.chars().count() > MAX_SOURCE_CHARS) {
        return Err(EngineError::Validation(format!(
            "preference source must be at most {MAX_SOURCE_CHARS} characters"
        )));
    }

    let value = redact_json(&input.value);
    let source = source.map(redact_text);
    let consent_given_at = input.consent_given_at.unwrap_or(now);

    let preference = conn.query_row(
        &format!(
            "INSERT INTO preference_memories \
             (id, user_id, key, value, source, consent_given_at, revoked_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?7) \
             ON CONFLICT(user_id, key) DO UPDATE SET \
                value = excluded.value, \
                source = excluded.source, \
                consent_given_at = excluded.consent_given_at, \
                revoked_at = NULL, \
                updated_at = excluded.updated_at \
             RETURNING {PREFERENCE_COLUMNS}"
        ),
        params![
            uuid::Uuid::now_v7().to_string(),
            input.user_id,
            key,
            serde_json::to_string(&value)?,
            source,
            timestamp(&consent_given_at),
            timestamp(&now),
        ],
        preference_from_row,
    )?;

    tracing::info!(
        preference_id = %preference.id,
        key = %redact_text(key),
        "memory.preference.written"
    );

    Ok(preference)
}

pub(crate) fn preference_from_row(row: &Row<'_>) -> rusqlite::Result<PreferenceMemory> {
    Ok(PreferenceMemory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        key: row.get(2)?,
        value: get_json(row, 3)?,
        source: row.get(4)?,
        consent_given_at: get_timestamp(row, 5)?,
        revoked_at: get_opt_timestamp(row, 6)?,
        created_at: get_timestamp(row, 7)?,
        updated_at: get_timestamp(row, 8)?,
    })
}

/// Non-revoked preferences for a user, newest first.
pub fn list_active_preferences(
    conn: &Connection,
    user_id: &str,
) -> EngineResult<Vec<PreferenceMemory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PREFERENCE_COLUMNS} FROM preference_memories \
         WHERE user_id = ?1 AND revoked_at IS NULL \
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![user_id], preference_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Look up a preference by key, revoked or not.
pub fn get_preference(
    conn: &Connection,
    user_id: &str,
    key: &str,
) -> EngineResult<Option<PreferenceMemory>> {
    let pref = conn
        .query_row(
            &format!(
                "SELECT {PREFERENCE_COLUMNS} FROM preference_memories WHERE user_id = ?1 AND key = ?2"
            ),
            params![user_id, key.trim()],
            preference_from_row,
        )
        .optional()?;
    Ok(pref)
}
