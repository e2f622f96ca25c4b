//! Per-user notification settings.
//!
//! A settings row is created with defaults the first time it is read. The
//! check-in window is stored and validated but the scheduler does not gate on it.

use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::timestamp;
use crate::error::{EngineError, EngineResult};
use crate::memory::audit::{actions, write_audit_log};
use crate::memory::types::EntityType;

pub const MAX_PER_DAY_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
pub const INACTIVITY_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=30;

const SETTINGS_COLUMNS: &str = "proactive_check_ins, check_in_window_start, check_in_window_end, \
     check_in_max_per_day, check_in_inactivity_days";

/// Proactive check-in preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSettings {
    /// Opt-in flag. Nothing is generated while this is false.
    pub proactive_check_ins: bool,
    /// "HH:MM", 24h.
    pub check_in_window_start: String,
    /// "HH:MM", 24h.
    pub check_in_window_end: String,
    /// 1..=10
    pub check_in_max_per_day: u32,
    /// 1..=30
    pub check_in_inactivity_days: u32,
}

impl Default for CheckInSettings {
    fn default() -> Self {
        Self {
            proactive_check_ins: false,
            check_in_window_start: "09:00".to_string(),
            check_in_window_end: "20:00".to_string(),
            check_in_max_per_day: 1,
            check_in_inactivity_days: 3,
        }
    }
}

impl CheckInSettings {
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("checkInWindowStart", &self.check_in_window_start),
            ("checkInWindowEnd", &self.check_in_window_end),
        ] {
            if !is_time_of_day(value) {
                return Err(EngineError::Validation(format!("{name} must be HH:MM")));
            }
        }
        if !MAX_PER_DAY_RANGE.contains(&self.check_in_max_per_day) {
            return Err(EngineError::Validation(
                "checkInMaxPerDay must be between 1 and 10".into(),
            ));
        }
        if !INACTIVITY_DAYS_RANGE.contains(&self.check_in_inactivity_days) {
            return Err(EngineError::Validation(
                "checkInInactivityDays must be between 1 and 30".into(),
            ));
        }
        Ok(())
    }
}

fn is_time_of_day(value: &str) -> bool {
    value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok()
}

fn settings_from_row(row: &Row<'_>) -> rusqlite::Result<CheckInSettings> {
    Ok(CheckInSettings {
        proactive_check_ins: row.get(0)?,
        check_in_window_start: row.get(1)?,
        check_in_window_end: row.get(2)?,
        check_in_max_per_day: row.get(3)?,
        check_in_inactivity_days: row.get(4)?,
    })
}

/// Read settings, inserting the defaults on first access.
pub fn get_settings(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<CheckInSettings> {
    let created = conn.execute(
        "INSERT OR IGNORE INTO notification_settings (user_id, created_at, updated_at) \
         VALUES (?1, ?2, ?2)",
        params![user_id, timestamp(&now)],
    )?;
    if created > 0 {
        tracing::debug!("notification settings initialized");
    }

    let settings = conn.query_row(
        &format!("SELECT {SETTINGS_COLUMNS} FROM notification_settings WHERE user_id = ?1"),
        params![user_id],
        settings_from_row,
    )?;
    Ok(settings)
}

/// Validate and persist settings, then audit the change.
pub fn update_settings(
    conn: &mut Connection,
    user_id: &str,
    settings: &CheckInSettings,
    now: DateTime<Utc>,
) -> EngineResult<CheckInSettings> {
    settings.validate()?;

    let tx = conn.transaction()?;
    let saved = tx.query_row(
        &format!(
            "INSERT INTO notification_settings \
             (user_id, proactive_check_ins, check_in_window_start, check_in_window_end, \
              check_in_max_per_day, check_in_inactivity_days, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             ON CONFLICT(user_id) DO UPDATE SET \
                proactive_check_ins = excluded.proactive_check_ins, \
                check_in_window_start = excluded.check_in_window_start, \
                check_in_window_end = excluded.check_in_window_end, \
                check_in_max_per_day = excluded.check_in_max_per_day, \
                check_in_inactivity_days = excluded.check_in_inactivity_days, \
                updated_at = excluded.updated_at \
             RETURNING {SETTINGS_COLUMNS}"
        ),
        params![
            user_id,
            settings.proactive_check_ins,
            settings.check_in_window_start,
            settings.check_in_window_end,
            settings.check_in_max_per_day,
            settings.check_in_inactivity_days,
            timestamp(&now),
        ],
        settings_from_row,
    )?;

    write_audit_log(
        &tx,
        user_id,
        actions::CHECKIN_SETTINGS_UPDATED,
        EntityType::NotificationSetting,
        Some(user_id),
        Some(&serde_json::to_value(&saved)?),
        now,
    )?;
    tx.commit()?;

    tracing::info!(
        proactive = saved.proactive_check_ins,
        max_per_day = saved.check_in_max_per_day,
        "check-in settings updated"
    );
    Ok(saved)
}

/// Users who opted in to proactive check-ins.
pub fn list_proactive_users(conn: &Connection) -> EngineResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM notification_settings WHERE proactive_check_ins = 1 ORDER BY user_id",
    )?;
    let users = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(users)
}
