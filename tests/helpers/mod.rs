#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use daybook::checkin::{update_settings, CheckInSettings};
use daybook::config::DaybookConfig;
use daybook::engine::Daybook;
use daybook::ratelimit::RateLimiter;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    daybook::db::open_memory_database().unwrap()
}

/// A fixed UTC instant on October 2026.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

/// Opt `user_id` into proactive check-ins.
pub fn enable_checkins(
    conn: &mut Connection,
    user_id: &str,
    max_per_day: u32,
    inactivity_days: u32,
    now: DateTime<Utc>,
) -> CheckInSettings {
    let settings = CheckInSettings {
        proactive_check_ins: true,
        check_in_max_per_day: max_per_day,
        check_in_inactivity_days: inactivity_days,
        ..CheckInSettings::default()
    };
    update_settings(conn, user_id, &settings, now).unwrap()
}

/// Store an entry and run the pipeline, returning the entry id.
pub fn journal(conn: &mut Connection, user_id: &str, content: &str, now: DateTime<Utc>) -> String {
    daybook::pipeline::record_entry(conn, user_id, content, now)
        .unwrap()
        .entry
        .id
}

/// An engine over an in-memory database with in-process rate limiting.
pub fn test_engine(config: DaybookConfig) -> Daybook {
    Daybook::new(test_db(), RateLimiter::in_memory(), config)
}
