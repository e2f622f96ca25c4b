//! SQL DDL for all daybook tables.
//!
//! Defines `journal_entries`, `episodic_summaries`, `preference_memories`,
//! `notification_settings`, `checkin_suggestions`, `audit_log`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Raw daily notes
CREATE TABLE IF NOT EXISTS journal_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_journal_user_created ON journal_entries(user_id, created_at);

-- One derived summary per journal entry
CREATE TABLE IF NOT EXISTS episodic_summaries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    journal_entry_id TEXT NOT NULL UNIQUE REFERENCES journal_entries(id) ON DELETE CASCADE,
    summary TEXT NOT NULL,
    topics TEXT NOT NULL DEFAULT '[]',
    open_loops TEXT NOT NULL DEFAULT '[]',
    why_shown TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_summaries_user_created ON episodic_summaries(user_id, created_at);

-- Consented key/value facts
CREATE TABLE IF NOT EXISTS preference_memories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    source TEXT,
    consent_given_at TEXT NOT NULL,
    revoked_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, key)
);

CREATE INDEX IF NOT EXISTS idx_preferences_user ON preference_memories(user_id, revoked_at);

-- Proactive check-in preferences, created lazily on first read
CREATE TABLE IF NOT EXISTS notification_settings (
    user_id TEXT PRIMARY KEY,
    proactive_check_ins INTEGER NOT NULL DEFAULT 0,
    check_in_window_start TEXT NOT NULL DEFAULT '09:00',
    check_in_window_end TEXT NOT NULL DEFAULT '20:00',
    check_in_max_per_day INTEGER NOT NULL DEFAULT 1 CHECK(check_in_max_per_day BETWEEN 1 AND 10),
    check_in_inactivity_days INTEGER NOT NULL DEFAULT 3 CHECK(check_in_inactivity_days BETWEEN 1 AND 30),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_settings_proactive ON notification_settings(proactive_check_ins);

-- Scheduler output; never deleted
CREATE TABLE IF NOT EXISTS checkin_suggestions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    message TEXT NOT NULL,
    why TEXT NOT NULL,
    reason_details TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending','snoozed','dismissed','done')),
    snoozed_until TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checkins_user_created ON checkin_suggestions(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_checkins_user_status ON checkin_suggestions(user_id, status);

-- Append-only audit trail
CREATE TABLE IF NOT EXISTS audit_log (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    action TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_user_created ON audit_log(user_id, created_at);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "journal_entries",
            "episodic_summaries",
            "preference_memories",
            "notification_settings",
            "checkin_suggestions",
            "audit_log",
            "schema_meta",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn settings_ranges_are_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO notification_settings (user_id, check_in_max_per_day, created_at, updated_at) \
             VALUES ('u1', 11, 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
