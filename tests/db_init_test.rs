use daybook::db;
use daybook::db::migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
use rusqlite::Connection;

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn fresh_database_has_every_table() {
    let conn = db::open_memory_database().unwrap();
    let tables = table_names(&conn);
    for expected in [
        "audit_log",
        "checkin_suggestions",
        "episodic_summaries",
        "journal_entries",
        "notification_settings",
        "preference_memories",
        "rate_limit_buckets",
        "schema_meta",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn schema_init_and_migrations_are_idempotent() {
    let conn = db::open_memory_database().unwrap();
    db::schema::init_schema(&conn).unwrap();
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn summaries_cascade_with_their_entry() {
    let conn = db::open_memory_database().unwrap();
    conn.execute_batch(
        "INSERT INTO journal_entries (id, user_id, content, created_at, updated_at)
         VALUES ('e1', 'u1', 'text', '2026-10-10T09:00:00.000Z', '2026-10-10T09:00:00.000Z');
         INSERT INTO episodic_summaries
            (id, user_id, journal_entry_id, summary, why_shown, created_at, updated_at)
         VALUES ('s1', 'u1', 'e1', 'text', 'why', '2026-10-10T09:00:00.000Z', '2026-10-10T09:00:00.000Z');
         DELETE FROM journal_entries WHERE id = 'e1';",
    )
    .unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM episodic_summaries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn check_constraints_guard_settings_and_status() {
    let conn = db::open_memory_database().unwrap();
    let bad_cap = conn.execute(
        "INSERT INTO notification_settings (user_id, check_in_max_per_day, created_at, updated_at)
         VALUES ('u1', 11, 'now', 'now')",
        [],
    );
    assert!(bad_cap.is_err());

    let bad_status = conn.execute(
        "INSERT INTO checkin_suggestions (id, user_id, message, why, reason_details, status, created_at, updated_at)
         VALUES ('c1', 'u1', 'm', 'w', '{}', 'archived', 'now', 'now')",
        [],
    );
    assert!(bad_status.is_err());
}
