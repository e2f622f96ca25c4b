//! Shared fixed-window buckets in the `rate_limit_buckets` table.
//!
//! Several processes opening the same database file share quotas. Each consume
//! is a single `INSERT … ON CONFLICT DO UPDATE … RETURNING` statement, so the
//! read-modify-write is atomic without an explicit transaction.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use super::{RateLimitBackend, RateLimitDecision, RateLimitRule};

// The stored count saturates at max + 1; anything above max is a denial.
const CONSUME_SQL: &str = "\
INSERT INTO rate_limit_buckets (key, window_started_at_ms, window_ms, count)
VALUES (?1, ?2, ?3, 1)
ON CONFLICT(key) DO UPDATE SET
    window_started_at_ms = CASE
        WHEN ?2 - window_started_at_ms >= ?3 THEN ?2
        ELSE window_started_at_ms END,
    window_ms = ?3,
    count = CASE
        WHEN ?2 - window_started_at_ms >= ?3 THEN 1
        WHEN count > ?4 THEN count
        ELSE count + 1 END
RETURNING window_started_at_ms, count";

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open a dedicated connection with schema and migrations applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = crate::db::open_database(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl RateLimitBackend for SqliteBackend {
    fn consume(&self, key: &str, rule: RateLimitRule, now_ms: i64) -> Result<RateLimitDecision> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("rate-limit connection lock poisoned: {e}"))?;

        let (window_started_at_ms, count): (i64, u32) = conn
            .query_row(
                CONSUME_SQL,
                params![key, now_ms, rule.window_ms, rule.max_requests],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("rate-limit bucket update failed")?;

        Ok(RateLimitDecision {
            allowed: count <= rule.max_requests,
            remaining: rule.max_requests.saturating_sub(count),
            reset_at_ms: window_started_at_ms + rule.window_ms,
        })
    }

    fn prune(&self, now_ms: i64) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("rate-limit connection lock poisoned: {e}"))?;
        let removed = conn.execute(
            "DELETE FROM rate_limit_buckets WHERE ?1 - window_started_at_ms >= window_ms",
            params![now_ms],
        )?;
        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
