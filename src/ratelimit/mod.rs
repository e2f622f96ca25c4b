//! Fixed-window rate limiting.
//!
//! Provides the [`RateLimitBackend`] trait with an in-process implementation
//! ([`memory::InMemoryBackend`]) and a shared SQLite implementation
//! ([`sqlite::SqliteBackend`]). [`RateLimiter`] fronts a backend and answers
//! from the in-process buckets whenever the shared backend fails.
//!
//! Windows are fixed, not sliding: a burst straddling a window boundary can
//! briefly see up to twice the quota.

pub mod memory;
pub mod sqlite;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::redact::redact_text;

/// Result of one consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Epoch milliseconds at which the current window ends.
    pub reset_at_ms: i64,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, never less than one.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = (self.reset_at_ms - now_ms).max(0) as u64;
        wait_ms.div_ceil(1000).max(1)
    }
}

/// Quota for one guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window_ms: i64,
}

impl RateLimitRule {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window_ms: 60_000,
        }
    }
}

/// A fixed-window counter store.
///
/// Each call must perform its read-modify-write atomically per key. All methods
/// are synchronous; async callers go through `spawn_blocking`.
pub trait RateLimitBackend: Send + Sync {
    fn consume(&self, key: &str, rule: RateLimitRule, now_ms: i64) -> Result<RateLimitDecision>;

    /// Drop buckets whose window ended before `now_ms`. Returns how many were removed.
    fn prune(&self, now_ms: i64) -> Result<usize>;

    fn name(&self) -> &'static str;
}

/// Rate limiter with an optional shared backend and an in-process fallback.
pub struct RateLimiter {
    shared: Option<Box<dyn RateLimitBackend>>,
    local: memory::InMemoryBackend,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("shared", &self.shared.as_ref().map(|b| b.name()))
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// In-process buckets only.
    pub fn in_memory() -> Self {
        Self {
            shared: None,
            local: memory::InMemoryBackend::new(),
        }
    }

    pub fn with_shared(shared: Box<dyn RateLimitBackend>) -> Self {
        Self {
            shared: Some(shared),
            local: memory::InMemoryBackend::new(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.shared.as_ref().map_or(self.local.name(), |b| b.name())
    }

    /// Count one request against `key`. Never fails; denials are logged.
    pub fn consume(&self, key: &str, rule: RateLimitRule, now_ms: i64) -> RateLimitDecision {
        let decision = match &self.shared {
            Some(shared) => match shared.consume(key, rule, now_ms) {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(
                        backend = shared.name(),
                        key = %redact_text(key),
                        error = %e,
                        "rate_limit.fallback"
                    );
                    self.local.consume_at(key, rule, now_ms)
                }
            },
            None => self.local.consume_at(key, rule, now_ms),
        };

        if !decision.allowed {
            tracing::warn!(
                key = %redact_text(key),
                max_requests = rule.max_requests,
                window_ms = rule.window_ms,
                reset_at_ms = decision.reset_at_ms,
                "rate_limit.blocked"
            );
        }

        decision
    }

    /// Prune expired buckets in every backend.
    pub fn prune(&self, now_ms: i64) -> Result<usize> {
        let mut removed = self.local.prune(now_ms)?;
        if let Some(shared) = &self.shared {
            removed += shared.prune(now_ms)?;
        }
        Ok(removed)
    }
}

/// Build a limiter for the configured backend name (`"memory"` or `"sqlite"`).
///
/// The SQLite backend opens its own connection to `db_path` so quota checks
/// never wait on the engine's connection lock.
pub fn create_limiter(backend: &str, db_path: &Path) -> Result<RateLimiter> {
    match backend {
        "memory" => Ok(RateLimiter::in_memory()),
        "sqlite" => {
            let shared = sqlite::SqliteBackend::open(db_path)
                .with_context(|| format!("failed to open rate-limit store at {}", db_path.display()))?;
            Ok(RateLimiter::with_shared(Box::new(shared)))
        }
        other => anyhow::bail!("unknown rate limit backend: {other}. Supported: memory, sqlite"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBackend;

    impl RateLimitBackend for FailingBackend {
        fn consume(&self, _: &str, _: RateLimitRule, _: i64) -> Result<RateLimitDecision> {
            anyhow::bail!("backend unavailable")
        }

        fn prune(&self, _: i64) -> Result<usize> {
            Ok(0)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn retry_after_rounds_up_and_floors_at_one() {
        let d = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at_ms: 10_500,
        };
        assert_eq!(d.retry_after_secs(10_000), 1);
        assert_eq!(d.retry_after_secs(7_000), 4);
        assert_eq!(d.retry_after_secs(20_000), 1);
    }

    #[test]
    fn failing_shared_backend_falls_back_to_local() {
        let limiter = RateLimiter::with_shared(Box::new(FailingBackend));
        let rule = RateLimitRule {
            max_requests: 1,
            window_ms: 1000,
        };
        assert!(limiter.consume("k", rule, 0).allowed);
        assert!(!limiter.consume("k", rule, 1).allowed);
        assert_eq!(limiter.backend_name(), "failing");
    }

    #[test]
    fn prune_evicts_expired_buckets_from_both_backends() {
        let shared = sqlite::SqliteBackend::from_connection(crate::db::open_memory_database().unwrap());
        let limiter = RateLimiter::with_shared(Box::new(shared));
        let failing = RateLimiter::with_shared(Box::new(FailingBackend));
        let rule = RateLimitRule {
            max_requests: 1,
            window_ms: 1000,
        };

        limiter.consume("old", rule, 0);
        limiter.consume("fresh", rule, 900);
        failing.consume("old", rule, 0);
        assert_eq!(failing.local.len(), 1);

        assert_eq!(limiter.prune(1500).unwrap(), 1);
        assert_eq!(failing.prune(1500).unwrap(), 1);
        assert!(failing.local.is_empty());

        // an evicted key starts a fresh window
        assert!(limiter.consume("old", rule, 1600).allowed);
        assert!(!limiter.consume("fresh", rule, 1600).allowed);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(create_limiter("redis", Path::new("/tmp/x.db")).is_err());
        assert_eq!(
            create_limiter("memory", Path::new("/tmp/x.db")).unwrap().backend_name(),
            "memory"
        );
    }
}
