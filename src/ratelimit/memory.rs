use anyhow::Result;
use dashmap::DashMap;

use super::{RateLimitBackend, RateLimitDecision, RateLimitRule};

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_started_at_ms: i64,
    window_ms: i64,
    count: u32,
}

/// Per-process fixed-window buckets.
///
/// Each consume holds the DashMap entry guard for its key for the whole
/// read-modify-write, so concurrent requests on one key cannot lose updates.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    buckets: DashMap<String, Bucket>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consume_at(&self, key: &str, rule: RateLimitRule, now_ms: i64) -> RateLimitDecision {
        let mut entry = self.buckets.entry(key.to_string()).or_insert(Bucket {
            window_started_at_ms: now_ms,
            window_ms: rule.window_ms,
            count: 0,
        });
        let bucket = entry.value_mut();

        if bucket.count == 0 || now_ms - bucket.window_started_at_ms >= rule.window_ms {
            *bucket = Bucket {
                window_started_at_ms: now_ms,
                window_ms: rule.window_ms,
                count: 1,
            };
            return RateLimitDecision {
                allowed: true,
                remaining: rule.max_requests.saturating_sub(1),
                reset_at_ms: now_ms + rule.window_ms,
            };
        }

        let reset_at_ms = bucket.window_started_at_ms + rule.window_ms;
        if bucket.count >= rule.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            };
        }

        bucket.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: rule.max_requests - bucket.count,
            reset_at_ms,
        }
    }

    #[cfg(test)]
    pub(crate) fn reset(&self) {
        self.buckets.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl RateLimitBackend for InMemoryBackend {
    fn consume(&self, key: &str, rule: RateLimitRule, now_ms: i64) -> Result<RateLimitDecision> {
        Ok(self.consume_at(key, rule, now_ms))
    }

    fn prune(&self, now_ms: i64) -> Result<usize> {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, b| now_ms - b.window_started_at_ms < b.window_ms);
        Ok(before - self.buckets.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
