//! Error taxonomy shared by every engine operation.
//!
//! Ownership or existence misses are deliberately *not* errors: lookups return
//! `Option`/`bool` so a boundary can map them to a 404 without treating them
//! as failures.

use thiserror::Error;

use crate::ratelimit::RateLimitDecision;

/// Errors returned by the memory and check-in engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any store access.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Preference write attempted without explicit consent.
    #[error("preference memory requires explicit user consent")]
    ConsentRequired,

    /// Quota for `key` is exhausted until `decision.reset_at_ms`.
    #[error("rate limit exceeded for '{key}'")]
    RateLimited {
        key: String,
        decision: RateLimitDecision,
    },

    /// A check-in action was applied to a suggestion that is not pending.
    #[error("cannot {action} a check-in suggestion that is {from}")]
    InvalidTransition { from: String, action: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking store task panicked or the connection lock was poisoned.
    #[error("task failed: {0}")]
    Task(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// HTTP status a transport boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::ConsentRequired => 400,
            Self::InvalidTransition { .. } => 409,
            Self::RateLimited { .. } => 429,
            Self::Storage(_) | Self::Serialization(_) | Self::Task(_) => 500,
        }
    }

    /// `Retry-After` hint in whole seconds, only for rate-limit denials.
    pub fn retry_after_secs(&self, now_ms: i64) -> Option<u64> {
        match self {
            Self::RateLimited { decision, .. } => Some(decision.retry_after_secs(now_ms)),
            _ => None,
        }
    }

    /// Short machine-readable code, used in tool responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ConsentRequired => "consent_required",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Storage(_) | Self::Serialization(_) | Self::Task(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_boundary_mapping() {
        assert_eq!(EngineError::Validation("bad".into()).status_code(), 400);
        assert_eq!(EngineError::ConsentRequired.status_code(), 400);
        assert_eq!(
            EngineError::InvalidTransition {
                from: "done".into(),
                action: "snooze".into()
            }
            .status_code(),
            409
        );
        assert_eq!(EngineError::Task("boom".into()).status_code(), 500);
    }

    #[test]
    fn rate_limited_exposes_retry_after() {
        let err = EngineError::RateLimited {
            key: "recall:u1".into(),
            decision: RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms: 10_500,
            },
        };
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.retry_after_secs(10_000), Some(1));
        assert_eq!(err.retry_after_secs(7_000), Some(4));
        assert_eq!(EngineError::ConsentRequired.retry_after_secs(0), None);
    }

    #[test]
    fn consent_error_display() {
        assert_eq!(
            EngineError::ConsentRequired.to_string(),
            "preference memory requires explicit user consent"
        );
    }
}
