//! Async facade over the engine.
//!
//! [`Daybook`] owns the shared SQLite connection, the rate limiter and the
//! configuration. Every call hops onto the blocking pool, takes the connection
//! lock, checks the caller's quota and then runs the synchronous store code.

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::checkin::{self, CheckInAction, CheckInSettings, CheckInSuggestion, SchedulerRun};
use crate::config::{DaybookConfig, RateLimitConfig};
use crate::error::{EngineError, EngineResult};
use crate::journal::{self, JournalEntry};
use crate::memory::audit::{self, AuditLogEntry};
use crate::memory::forget::{self, DeleteAllResult};
use crate::memory::preference::{self, PreferenceWrite};
use crate::memory::recall::{self, RecallItem};
use crate::memory::types::{EntityType, MemoryType, PreferenceMemory};
use crate::pipeline::{self, PipelineOutcome, ProcessedEntry};
use crate::ratelimit::{self, RateLimitRule, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActorKind {
    User,
    Guest,
}

/// Whoever is acting. Both kinds are the same opaque user id to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub kind: ActorKind,
    pub actor_id: String,
}

impl Actor {
    pub fn user(actor_id: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::User,
            actor_id: actor_id.into(),
        }
    }

    pub fn guest(actor_id: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::Guest,
            actor_id: actor_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.actor_id
    }
}

/// Rate-limited operations. Bucket keys are `<operation>:<user_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Recall,
    JournalCreate,
    JournalUpdate,
    JournalDelete,
    JournalProcess,
    PreferenceWrite,
    MemoryDelete,
    MemoryDeleteAll,
    CheckinSettingsRead,
    CheckinSettingsUpdate,
    CheckinList,
    CheckinAction,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recall => "recall",
            Self::JournalCreate => "journal_create",
            Self::JournalUpdate => "journal_update",
            Self::JournalDelete => "journal_delete",
            Self::JournalProcess => "journal_process",
            Self::PreferenceWrite => "preference_write",
            Self::MemoryDelete => "memory_delete",
            Self::MemoryDeleteAll => "memory_delete_all",
            Self::CheckinSettingsRead => "checkin_settings_read",
            Self::CheckinSettingsUpdate => "checkin_settings_update",
            Self::CheckinList => "checkin_list",
            Self::CheckinAction => "checkin_action",
        }
    }

    pub fn rule(&self, limits: &RateLimitConfig) -> RateLimitRule {
        match self {
            Self::Recall => limits.recall,
            Self::JournalCreate => limits.journal_create,
            Self::JournalUpdate => limits.journal_update,
            Self::JournalDelete => limits.journal_delete,
            Self::JournalProcess => limits.journal_process,
            Self::PreferenceWrite => limits.preference_write,
            Self::MemoryDelete => limits.memory_delete,
            Self::MemoryDeleteAll => limits.memory_delete_all,
            Self::CheckinSettingsRead => limits.checkin_settings_read,
            Self::CheckinSettingsUpdate => limits.checkin_settings_update,
            Self::CheckinList => limits.checkin_list,
            Self::CheckinAction => limits.checkin_action,
        }
    }

    pub fn key(&self, user_id: &str) -> String {
        format!("{}:{user_id}", self.as_str())
    }
}

/// Preference write request, minus the user id which comes from the actor.
#[derive(Debug, Clone)]
pub struct PreferenceInput {
    pub key: String,
    pub value: serde_json::Value,
    pub source: Option<String>,
    pub consent_granted: bool,
    pub consent_given_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct Daybook {
    db: Arc<Mutex<Connection>>,
    limiter: Arc<RateLimiter>,
    config: Arc<DaybookConfig>,
}

impl Daybook {
    pub fn new(conn: Connection, limiter: RateLimiter, config: DaybookConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
        }
    }

    /// Open the configured database and rate-limit backend.
    pub fn open(config: DaybookConfig) -> anyhow::Result<Self> {
        config.rate_limit.validate()?;
        let db_path = config.resolved_db_path();
        let conn = crate::db::open_database(&db_path)?;
        let limiter = ratelimit::create_limiter(&config.rate_limit.backend, &db_path)
            .context("failed to create rate limiter")?;
        tracing::info!(
            db = %db_path.display(),
            rate_limit_backend = limiter.backend_name(),
            "daybook engine ready"
        );
        Ok(Self::new(conn, limiter, config))
    }

    pub fn config(&self) -> &DaybookConfig {
        &self.config
    }

    /// The actor to use when a caller names none.
    pub fn default_actor(&self) -> Actor {
        Actor::user(self.config.storage.default_actor.clone())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Connection) -> EngineResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| EngineError::Task(format!("db lock poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| EngineError::Task(format!("db task failed: {e}")))?
    }

    /// Like [`Self::with_conn`], charging one request to `op` for `actor` first.
    async fn guarded<T, F>(&self, op: Operation, actor: &Actor, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Connection, &str, DateTime<Utc>) -> EngineResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let limiter = Arc::clone(&self.limiter);
        let rule = op.rule(&self.config.rate_limit);
        let user_id = actor.user_id().to_string();

        self.with_conn(move |conn| {
            let now = Utc::now();
            let key = op.key(&user_id);
            let decision = limiter.consume(&key, rule, now.timestamp_millis());
            if !decision.allowed {
                return Err(EngineError::RateLimited { key, decision });
            }
            f(conn, &user_id, now)
        })
        .await
    }

    // ── Journal ────────────────────────────────────────────────────────────

    pub async fn write_journal_entry(
        &self,
        actor: &Actor,
        content: &str,
    ) -> EngineResult<ProcessedEntry> {
        journal::validate_content(content)?;
        let content = content.to_string();
        self.guarded(Operation::JournalCreate, actor, move |conn, user_id, now| {
            pipeline::record_entry(conn, user_id, &content, now)
        })
        .await
    }

    pub async fn update_journal_entry(
        &self,
        actor: &Actor,
        id: &str,
        content: &str,
    ) -> EngineResult<Option<ProcessedEntry>> {
        journal::validate_content(content)?;
        let (id, content) = (id.to_string(), content.to_string());
        self.guarded(Operation::JournalUpdate, actor, move |conn, user_id, now| {
            pipeline::revise_entry(conn, user_id, &id, &content, now)
        })
        .await
    }

    pub async fn delete_journal_entry(&self, actor: &Actor, id: &str) -> EngineResult<bool> {
        let id = id.to_string();
        self.guarded(Operation::JournalDelete, actor, move |conn, user_id, now| {
            journal::delete_entry(conn, user_id, &id, now)
        })
        .await
    }

    pub async fn get_journal_entry(
        &self,
        actor: &Actor,
        id: &str,
    ) -> EngineResult<Option<JournalEntry>> {
        let (user_id, id) = (actor.user_id().to_string(), id.to_string());
        self.with_conn(move |conn| journal::get_entry(conn, &user_id, &id))
            .await
    }

    pub async fn list_journal_entries(&self, actor: &Actor) -> EngineResult<Vec<JournalEntry>> {
        let user_id = actor.user_id().to_string();
        self.with_conn(move |conn| journal::list_entries(conn, &user_id))
            .await
    }

    /// Run the summary + check-in pipeline for an entry stored elsewhere.
    /// `None` when the actor does not own the entry.
    pub async fn on_journal_entry_created(
        &self,
        actor: &Actor,
        journal_entry_id: &str,
        content: &str,
    ) -> EngineResult<Option<PipelineOutcome>> {
        let (journal_entry_id, content) = (journal_entry_id.to_string(), content.to_string());
        self.guarded(Operation::JournalProcess, actor, move |conn, user_id, now| {
            pipeline::on_journal_entry_created(conn, user_id, &journal_entry_id, &content, now)
        })
        .await
    }

    // ── Memory ─────────────────────────────────────────────────────────────

    pub async fn recall(&self, actor: &Actor, query: &str) -> EngineResult<Vec<RecallItem>> {
        let query = query.to_string();
        self.guarded(Operation::Recall, actor, move |conn, user_id, _| {
            recall::recall(conn, user_id, &query)
        })
        .await
    }

    pub async fn delete_memory(
        &self,
        actor: &Actor,
        memory_type: MemoryType,
        id: &str,
    ) -> EngineResult<bool> {
        let id = id.to_string();
        self.guarded(Operation::MemoryDelete, actor, move |conn, user_id, now| {
            forget::delete_memory(conn, user_id, memory_type, &id, now)
        })
        .await
    }

    pub async fn delete_all_memories(&self, actor: &Actor) -> EngineResult<DeleteAllResult> {
        self.guarded(Operation::MemoryDeleteAll, actor, move |conn, user_id, now| {
            forget::delete_all_memories(conn, user_id, now)
        })
        .await
    }

    pub async fn write_preference_memory(
        &self,
        actor: &Actor,
        input: PreferenceInput,
    ) -> EngineResult<PreferenceMemory> {
        if !input.consent_granted {
            return Err(EngineError::ConsentRequired);
        }
        self.guarded(Operation::PreferenceWrite, actor, move |conn, user_id, now| {
            let write = PreferenceWrite {
                user_id: user_id.to_string(),
                key: input.key,
                value: input.value,
                source: input.source,
                consent_granted: input.consent_granted,
                consent_given_at: input.consent_given_at,
            };
            preference::write_preference_memory(conn, &write, now)
        })
        .await
    }

    // ── Check-ins ──────────────────────────────────────────────────────────

    pub async fn get_check_in_settings(&self, actor: &Actor) -> EngineResult<CheckInSettings> {
        self.guarded(Operation::CheckinSettingsRead, actor, move |conn, user_id, now| {
            checkin::get_settings(conn, user_id, now)
        })
        .await
    }

    pub async fn update_check_in_settings(
        &self,
        actor: &Actor,
        settings: CheckInSettings,
    ) -> EngineResult<CheckInSettings> {
        settings.validate()?;
        self.guarded(Operation::CheckinSettingsUpdate, actor, move |conn, user_id, now| {
            checkin::update_settings(conn, user_id, &settings, now)
        })
        .await
    }

    pub async fn list_active_check_in_suggestions(
        &self,
        actor: &Actor,
    ) -> EngineResult<Vec<CheckInSuggestion>> {
        self.guarded(Operation::CheckinList, actor, move |conn, user_id, now| {
            checkin::list_active(conn, user_id, now)
        })
        .await
    }

    pub async fn apply_check_in_suggestion_action(
        &self,
        actor: &Actor,
        suggestion_id: &str,
        action: CheckInAction,
        snooze_days: Option<u32>,
    ) -> EngineResult<Option<CheckInSuggestion>> {
        let suggestion_id = suggestion_id.to_string();
        self.guarded(Operation::CheckinAction, actor, move |conn, user_id, now| {
            checkin::apply_action(conn, user_id, &suggestion_id, action, snooze_days, now)
        })
        .await
    }

    /// Generate suggestions for every opted-in user. Called by an external trigger.
    pub async fn run_daily_check_in_scheduler(
        &self,
        now: Option<DateTime<Utc>>,
    ) -> EngineResult<SchedulerRun> {
        let now = now.unwrap_or_else(Utc::now);
        self.with_conn(move |conn| checkin::run_daily_scheduler(conn, now))
            .await
    }

    // ── Rate limits ────────────────────────────────────────────────────────

    /// Drop rate-limit buckets whose window has ended. Returns how many went.
    pub async fn prune_rate_limits(&self) -> EngineResult<usize> {
        let limiter = Arc::clone(&self.limiter);
        tokio::task::spawn_blocking(move || limiter.prune(Utc::now().timestamp_millis()))
            .await
            .map_err(|e| EngineError::Task(format!("prune task failed: {e}")))?
            .map_err(|e| EngineError::Task(format!("rate-limit prune failed: {e:#}")))
    }

    // ── Audit ──────────────────────────────────────────────────────────────

    pub async fn audit_log(
        &self,
        actor: &Actor,
        entity_type: Option<EntityType>,
        limit: usize,
    ) -> EngineResult<Vec<AuditLogEntry>> {
        let user_id = actor.user_id().to_string();
        self.with_conn(move |conn| audit::list_audit_log(conn, &user_id, entity_type, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_keys_are_operation_scoped() {
        assert_eq!(Operation::Recall.key("u1"), "recall:u1");
        assert_eq!(
            Operation::CheckinSettingsUpdate.key("g-7"),
            "checkin_settings_update:g-7"
        );
    }

    #[test]
    fn rules_come_from_config() {
        let limits = RateLimitConfig::default();
        assert_eq!(Operation::MemoryDeleteAll.rule(&limits).max_requests, 5);
        assert_eq!(Operation::CheckinList.rule(&limits).max_requests, 60);
    }

    #[test]
    fn guest_and_user_share_the_id_space() {
        assert_eq!(Actor::guest("abc").user_id(), Actor::user("abc").user_id());
    }
}
