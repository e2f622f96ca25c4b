pub mod audit_log;
pub mod check_in_action;
pub mod check_in_settings;
pub mod forget_memory;
pub mod list_check_ins;
pub mod recall_memory;
pub mod remember_preference;
pub mod run_check_in_scheduler;
pub mod write_journal_entry;

use audit_log::AuditLogParams;
use check_in_action::CheckInActionParams;
use check_in_settings::CheckInSettingsParams;
use forget_memory::ForgetMemoryParams;
use list_check_ins::ListCheckInsParams;
use recall_memory::RecallMemoryParams;
use remember_preference::RememberPreferenceParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use run_check_in_scheduler::RunCheckInSchedulerParams;
use serde::Serialize;
use write_journal_entry::WriteJournalEntryParams;

use daybook::engine::{Actor, Daybook, PreferenceInput};
use daybook::error::EngineError;
use daybook::memory::types::{EntityType, MemoryType};
use daybook::redact::redact_text;

const DEFAULT_AUDIT_LIMIT: usize = 20;
const MAX_AUDIT_LIMIT: usize = 100;

/// The daybook MCP tool handler. Wraps the [`Daybook`] engine and exposes
/// its operations via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct DaybookTools {
    tool_router: ToolRouter<Self>,
    engine: Daybook,
}

/// Render an engine error as the tool's error string.
fn tool_error(err: EngineError) -> String {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let mut body = serde_json::json!({
        "error": err.code(),
        "status": err.status_code(),
        "message": redact_text(&err.to_string()),
    });
    if let Some(secs) = err.retry_after_secs(now_ms) {
        body["retryAfterSecs"] = secs.into();
    }
    if err.status_code() >= 500 {
        tracing::error!(error = %err, "tool call failed");
    }
    body.to_string()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

fn not_found(what: &str) -> String {
    serde_json::json!({ "error": "not_found", "status": 404, "message": format!("{what} not found") })
        .to_string()
}

#[tool_router]
impl DaybookTools {
    pub fn new(engine: Daybook) -> Self {
        Self {
            tool_router: Self::tool_router(),
            engine,
        }
    }

    fn actor(&self, requested: Option<String>) -> Actor {
        match requested {
            Some(id) if !id.trim().is_empty() => Actor::user(id.trim()),
            _ => self.engine.default_actor(),
        }
    }

    /// Write or edit a journal entry, then summarize it and maybe suggest a check-in.
    #[tool(description = "Write a daily journal entry (or edit one by id). The entry is summarized into episodic memory and may produce a check-in suggestion.")]
    async fn write_journal_entry(
        &self,
        Parameters(params): Parameters<WriteJournalEntryParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);
        tracing::info!(content_len = params.content.len(), edit = params.id.is_some(), "write_journal_entry called");

        match params.id {
            Some(id) => {
                let processed = self
                    .engine
                    .update_journal_entry(&actor, &id, &params.content)
                    .await
                    .map_err(tool_error)?
                    .ok_or_else(|| not_found("journal entry"))?;
                to_json(&processed)
            }
            None => {
                let processed = self
                    .engine
                    .write_journal_entry(&actor, &params.content)
                    .await
                    .map_err(tool_error)?;
                to_json(&processed)
            }
        }
    }

    /// Search episodic and preference memory with "why shown" reasons.
    #[tool(description = "Recall memories matching a query. Each result says why it matched: 'topic overlap', 'open loop' or 'query match'.")]
    async fn recall_memory(
        &self,
        Parameters(params): Parameters<RecallMemoryParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);
        let query = params.query.unwrap_or_default();
        let items = self.engine.recall(&actor, &query).await.map_err(tool_error)?;

        tracing::info!(results = items.len(), "recall_memory complete");
        to_json(&serde_json::json!({ "items": items, "total": items.len() }))
    }

    /// Delete one memory, or all of them.
    #[tool(description = "Forget a memory by type and id (episodic summaries are deleted, preferences revoked), or everything with all=true and confirm=true.")]
    async fn forget_memory(
        &self,
        Parameters(params): Parameters<ForgetMemoryParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);

        if params.all.unwrap_or(false) {
            if !params.confirm.unwrap_or(false) {
                return Err(tool_error(EngineError::Validation(
                    "forgetting all memories requires confirm=true".into(),
                )));
            }
            let result = self.engine.delete_all_memories(&actor).await.map_err(tool_error)?;
            return to_json(&result);
        }

        let (Some(memory_type), Some(id)) = (params.memory_type, params.id) else {
            return Err(tool_error(EngineError::Validation(
                "memory_type and id are required unless all=true".into(),
            )));
        };
        let memory_type: MemoryType = memory_type
            .parse()
            .map_err(|e: String| tool_error(EngineError::Validation(e)))?;

        let deleted = self
            .engine
            .delete_memory(&actor, memory_type, &id)
            .await
            .map_err(tool_error)?;
        if !deleted {
            return Err(not_found("memory"));
        }
        to_json(&serde_json::json!({ "id": id, "memoryType": memory_type, "deleted": true }))
    }

    /// Store a consented preference.
    #[tool(description = "Remember a user preference as a key/value pair. Only call with consent=true after the user explicitly agreed.")]
    async fn remember_preference(
        &self,
        Parameters(params): Parameters<RememberPreferenceParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);
        let input = PreferenceInput {
            key: params.key,
            value: params.value,
            source: params.source,
            consent_granted: params.consent,
            consent_given_at: None,
        };
        let preference = self
            .engine
            .write_preference_memory(&actor, input)
            .await
            .map_err(tool_error)?;
        to_json(&preference)
    }

    /// Read or replace proactive check-in settings.
    #[tool(description = "Read the actor's proactive check-in settings, or replace them when 'settings' is given.")]
    async fn check_in_settings(
        &self,
        Parameters(params): Parameters<CheckInSettingsParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);
        let settings = match params.settings {
            Some(settings) => self.engine.update_check_in_settings(&actor, settings).await,
            None => self.engine.get_check_in_settings(&actor).await,
        }
        .map_err(tool_error)?;
        to_json(&settings)
    }

    /// Active check-in suggestions.
    #[tool(description = "List the actor's active check-in suggestions (pending, or snoozed past their snooze time), newest first.")]
    async fn list_check_ins(
        &self,
        Parameters(params): Parameters<ListCheckInsParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);
        let suggestions = self
            .engine
            .list_active_check_in_suggestions(&actor)
            .await
            .map_err(tool_error)?;
        to_json(&serde_json::json!({ "suggestions": suggestions }))
    }

    /// Dismiss, snooze or complete a suggestion.
    #[tool(description = "Respond to a check-in suggestion: dismiss, snooze (for snooze_days) or done.")]
    async fn check_in_action(
        &self,
        Parameters(params): Parameters<CheckInActionParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);
        let updated = self
            .engine
            .apply_check_in_suggestion_action(
                &actor,
                &params.suggestion_id,
                params.action,
                params.snooze_days,
            )
            .await
            .map_err(tool_error)?
            .ok_or_else(|| not_found("check-in suggestion"))?;
        to_json(&updated)
    }

    /// Trigger the daily scheduler.
    #[tool(description = "Run the daily check-in scheduler for every opted-in user. Returns processed/created/failed counts.")]
    async fn run_check_in_scheduler(
        &self,
        Parameters(params): Parameters<RunCheckInSchedulerParams>,
    ) -> Result<String, String> {
        let at = params
            .at
            .map(|raw| {
                chrono::DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .map_err(|e| tool_error(EngineError::Validation(format!("invalid 'at': {e}"))))
            })
            .transpose()?;
        let run = self
            .engine
            .run_daily_check_in_scheduler(at)
            .await
            .map_err(tool_error)?;
        to_json(&run)
    }

    /// Recent audit events.
    #[tool(description = "Show the actor's most recent audit events (memory changes and check-in decisions), newest first.")]
    async fn audit_log(
        &self,
        Parameters(params): Parameters<AuditLogParams>,
    ) -> Result<String, String> {
        let actor = self.actor(params.actor);
        let entity_type = params
            .entity_type
            .map(|raw| raw.parse::<EntityType>())
            .transpose()
            .map_err(|e| tool_error(EngineError::Validation(e)))?;
        let limit = params
            .limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT);

        let events = self
            .engine
            .audit_log(&actor, entity_type, limit)
            .await
            .map_err(tool_error)?;
        to_json(&serde_json::json!({ "events": events }))
    }
}

#[tool_handler]
impl ServerHandler for DaybookTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Daybook turns daily journal notes into explainable memory. Use \
                 write_journal_entry to record a day, recall_memory to search, and \
                 list_check_ins to see proactive check-in suggestions."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
