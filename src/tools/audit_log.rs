//! MCP `audit_log` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `audit_log` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AuditLogParams {
    #[schemars(description = "Actor id. Defaults to the configured default actor.")]
    pub actor: Option<String>,

    #[schemars(
        description = "Only entries about this entity: 'JournalEntry', 'EpisodicSummary', 'PreferenceMemory', 'NotificationSetting', 'CheckInSuggestion'"
    )]
    pub entity_type: Option<String>,

    /// 1-100, default 20.
    #[schemars(description = "Maximum entries to return (1-100). Defaults to 20.")]
    pub limit: Option<usize>,
}
