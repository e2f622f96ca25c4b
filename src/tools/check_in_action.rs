//! MCP `check_in_action` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use daybook::checkin::CheckInAction;

/// Parameters for the `check_in_action` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CheckInActionParams {
    #[schemars(description = "Actor id. Defaults to the configured default actor.")]
    pub actor: Option<String>,

    #[schemars(description = "ID of the check-in suggestion")]
    pub suggestion_id: String,

    #[schemars(description = "One of 'dismiss', 'snooze', 'done'")]
    pub action: CheckInAction,

    /// Clamped to 1-30; only used by `snooze`.
    #[schemars(description = "Days to snooze for (1-30, default 1). Only used with 'snooze'.")]
    pub snooze_days: Option<u32>,
}
