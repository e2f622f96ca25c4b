//! MCP `check_in_settings` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use daybook::checkin::CheckInSettings;

/// Parameters for the `check_in_settings` MCP tool.
///
/// Without `settings` the current values are returned; with it they are replaced.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CheckInSettingsParams {
    #[schemars(description = "Actor id. Defaults to the configured default actor.")]
    pub actor: Option<String>,

    #[schemars(description = "New settings. Omit to read the current settings.")]
    pub settings: Option<CheckInSettings>,
}
