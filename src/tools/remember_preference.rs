//! MCP `remember_preference` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `remember_preference` MCP tool.
///
/// Nothing is stored unless `consent` is `true`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RememberPreferenceParams {
    #[schemars(description = "Actor id the preference belongs to. Defaults to the configured default actor.")]
    pub actor: Option<String>,

    #[schemars(description = "Preference name, unique per actor (1-128 characters)")]
    pub key: String,

    #[schemars(description = "Preference value: any JSON value")]
    pub value: serde_json::Value,

    #[schemars(description = "Where the preference came from (max 256 characters)")]
    pub source: Option<String>,

    /// Explicit user consent. `false` is rejected.
    #[schemars(description = "Must be true: the user explicitly agreed to store this preference")]
    pub consent: bool,
}
