//! MCP `recall_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall_memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallMemoryParams {
    #[schemars(description = "Actor id to recall for. Defaults to the configured default actor.")]
    pub actor: Option<String>,

    /// Case-insensitive substring. Empty or missing returns every memory.
    #[schemars(
        description = "Text to look for in topics, open loops, summaries and preferences (max 500 characters). Omit to list everything."
    )]
    pub query: Option<String>,
}
