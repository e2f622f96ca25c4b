//! MCP `write_journal_entry` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `write_journal_entry` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WriteJournalEntryParams {
    #[schemars(description = "Actor id to write as. Defaults to the configured default actor.")]
    pub actor: Option<String>,

    /// Entry text, 1-4000 characters after trimming.
    #[schemars(description = "The day's note (1-4000 characters)")]
    pub content: String,

    /// When set, edits this existing entry instead of creating a new one.
    #[schemars(description = "ID of an existing entry to replace. Omit to create a new entry.")]
    pub id: Option<String>,
}
