use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetMemoryParams {
    #[schemars(description = "Actor id that owns the memory. Defaults to the configured default actor.")]
    pub actor: Option<String>,

    #[schemars(description = "Memory type: 'episodic' (deleted) or 'preference' (revoked)")]
    pub memory_type: Option<String>,

    #[schemars(description = "ID of the memory to forget")]
    pub id: Option<String>,

    #[schemars(description = "Forget every memory for the actor instead of one (requires confirm=true)")]
    pub all: Option<bool>,

    #[schemars(description = "Must be true when all=true")]
    pub confirm: Option<bool>,
}
