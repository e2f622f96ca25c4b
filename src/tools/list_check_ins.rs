use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListCheckInsParams {
    #[schemars(description = "Actor id. Defaults to the configured default actor.")]
    pub actor: Option<String>,
}
