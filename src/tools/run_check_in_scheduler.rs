use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RunCheckInSchedulerParams {
    #[schemars(description = "RFC 3339 timestamp to run the scheduler as of. Defaults to now.")]
    pub at: Option<String>,
}
