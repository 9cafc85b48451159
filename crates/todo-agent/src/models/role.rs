use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// The author of a message in the transcript
pub enum Role {
    User,
    Assistant,
    /// Carries the results of the tool calls requested by the preceding assistant message
    Tool,
}
