use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Non-streaming response payload returned by the Messages API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ClaudeMessageResponse {
    /// Some compatibility layers omit the `id`, so keep it optional.
    #[serde(default)]
    pub(crate) id: Option<String>,
    /// Declared payload type; anything but `message` is a contract breach.
    #[serde(default)]
    pub(crate) r#type: String,
    #[serde(default)]
    pub(crate) model: Option<String>,
    /// Ordered list of content blocks.
    #[serde(default)]
    pub(crate) content: Vec<ClaudeContentBlock>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
    #[serde(default)]
    pub(crate) stop_sequence: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<ClaudeUsage>,
    /// Future fields kept for debugging.
    #[serde(flatten)]
    pub(crate) extra: HashMap<String, Value>,
}

/// Single content block; only `text` blocks contribute to the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ClaudeContentBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(flatten)]
    pub(crate) extra: HashMap<String, Value>,
}

/// Usage counters returned by the Messages API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ClaudeUsage {
    #[serde(default)]
    pub(crate) input_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cache_creation_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cache_read_input_tokens: Option<u64>,
    /// Accounting fields added after this crate was written.
    #[serde(flatten)]
    pub(crate) extra: HashMap<String, Value>,
}
