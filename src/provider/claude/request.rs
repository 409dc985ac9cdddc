use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::types::{GenerationRequest, Role};

/// Applied when the caller leaves `max_tokens` unset; the Messages API
/// requires the field.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Builds the Messages API request body.
///
/// At most one *leading* system message is lifted into the top-level
/// `system` field; every other message keeps its role/content pair in
/// order. Sampling parameters pass through unchanged.
pub(crate) fn build_claude_body(
    request: &GenerationRequest,
    model: &str,
    stream: bool,
) -> Result<Value, ProviderError> {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));

    let mut system: Option<&str> = None;
    let mut messages = Vec::new();
    for (idx, message) in request.messages.iter().enumerate() {
        if idx == 0 && message.role == Role::System {
            system = Some(&message.content);
            continue;
        }
        let mut entry = Map::new();
        entry.insert(
            "role".to_string(),
            Value::String(message.role.as_str().to_string()),
        );
        entry.insert(
            "content".to_string(),
            Value::String(message.content.clone()),
        );
        messages.push(Value::Object(entry));
    }

    if messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "request requires at least one non-system message",
        ));
    }
    body.insert("messages".to_string(), Value::Array(messages));

    if let Some(system) = system {
        body.insert("system".to_string(), Value::String(system.to_string()));
    }

    body.insert(
        "max_tokens".to_string(),
        Value::from(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    );
    body.insert("temperature".to_string(), Value::from(request.temperature));
    body.insert("top_p".to_string(), Value::from(request.top_p));

    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
    }

    Ok(Value::Object(body))
}
