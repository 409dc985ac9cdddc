use serde_json::Value;

use crate::error::ProviderError;
use crate::provider::ParsedResponse;

use super::PROVIDER_NAME;
use super::types::ClaudeMessageResponse;

/// Parses a 2xx Messages API body into the provider-agnostic form.
///
/// The payload must declare itself as a `message`; the generated text is the
/// in-order concatenation of every `text` content block. Usage counts, stop
/// reason, model id, and message id are surfaced for the tracking lifecycle.
pub(crate) fn parse_response(text: &str) -> Result<ParsedResponse, ProviderError> {
    let payload: ClaudeMessageResponse = serde_json::from_str(text).map_err(|err| {
        ProviderError::invalid_response(PROVIDER_NAME, format!("failed to parse response: {err}"))
    })?;

    if payload.r#type != "message" {
        return Err(ProviderError::invalid_response(
            PROVIDER_NAME,
            format!("unexpected payload type: {:?}", payload.r#type),
        ));
    }

    let mut content = String::new();
    for block in &payload.content {
        if block.kind == "text" {
            if let Some(text) = &block.text {
                content.push_str(text);
            }
        }
    }

    let usage = payload
        .usage
        .as_ref()
        .map(|usage| serde_json::to_value(usage).unwrap_or(Value::Null))
        .unwrap_or(Value::Null);

    Ok(ParsedResponse {
        content,
        input_tokens: payload.usage.as_ref().and_then(|usage| usage.input_tokens),
        output_tokens: payload.usage.as_ref().and_then(|usage| usage.output_tokens),
        usage,
        stop_reason: payload.stop_reason,
        model: payload.model,
        message_id: payload.id,
    })
}
