use futures_util::StreamExt;
use serde_json::Value;

use crate::error::ProviderError;
use crate::http::HttpBodyStream;
use crate::provider::TextStream;
use crate::stream::{StreamDecoder, StreamEvent};

use super::PROVIDER_NAME;

/// Turns a streaming Messages API body into text fragments.
///
/// Events of type `content_block_delta` carrying a text delta yield their
/// fragment; every other event, and any `data:` payload that fails JSON
/// parsing, is skipped without aborting the stream. `[DONE]` ends the
/// sequence. Transport errors are logged and passed through to the consumer.
pub(crate) fn text_fragment_stream(body: HttpBodyStream) -> TextStream {
    let decoder = StreamDecoder::new(body, PROVIDER_NAME);
    let fragments = decoder
        .take_while(|event| {
            let keep = !matches!(event, Ok(StreamEvent::Done));
            async move { keep }
        })
        .filter_map(|event| async move {
            match event {
                Ok(StreamEvent::Data(data)) => extract_text_delta(&data).map(Ok),
                Ok(StreamEvent::Done) => None,
                Err(err) => {
                    tracing::error!(provider = PROVIDER_NAME, error = %err, "stream failed");
                    Some(Err(err))
                }
            }
        });
    Box::pin(fragments)
}

/// Pulls the text fragment out of one SSE data payload, if it has one.
///
/// Malformed JSON yields `None` so a single bad event never kills the
/// stream.
fn extract_text_delta(data: &str) -> Option<String> {
    let event: Value = serde_json::from_str(data).ok()?;
    if event.get("type").and_then(Value::as_str) != Some("content_block_delta") {
        return None;
    }
    event
        .get("delta")
        .and_then(|delta| delta.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Buffers the whole body of a failed streaming call so the error payload
/// can be surfaced.
pub(crate) async fn collect_stream_text(mut body: HttpBodyStream) -> Result<String, ProviderError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    String::from_utf8(bytes).map_err(|err| {
        ProviderError::invalid_response(
            PROVIDER_NAME,
            format!("failed to decode stream error body: {err}"),
        )
    })
}
