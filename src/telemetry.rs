//! Telemetry boundary for the request lifecycle.
//!
//! The adapters emit three structured events per call: start, complete, and
//! error. Consumers subscribe through any `tracing` subscriber; nothing here
//! returns a value or blocks the request path.

use crate::error::ProviderError;

/// Emitted immediately before the transport call is issued.
pub fn log_request_start(
    request_id: &str,
    provider: &str,
    model: &str,
    input_messages: usize,
    temperature: f32,
    max_tokens: Option<u32>,
) {
    tracing::info!(
        request_id,
        provider,
        model,
        input_messages,
        temperature,
        max_tokens,
        "generation request start"
    );
}

/// Emitted after a successful call with the fully accounted outcome.
pub fn log_request_complete(
    request_id: &str,
    provider: &str,
    model: &str,
    duration_ms: u64,
    tokens: u64,
    cost: f64,
) {
    tracing::info!(
        request_id,
        provider,
        model,
        duration_ms,
        tokens,
        cost_usd = cost,
        "generation request complete"
    );
}

/// Emitted when a call fails at any stage after validation.
pub fn log_request_error(request_id: &str, provider: &str, error: &ProviderError) {
    tracing::error!(
        request_id,
        provider,
        error = %error,
        "generation request failed"
    );
}
