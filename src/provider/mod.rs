//! Provider adapter contract and the shared request lifecycle.
//!
//! Every backend implements [`Provider`]; the trait supplies generic cost,
//! validation, and capability defaults so a concrete adapter only writes the
//! wire-format-specific pieces. [`request_with_tracking`] reproduces the
//! shared validate → call → account → log lifecycle by composition: the
//! adapter passes its shaping+transport+parsing future in, the routine owns
//! request ids, latency measurement, token accounting, and telemetry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::telemetry;
use crate::types::{ChatMessage, GenerationRequest, GenerationResponse, HealthCheck, ProviderType};

pub mod claude;

/// Lazy, finite, non-restartable sequence of incremental text fragments.
///
/// Fragments arrive in wire order. Dropping the stream drops the underlying
/// connection, so an abandoned consumer releases the socket promptly.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Contract every backend adapter implements.
///
/// Adapters are immutable after construction: the only state is the shared,
/// read-only [`ProviderConfig`], so any number of calls may run concurrently
/// on one instance.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Read-only configuration the adapter was constructed with.
    fn config(&self) -> &ProviderConfig;

    /// Wire-level provider name used in errors and telemetry.
    fn name(&self) -> &'static str {
        self.config().provider.as_str()
    }

    /// Issues a generation call and waits for the complete response.
    ///
    /// Implementations validate the request first, then run the
    /// provider-specific shaping/transport/parsing pipeline through
    /// [`request_with_tracking`].
    async fn generate(&self, request: &GenerationRequest)
    -> Result<GenerationResponse, ProviderError>;

    /// Issues a generation call and returns incremental text fragments.
    async fn generate_stream(&self, request: &GenerationRequest)
    -> Result<TextStream, ProviderError>;

    /// Live probe against the backend; never fails, failures become an
    /// unhealthy [`HealthCheck`] record.
    async fn health_check(&self) -> HealthCheck;

    /// Cost in USD as a pure function of the token counts and configured
    /// per-million rates.
    fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        token_cost(self.config(), input_tokens, output_tokens)
    }

    /// Validates a request before any network call.
    ///
    /// The range checks duplicate what [`GenerationRequest::builder`] already
    /// enforces; requests arriving through deserialization still get caught
    /// here.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidRequest`] when messages are empty,
    /// the estimated input plus requested output tokens exceed the
    /// configured context budget, or a sampling parameter is out of range.
    fn validate_request(&self, request: &GenerationRequest) -> Result<(), ProviderError> {
        if request.messages.is_empty() {
            return Err(ProviderError::invalid_request("messages cannot be empty"));
        }

        let estimated = estimate_messages_tokens(&request.messages);
        if let Some(max_tokens) = request.max_tokens {
            let budget = u64::from(self.config().max_tokens);
            if estimated + u64::from(max_tokens) > budget {
                return Err(ProviderError::invalid_request(format!(
                    "token limit exceeded: {} > {budget}",
                    estimated + u64::from(max_tokens)
                )));
            }
        }

        if !(0.0..=2.0).contains(&request.temperature) {
            return Err(ProviderError::invalid_request(
                "temperature must be between 0 and 2",
            ));
        }
        if !(0.0..=1.0).contains(&request.top_p) {
            return Err(ProviderError::invalid_request(
                "top_p must be between 0 and 1",
            ));
        }
        Ok(())
    }

    /// Whether the adapter implements [`Provider::generate_stream`].
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Whether the backend accepts function/tool definitions.
    fn supports_function_calling(&self) -> bool {
        false
    }

    /// Read-only snapshot of the configuration plus capability flags.
    fn provider_info(&self) -> ProviderInfo {
        let config = self.config();
        ProviderInfo {
            provider: config.provider,
            model: config.model_name.clone(),
            base_url: config.base_url.clone(),
            max_tokens: config.max_tokens,
            cost_per_1m_input_tokens: config.cost_per_1m_input_tokens,
            cost_per_1m_output_tokens: config.cost_per_1m_output_tokens,
            supports_streaming: self.supports_streaming(),
            supports_function_calling: self.supports_function_calling(),
            is_active: config.is_active,
        }
    }

    /// Read-only snapshot of the rate-limit metadata carried in the config.
    fn rate_limit_info(&self) -> RateLimitInfo {
        let config = self.config();
        RateLimitInfo {
            provider: config.provider,
            model: config.model_name.clone(),
            rate_limit_per_minute: config.rate_limit_per_minute,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

/// Thread-safe handle to an adapter.
pub type DynProvider = Arc<dyn Provider>;

/// Capability and pricing snapshot returned by [`Provider::provider_info`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider: ProviderType,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub cost_per_1m_input_tokens: f64,
    pub cost_per_1m_output_tokens: f64,
    pub supports_streaming: bool,
    pub supports_function_calling: bool,
    pub is_active: bool,
}

/// Rate-limit metadata snapshot returned by [`Provider::rate_limit_info`].
///
/// Pure data for an external router; nothing in this crate enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub provider: ProviderType,
    pub model: String,
    pub rate_limit_per_minute: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Estimates tokens for a piece of text as `chars / 4` (integer division).
///
/// A coarse proxy, not real tokenization. The ratio is load-bearing: the
/// budget check in [`Provider::validate_request`] and the accounting
/// fallback both depend on exactly this approximation.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}

/// Estimates tokens for a message list from the total content length.
pub fn estimate_messages_tokens(messages: &[ChatMessage]) -> u64 {
    let total_chars: usize = messages.iter().map(|msg| msg.content.chars().count()).sum();
    (total_chars / 4) as u64
}

/// `input/1e6 * rate_in + output/1e6 * rate_out`, in USD.
pub(crate) fn token_cost(config: &ProviderConfig, input_tokens: u64, output_tokens: u64) -> f64 {
    let input_cost = input_tokens as f64 / 1_000_000.0 * config.cost_per_1m_input_tokens;
    let output_cost = output_tokens as f64 / 1_000_000.0 * config.cost_per_1m_output_tokens;
    input_cost + output_cost
}

/// Provider-agnostic view of one successfully parsed response.
///
/// Adapters fill in what their wire format reports; the tracking lifecycle
/// substitutes estimates for whatever is missing.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    /// Full generated text.
    pub content: String,
    /// Provider-reported input token count, when the usage payload had one.
    pub input_tokens: Option<u64>,
    /// Provider-reported output token count, when the usage payload had one.
    pub output_tokens: Option<u64>,
    /// Raw usage block exactly as the provider sent it.
    pub usage: Value,
    /// Why generation stopped, in the provider's vocabulary.
    pub stop_reason: Option<String>,
    /// Model identifier echoed by the provider.
    pub model: Option<String>,
    /// Provider-assigned message id.
    pub message_id: Option<String>,
}

/// Shared request lifecycle wrapped around every non-streaming call.
///
/// Mints a request id, emits the start event, awaits the adapter's
/// shaping+transport+parsing future while measuring wall-clock latency,
/// accounts tokens and cost, and assembles the [`GenerationResponse`].
/// Failures are logged through the telemetry boundary and propagated
/// unchanged; nothing is swallowed. The future is not polled before the
/// start event fires, so the events bracket the actual work.
pub async fn request_with_tracking<Fut>(
    config: &ProviderConfig,
    request: &GenerationRequest,
    call: Fut,
) -> Result<GenerationResponse, ProviderError>
where
    Fut: Future<Output = Result<ParsedResponse, ProviderError>>,
{
    let request_id = Uuid::new_v4().to_string();
    let provider = config.provider.as_str();

    telemetry::log_request_start(
        &request_id,
        provider,
        &config.model_name,
        request.messages.len(),
        request.temperature,
        request.max_tokens,
    );

    let started = Instant::now();
    let parsed = match call.await {
        Ok(parsed) => parsed,
        Err(err) => {
            telemetry::log_request_error(&request_id, provider, &err);
            return Err(err);
        }
    };
    let processing_time_ms = started.elapsed().as_millis() as u64;

    // Prefer provider-reported counts; fall back to the chars/4 estimate.
    let input_tokens = parsed
        .input_tokens
        .unwrap_or_else(|| estimate_messages_tokens(&request.messages));
    let output_tokens = parsed
        .output_tokens
        .unwrap_or_else(|| estimate_tokens(&parsed.content));
    let cost_usd = token_cost(config, input_tokens, output_tokens);

    let metadata = HashMap::from([
        (
            "request".to_string(),
            json!({
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
                "top_p": request.top_p,
            }),
        ),
        (
            "response".to_string(),
            json!({
                "usage": parsed.usage,
                "stop_reason": parsed.stop_reason,
                "model": parsed.model,
                "id": parsed.message_id,
            }),
        ),
    ]);

    telemetry::log_request_complete(
        &request_id,
        provider,
        &config.model_name,
        processing_time_ms,
        input_tokens + output_tokens,
        cost_usd,
    );

    Ok(GenerationResponse {
        request_id,
        content: parsed.content,
        provider_used: config.provider,
        model_used: config.model_name.clone(),
        input_tokens,
        output_tokens,
        cost_usd,
        processing_time_ms,
        cached: false,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    struct StubProvider {
        config: ProviderConfig,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn config(&self) -> &ProviderConfig {
            &self.config
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, ProviderError> {
            self.validate_request(request)?;
            request_with_tracking(&self.config, request, async {
                Ok(ParsedResponse {
                    content: "stub response".to_string(),
                    input_tokens: Some(10),
                    output_tokens: Some(5),
                    usage: json!({"input_tokens": 10, "output_tokens": 5}),
                    stop_reason: Some("end_turn".to_string()),
                    model: Some(self.config.model_name.clone()),
                    message_id: Some("msg_stub".to_string()),
                })
            })
            .await
        }

        async fn generate_stream(
            &self,
            _request: &GenerationRequest,
        ) -> Result<TextStream, ProviderError> {
            Err(ProviderError::invalid_request("stub has no stream"))
        }

        async fn health_check(&self) -> HealthCheck {
            HealthCheck::healthy(self.config.provider, &self.config.model_name, 0, None)
        }
    }

    fn stub_config() -> ProviderConfig {
        ProviderConfig::new(
            ProviderType::Claude,
            "claude-3-5-haiku-20241022",
            "test-key",
            "https://api.anthropic.com",
        )
        .with_cost_per_1m_tokens(0.25, 1.25)
        .with_max_tokens(8192)
    }

    fn stub_provider() -> StubProvider {
        StubProvider {
            config: stub_config(),
        }
    }

    fn request_with(messages: Vec<ChatMessage>) -> GenerationRequest {
        GenerationRequest::builder()
            .messages(messages)
            .build()
            .expect("valid request")
    }

    #[test]
    fn estimate_tokens_is_char_count_over_four() {
        let text = "Hello world! This is a test.";
        assert_eq!(estimate_tokens(text), (text.chars().count() / 4) as u64);
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
    }

    #[test]
    fn estimate_messages_tokens_sums_content_lengths() {
        let messages = vec![
            ChatMessage::system("You are helpful"),
            ChatMessage::user("Hello world"),
        ];
        let total_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        assert_eq!(estimate_messages_tokens(&messages), (total_chars / 4) as u64);
    }

    #[test]
    fn calculate_cost_matches_documented_example() {
        let provider = stub_provider();
        // (1000 * 0.25 + 500 * 1.25) / 1M = 0.000875
        let cost = provider.calculate_cost(1000, 500);
        assert!((cost - 0.000875).abs() < 1e-12, "unexpected cost: {cost}");
    }

    #[test]
    fn calculate_cost_is_zero_for_zero_tokens() {
        assert_eq!(stub_provider().calculate_cost(0, 0), 0.0);
    }

    #[test]
    fn calculate_cost_is_linear_in_each_argument() {
        let provider = stub_provider();
        let base = provider.calculate_cost(100, 100);
        assert!((provider.calculate_cost(200, 100) - base - provider.calculate_cost(100, 0)).abs() < 1e-12);
        assert!(provider.calculate_cost(100, 200) > base);
        assert!(provider.calculate_cost(200, 100) > base);
    }

    #[test]
    fn validate_request_rejects_token_budget_overflow() {
        let provider = stub_provider();
        // 8000 chars => 2000 estimated input tokens.
        let request = GenerationRequest::builder()
            .message(ChatMessage::user("x".repeat(8000)))
            .max_tokens(8192 - 2000 + 1)
            .build()
            .expect("valid request");
        let err = provider
            .validate_request(&request)
            .expect_err("over budget must fail");
        assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    }

    #[test]
    fn validate_request_accepts_exact_token_budget() {
        let provider = stub_provider();
        let request = GenerationRequest::builder()
            .message(ChatMessage::user("x".repeat(8000)))
            .max_tokens(8192 - 2000)
            .build()
            .expect("valid request");
        assert!(provider.validate_request(&request).is_ok());
    }

    #[test]
    fn validate_request_without_max_tokens_skips_budget_check() {
        let provider = stub_provider();
        let request = request_with(vec![ChatMessage::user("x".repeat(100_000))]);
        assert!(provider.validate_request(&request).is_ok());
    }

    #[test]
    fn provider_info_reflects_config_and_capabilities() {
        let provider = stub_provider();
        let info = provider.provider_info();
        assert_eq!(info.provider, ProviderType::Claude);
        assert_eq!(info.model, "claude-3-5-haiku-20241022");
        assert_eq!(info.max_tokens, 8192);
        assert!(info.supports_streaming);
        assert!(!info.supports_function_calling);
        assert!(info.is_active);
    }

    #[test]
    fn rate_limit_info_carries_config_data() {
        let info = stub_provider().rate_limit_info();
        assert_eq!(info.rate_limit_per_minute, 60);
        assert_eq!(info.timeout_secs, 30);
        assert_eq!(info.max_retries, 3);
    }

    #[tokio::test]
    async fn tracking_prefers_provider_reported_token_counts() {
        let config = stub_config();
        let request = request_with(vec![ChatMessage::user("Hello, how are you today?")]);

        let response = request_with_tracking(&config, &request, async {
            Ok(ParsedResponse {
                content: "Fine, thanks!".to_string(),
                input_tokens: Some(42),
                output_tokens: Some(7),
                usage: json!({"input_tokens": 42, "output_tokens": 7}),
                stop_reason: Some("end_turn".to_string()),
                model: Some("claude-3-5-haiku-20241022".to_string()),
                message_id: Some("msg_1".to_string()),
            })
        })
        .await
        .expect("tracking succeeds");

        assert_eq!(response.input_tokens, 42);
        assert_eq!(response.output_tokens, 7);
        let expected_cost = token_cost(&config, 42, 7);
        assert_eq!(response.cost_usd, expected_cost);
        assert_eq!(response.provider_used, ProviderType::Claude);
        assert!(!response.cached);
        assert!(!response.request_id.is_empty());
    }

    #[tokio::test]
    async fn tracking_falls_back_to_char_estimates() {
        let config = stub_config();
        let user_text = "Tell me about Rust ownership, please.";
        let request = request_with(vec![ChatMessage::user(user_text)]);
        let content = "Ownership is the core memory model of Rust.";

        let response = request_with_tracking(&config, &request, async {
            Ok(ParsedResponse {
                content: content.to_string(),
                ..ParsedResponse::default()
            })
        })
        .await
        .expect("tracking succeeds");

        assert_eq!(
            response.input_tokens,
            (user_text.chars().count() / 4) as u64
        );
        assert_eq!(response.output_tokens, (content.chars().count() / 4) as u64);
    }

    #[tokio::test]
    async fn tracking_embeds_request_echo_and_raw_usage_in_metadata() {
        let config = stub_config();
        let request = GenerationRequest::builder()
            .message(ChatMessage::user("hi"))
            .temperature(0.2)
            .top_p(0.9)
            .max_tokens(128)
            .build()
            .expect("valid request");

        let usage = json!({"input_tokens": 3, "output_tokens": 2, "cache_read_input_tokens": 0});
        let usage_clone = usage.clone();
        let response = request_with_tracking(&config, &request, async move {
            Ok(ParsedResponse {
                content: "ok".to_string(),
                input_tokens: Some(3),
                output_tokens: Some(2),
                usage: usage_clone,
                stop_reason: Some("max_tokens".to_string()),
                model: Some("claude-3-5-haiku-20241022".to_string()),
                message_id: Some("msg_meta".to_string()),
            })
        })
        .await
        .expect("tracking succeeds");

        let echo = &response.metadata["request"];
        assert_eq!(echo["max_tokens"], json!(128));
        assert_eq!(echo["top_p"], json!(0.9f32));

        let resp_meta = &response.metadata["response"];
        assert_eq!(resp_meta["usage"], usage);
        assert_eq!(resp_meta["stop_reason"], json!("max_tokens"));
        assert_eq!(resp_meta["id"], json!("msg_meta"));
    }

    #[tokio::test]
    async fn tracking_propagates_call_errors_unchanged() {
        let config = stub_config();
        let request = request_with(vec![ChatMessage::user("hi")]);

        let err = request_with_tracking(&config, &request, async {
            Err(ProviderError::http("claude", 500, "boom"))
        })
        .await
        .expect_err("call failure must propagate");

        match err {
            ProviderError::Http { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stub_generate_runs_full_lifecycle() {
        let provider = stub_provider();
        let request = request_with(vec![ChatMessage::user("hello there")]);
        let response = provider.generate(&request).await.expect("generate");
        assert_eq!(response.content, "stub response");
        assert_eq!(response.input_tokens, 10);
        assert_eq!(response.output_tokens, 5);
    }
}
