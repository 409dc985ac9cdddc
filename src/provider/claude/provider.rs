use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::http::{DynHttpTransport, HttpRequest, HttpResponse, HttpStreamResponse};
use crate::provider::{
    Provider, TextStream, estimate_messages_tokens, request_with_tracking, token_cost,
};
use crate::types::{
    ChatMessage, GenerationRequest, GenerationResponse, HealthCheck, PriorityLevel,
};

use super::PROVIDER_NAME;
use super::error::claude_http_error;
use super::heuristics::{self, RequestAnalysis, TemperaturePresets};
use super::request::build_claude_body;
use super::response::parse_response;
use super::stream::{collect_stream_text, text_fragment_stream};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("watari-llm/", env!("CARGO_PKG_VERSION"));

/// The health probe uses its own short deadline instead of the configured
/// request timeout.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_CHECK_MAX_TOKENS: u32 = 5;
const HEALTH_CHECK_TEMPERATURE: f32 = 0.1;

/// Adapter for the Anthropic Messages API.
///
/// Stateless per call: the only state is the read-only config and the shared
/// transport handle, so one instance serves any number of concurrent calls.
///
/// # Examples
///
/// ```no_run
/// use watari_llm::config::ProviderConfig;
/// use watari_llm::http::reqwest::default_dyn_transport;
/// use watari_llm::provider::claude::ClaudeProvider;
/// use watari_llm::types::ProviderType;
///
/// let config = ProviderConfig::new(
///     ProviderType::Claude,
///     "claude-3-5-haiku-20241022",
///     std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
///     "https://api.anthropic.com",
/// )
/// .with_cost_per_1m_tokens(0.25, 1.25)
/// .with_max_tokens(8192);
///
/// let provider = ClaudeProvider::new(default_dyn_transport().unwrap(), config).unwrap();
/// # let _ = provider;
/// ```
pub struct ClaudeProvider {
    transport: DynHttpTransport,
    config: ProviderConfig,
}

impl ClaudeProvider {
    /// Creates the adapter after checking the config invariants.
    ///
    /// # Errors
    ///
    /// Propagates [`ProviderConfig::validate`] failures.
    pub fn new(transport: DynHttpTransport, config: ProviderConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("x-api-key".to_string(), self.config.api_key.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ])
    }

    async fn send_request(
        &self,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpResponse, ProviderError> {
        let payload = serde_json::to_vec(body).map_err(|err| {
            ProviderError::invalid_request(format!("failed to serialize request: {err}"))
        })?;
        let request = HttpRequest::post_json(self.endpoint(), payload)
            .with_headers(self.build_headers())
            .with_timeout(timeout);
        self.transport.post(request).await
    }

    async fn send_stream_request(&self, body: &Value) -> Result<HttpStreamResponse, ProviderError> {
        let payload = serde_json::to_vec(body).map_err(|err| {
            ProviderError::invalid_request(format!("failed to serialize request: {err}"))
        })?;
        let request = HttpRequest::post_json(self.endpoint(), payload)
            .with_headers(self.build_headers())
            .with_timeout(self.config.timeout());
        self.transport.post_stream(request).await
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<String, ProviderError> {
        let status = response.status;
        let text = response.into_string()?;
        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(claude_http_error(status, &text))
        }
    }

    fn probe_request(&self) -> GenerationRequest {
        GenerationRequest {
            messages: vec![ChatMessage::user("Hi")],
            max_tokens: Some(HEALTH_CHECK_MAX_TOKENS),
            temperature: HEALTH_CHECK_TEMPERATURE,
            top_p: 1.0,
            stream: false,
            user_id: None,
            session_id: None,
            priority: PriorityLevel::Normal,
            preferred_provider: None,
            force_specialty_model: None,
            metadata: HashMap::new(),
        }
    }

    fn unhealthy(&self, started: Instant, error: impl Into<String>) -> HealthCheck {
        HealthCheck::unhealthy(
            self.config.provider,
            &self.config.model_name,
            started.elapsed().as_millis() as u64,
            error,
        )
    }

    /// Projected cost of a request before sending it, assuming 512 output
    /// tokens when the caller did not cap them.
    pub fn estimate_request_cost(&self, request: &GenerationRequest) -> f64 {
        let input_tokens = estimate_messages_tokens(&request.messages);
        let output_tokens = u64::from(request.max_tokens.unwrap_or(512));
        token_cost(&self.config, input_tokens, output_tokens)
    }

    /// Whether this backend is a cost-effective choice for the request.
    ///
    /// Advisory only; keyword and length classifiers over the concatenated
    /// message text.
    pub fn is_cost_effective_for(&self, request: &GenerationRequest) -> bool {
        heuristics::is_cost_effective(request)
    }

    /// Static quality score in `0.0..=1.0` for router scoring.
    pub fn quality_score(&self) -> f64 {
        0.87
    }

    /// Temperature presets suggested per task style.
    pub fn optimal_temperature_range(&self) -> TemperaturePresets {
        heuristics::temperature_presets()
    }

    /// Scores the request against this backend's strengths.
    pub fn analyze_request_characteristics(&self, request: &GenerationRequest) -> RequestAnalysis {
        heuristics::analyze(request)
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.validate_request(request)?;
        let body = build_claude_body(request, &self.config.model_name, false)?;

        request_with_tracking(&self.config, request, async {
            let response = self.send_request(&body, self.config.timeout()).await?;
            let text = self.ensure_success(response)?;
            parse_response(&text)
        })
        .await
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<TextStream, ProviderError> {
        self.validate_request(request)?;
        let body = build_claude_body(request, &self.config.model_name, true)?;

        let response = match self.send_stream_request(&body).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(provider = PROVIDER_NAME, error = %err, "streaming request failed");
                return Err(err);
            }
        };

        if !(200..300).contains(&response.status) {
            let text = collect_stream_text(response.body).await?;
            let err = claude_http_error(response.status, &text);
            tracing::error!(provider = PROVIDER_NAME, error = %err, "streaming request failed");
            return Err(err);
        }

        Ok(text_fragment_stream(response.body))
    }

    async fn health_check(&self) -> HealthCheck {
        let started = Instant::now();
        let body = match build_claude_body(&self.probe_request(), &self.config.model_name, false) {
            Ok(body) => body,
            Err(err) => return self.unhealthy(started, err.to_string()),
        };

        match self.send_request(&body, HEALTH_CHECK_TIMEOUT).await {
            Ok(response) => {
                let response_time_ms = started.elapsed().as_millis() as u64;
                let status = response.status;
                if (200..300).contains(&status) {
                    let test_tokens = response
                        .into_string()
                        .ok()
                        .and_then(|text| parse_response(&text).ok())
                        .map(|parsed| {
                            parsed.input_tokens.unwrap_or(0) + parsed.output_tokens.unwrap_or(0)
                        });
                    HealthCheck::healthy(
                        self.config.provider,
                        &self.config.model_name,
                        response_time_ms,
                        test_tokens,
                    )
                } else {
                    let text = response.into_string().unwrap_or_default();
                    HealthCheck::unhealthy(
                        self.config.provider,
                        &self.config.model_name,
                        response_time_ms,
                        claude_http_error(status, &text).to_string(),
                    )
                }
            }
            Err(err) => self.unhealthy(started, err.to_string()),
        }
    }

    fn supports_function_calling(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::HttpTransport;
    use crate::types::ProviderType;

    struct NoopTransport;

    #[async_trait]
    impl HttpTransport for NoopTransport {
        async fn post(&self, _request: HttpRequest) -> Result<HttpResponse, ProviderError> {
            Err(ProviderError::transport("noop"))
        }

        async fn post_stream(
            &self,
            _request: HttpRequest,
        ) -> Result<HttpStreamResponse, ProviderError> {
            Err(ProviderError::transport("noop"))
        }
    }

    fn provider_with_base_url(base_url: &str) -> ClaudeProvider {
        let config = ProviderConfig::new(
            ProviderType::Claude,
            "claude-3-5-haiku-20241022",
            "test-api-key",
            base_url,
        )
        .with_cost_per_1m_tokens(0.25, 1.25)
        .with_max_tokens(8192);
        ClaudeProvider::new(Arc::new(NoopTransport), config).expect("valid config")
    }

    #[test]
    fn endpoint_appends_v1_messages() {
        let provider = provider_with_base_url("https://api.anthropic.com");
        assert_eq!(provider.endpoint(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn endpoint_handles_existing_v1_suffix_and_trailing_slash() {
        let provider = provider_with_base_url("https://proxy.example.com/v1/");
        assert_eq!(provider.endpoint(), "https://proxy.example.com/v1/messages");
    }

    #[test]
    fn headers_carry_credential_version_and_user_agent() {
        let provider = provider_with_base_url("https://api.anthropic.com");
        let headers = provider.build_headers();
        assert_eq!(headers.get("x-api-key").map(String::as_str), Some("test-api-key"));
        assert_eq!(
            headers.get("anthropic-version").map(String::as_str),
            Some("2023-06-01")
        );
        assert_eq!(
            headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert!(
            headers
                .get("User-Agent")
                .is_some_and(|ua| ua.starts_with("watari-llm/"))
        );
    }

    #[test]
    fn capability_flags_override_function_calling() {
        let provider = provider_with_base_url("https://api.anthropic.com");
        assert!(provider.supports_streaming());
        assert!(provider.supports_function_calling());
        assert_eq!(provider.name(), "claude");
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let mut config = ProviderConfig::new(
            ProviderType::Claude,
            "claude-3-5-haiku-20241022",
            "test-api-key",
            "https://api.anthropic.com",
        );
        config.max_tokens = 0;
        let err = ClaudeProvider::new(Arc::new(NoopTransport), config)
            .err()
            .expect("invalid config must be rejected");
        assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    }

    #[test]
    fn estimate_request_cost_defaults_output_to_512() {
        let provider = provider_with_base_url("https://api.anthropic.com");
        let request = GenerationRequest::builder()
            .message(ChatMessage::user("x".repeat(4000)))
            .build()
            .expect("valid request");
        // 1000 estimated input tokens, 512 assumed output tokens.
        let expected = 1000.0 / 1e6 * 0.25 + 512.0 / 1e6 * 1.25;
        assert!((provider.estimate_request_cost(&request) - expected).abs() < 1e-12);
    }

    #[test]
    fn probe_request_is_minimal() {
        let provider = provider_with_base_url("https://api.anthropic.com");
        let probe = provider.probe_request();
        assert_eq!(probe.messages.len(), 1);
        assert_eq!(probe.messages[0].content, "Hi");
        assert_eq!(probe.max_tokens, Some(5));
        assert!((probe.temperature - 0.1).abs() < f32::EPSILON);
    }
}
