//! Shared data structures modeling generation requests, responses, and the
//! bookkeeping records emitted around each call.
//!
//! These types normalize provider-specific payloads so the rest of the crate
//! can stay agnostic of individual API differences. Everything here is a
//! value type: validation happens at construction and nothing is mutated
//! afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ProviderError;

/// Backends the abstraction knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Glm,
    Deepseek,
    Claude,
    Openai,
    Deepinfra,
}

impl ProviderType {
    /// Wire-level identifier, also used as the telemetry `provider` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Glm => "glm",
            Self::Deepseek => "deepseek",
            Self::Claude => "claude",
            Self::Openai => "openai",
            Self::Deepinfra => "deepinfra",
        }
    }
}

/// Lifecycle states a request can pass through in an external queue/router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Timeout,
    BudgetExceeded,
}

/// Priority attached to a request; data for an external scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// DeepInfra specialty deployments a caller can pin a request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialtyModel {
    #[serde(rename = "wizardlm-2-8x22b")]
    Wizardlm,
    #[serde(rename = "nemotron-4-340b")]
    Nemotron,
    #[serde(rename = "hermes-3-405b")]
    Hermes,
}

/// Conversation roles understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn in a conversation.
///
/// # Examples
///
/// ```
/// use watari_llm::types::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Summarize Rust traits.");
/// assert_eq!(msg.role, Role::User);
/// assert!(msg.name.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role associated with this message.
    pub role: Role,
    /// Plain UTF-8 text content.
    pub content: String,
    /// Optional vendor-specific name attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }

    /// Attaches a vendor-specific participant name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A text-generation call, shared across all providers.
///
/// Construct through [`GenerationRequest::builder`]; `build` enforces the
/// invariants (non-empty messages, `temperature` ∈ \[0, 2\], `top_p` ∈
/// \[0, 1\]) so an existing value is always valid.
///
/// # Examples
///
/// ```
/// use watari_llm::types::{ChatMessage, GenerationRequest};
///
/// let request = GenerationRequest::builder()
///     .message(ChatMessage::system("You are concise."))
///     .message(ChatMessage::user("Explain enums."))
///     .temperature(0.3)
///     .max_tokens(256)
///     .build()
///     .unwrap();
/// assert_eq!(request.messages.len(), 2);
/// assert_eq!(request.top_p, 1.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Ordered list of messages to send.
    pub messages: Vec<ChatMessage>,
    /// Maximum number of output tokens; backend default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature within `0.0..=2.0`.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling parameter within `0.0..=1.0`.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Whether the caller intends to consume the response incrementally.
    #[serde(default)]
    pub stream: bool,
    /// Caller identifier for cost attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Session identifier for cost attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Scheduling hint for an external queue.
    #[serde(default)]
    pub priority: PriorityLevel,
    /// Backend the caller would prefer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<ProviderType>,
    /// Pins the request to a DeepInfra specialty deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_specialty_model: Option<SpecialtyModel>,
    /// Free-form metadata forwarded untouched.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

impl GenerationRequest {
    /// Starts building a request with the documented defaults
    /// (temperature 0.7, top_p 1.0, stream off, normal priority).
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }
}

/// Builder for [`GenerationRequest`]; `build` performs all validation.
#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
    temperature: f32,
    top_p: f32,
    stream: bool,
    user_id: Option<String>,
    session_id: Option<String>,
    priority: PriorityLevel,
    preferred_provider: Option<ProviderType>,
    force_specialty_model: Option<SpecialtyModel>,
    metadata: HashMap<String, Value>,
}

impl Default for GenerationRequestBuilder {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            max_tokens: None,
            temperature: 0.7,
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
}

impl GenerationRequestBuilder {
    /// Appends one message to the conversation.
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Appends every message from an iterator.
    pub fn messages<I: IntoIterator<Item = ChatMessage>>(mut self, messages: I) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn priority(mut self, priority: PriorityLevel) -> Self {
        self.priority = priority;
        self
    }

    pub fn preferred_provider(mut self, provider: ProviderType) -> Self {
        self.preferred_provider = Some(provider);
        self
    }

    pub fn force_specialty_model(mut self, model: SpecialtyModel) -> Self {
        self.force_specialty_model = Some(model);
        self
    }

    /// Inserts one metadata entry, overwriting an existing key.
    pub fn metadata_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Validates the accumulated fields and produces the request.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidRequest`] when messages are empty,
    /// `temperature` is outside `0.0..=2.0`, or `top_p` is outside
    /// `0.0..=1.0`.
    pub fn build(self) -> Result<GenerationRequest, ProviderError> {
        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request("messages cannot be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ProviderError::invalid_request(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ProviderError::invalid_request(format!(
                "top_p must be between 0 and 1, got {}",
                self.top_p
            )));
        }

        Ok(GenerationRequest {
            messages: self.messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            stream: self.stream,
            user_id: self.user_id,
            session_id: self.session_id,
            priority: self.priority,
            preferred_provider: self.preferred_provider,
            force_specialty_model: self.force_specialty_model,
            metadata: self.metadata,
        })
    }
}

/// Result of a completed generation call.
///
/// Token counts come from the provider's usage payload when reported and
/// from the character-based estimate otherwise; `cost_usd` is always derived
/// deterministically from the counts and the configured per-million rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Fresh id minted for this call, echoed in every telemetry event.
    pub request_id: String,
    /// Generated text.
    pub content: String,
    /// Backend that served the call.
    pub provider_used: ProviderType,
    /// Model identifier the call was issued against.
    pub model_used: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Derived cost in USD.
    pub cost_usd: f64,
    /// Wall-clock latency of the transport call.
    pub processing_time_ms: u64,
    /// Whether the response was served from a cache layer.
    pub cached: bool,
    /// Request echo and the raw provider usage block.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Routing decision snapshot produced by an external router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub request_id: String,
    pub selected_provider: ProviderType,
    pub selected_model: String,
    pub routing_score: f64,
    pub reasoning: String,
    pub cost_estimate_usd: f64,
    pub quality_estimate: f64,
    #[serde(default)]
    pub fallback_chain: Vec<ProviderType>,
    pub routing_time_ms: u64,
}

/// Per-call cost record for an external ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostTracking {
    pub request_id: String,
    pub provider: ProviderType,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl CostTracking {
    /// Builds a record from a completed response, stamped with the current
    /// time.
    pub fn from_response(response: &GenerationResponse) -> Self {
        Self {
            request_id: response.request_id.clone(),
            provider: response.provider_used,
            model: response.model_used.clone(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cost_usd: response.cost_usd,
            timestamp: Utc::now(),
            user_id: None,
            session_id: None,
        }
    }
}

/// Daily budget snapshot maintained by an external budget enforcer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub date: DateTime<Utc>,
    pub daily_budget_usd: f64,
    pub spent_usd: f64,
    pub remaining_usd: f64,
    pub percentage_used: f64,
    pub warning_threshold: f64,
    pub hard_limit: f64,
    pub is_warning_reached: bool,
    pub is_limit_reached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_daily_usage: Option<f64>,
}

/// Aggregated per-provider performance counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetrics {
    pub provider: ProviderType,
    pub model: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: f64,
    pub average_tokens_per_request: f64,
    pub total_cost_usd: f64,
    pub uptime_percentage: f64,
    pub error_rate: f64,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

/// Outcome of one live health probe against a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub provider: ProviderType,
    pub model: String,
    pub is_healthy: bool,
    pub response_time_ms: u64,
    /// Captured failure description when unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Token total consumed by the probe request, when the backend reported
    /// usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_tokens: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheck {
    /// Healthy probe outcome with observed latency and token usage.
    pub fn healthy(
        provider: ProviderType,
        model: impl Into<String>,
        response_time_ms: u64,
        test_tokens: Option<u64>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            is_healthy: true,
            response_time_ms,
            error_message: None,
            test_tokens,
            timestamp: Utc::now(),
        }
    }

    /// Unhealthy probe outcome carrying the captured failure description.
    pub fn unhealthy(
        provider: ProviderType,
        model: impl Into<String>,
        response_time_ms: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            is_healthy: false,
            response_time_ms,
            error_message: Some(error_message.into()),
            test_tokens: None,
            timestamp: Utc::now(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

/// Queue entry for an external request scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub request_id: String,
    pub request_data: GenerationRequest,
    pub priority: PriorityLevel,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_provider: Option<ProviderType>,
}

impl QueueItem {
    /// Wraps a request for queueing, stamped with the current time.
    pub fn new(request_id: impl Into<String>, request_data: GenerationRequest) -> Self {
        let priority = request_data.priority;
        Self {
            request_id: request_id.into(),
            request_data,
            priority,
            created_at: Utc::now(),
            attempts: 0,
            max_attempts: 3,
            last_attempt: None,
            estimated_cost: None,
            assigned_provider: None,
        }
    }
}

/// Operator-facing alert raised by an external monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub alert_type: String,
    /// One of `info`, `warning`, `error`, `critical`.
    pub severity: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Creates an unresolved alert with a fresh id and the current time.
    pub fn new(
        alert_type: impl Into<String>,
        severity: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            alert_id: Uuid::new_v4().to_string(),
            alert_type: alert_type.into(),
            severity: severity.into(),
            title: title.into(),
            message: message.into(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
            resolved: false,
            resolved_at: None,
        }
    }
}

/// Hourly usage rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageAnalytics {
    pub date: DateTime<Utc>,
    pub hour: u8,
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    #[serde(default)]
    pub provider_breakdown: HashMap<ProviderType, Value>,
    pub average_response_time_ms: f64,
    pub peak_requests_per_minute: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_hit_rate: Option<f64>,
}

/// Multi-hour performance report assembled by an external monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub report_date: DateTime<Utc>,
    pub period_hours: u32,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_cost_usd: f64,
    pub average_response_time_ms: f64,
    #[serde(default)]
    pub provider_performance: HashMap<ProviderType, ProviderMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_savings_vs_openai: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score_trend: Option<Vec<f64>>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Standard envelope for surfacing results over an outer API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    pub fn ok(data: Value, request_id: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id,
            timestamp: Utc::now(),
        }
    }

    pub fn err(error: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            request_id,
            timestamp: Utc::now(),
        }
    }
}

/// One incremental fragment of a streaming response, for callers that relay
/// streams over their own wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub request_id: String,
    pub chunk_id: u64,
    pub content: String,
    pub is_final: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}
