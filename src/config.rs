use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::types::ProviderType;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Static per-provider/per-model settings.
///
/// A config is handed to an adapter at construction and read-only for the
/// adapter's lifetime. `max_retries` and `rate_limit_per_minute` are carried
/// as data for an external router; no retry or rate-limit enforcement
/// happens inside this crate.
///
/// # Examples
///
/// ```
/// use watari_llm::config::ProviderConfig;
/// use watari_llm::types::ProviderType;
///
/// let config = ProviderConfig::new(
///     ProviderType::Claude,
///     "claude-3-5-haiku-20241022",
///     "sk-test",
///     "https://api.anthropic.com",
/// )
/// .with_cost_per_1m_tokens(0.25, 1.25)
/// .with_max_tokens(8192);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderType,
    pub model_name: String,
    pub api_key: String,
    pub base_url: String,
    /// USD per million input tokens.
    pub cost_per_1m_input_tokens: f64,
    /// USD per million output tokens.
    pub cost_per_1m_output_tokens: f64,
    /// Context budget: estimated input plus requested output must fit.
    pub max_tokens: u32,
    /// Per-call request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry budget for an external caller; unused inside this crate.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Advertised request rate; surfaced via rate-limit info, not enforced.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Rolling health score maintained by an external monitor.
    #[serde(default = "default_health_score")]
    pub health_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_rate_limit_per_minute() -> u32 {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

fn default_true() -> bool {
    true
}

fn default_health_score() -> f64 {
    1.0
}

impl ProviderConfig {
    /// Creates a config with the documented defaults and zeroed cost rates.
    pub fn new(
        provider: ProviderType,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            cost_per_1m_input_tokens: 0.0,
            cost_per_1m_output_tokens: 0.0,
            max_tokens: 4096,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            is_active: true,
            health_score: 1.0,
            last_health_check: None,
        }
    }

    /// Sets the per-million USD rates for input and output tokens.
    pub fn with_cost_per_1m_tokens(mut self, input: f64, output: f64) -> Self {
        self.cost_per_1m_input_tokens = input;
        self.cost_per_1m_output_tokens = output;
        self
    }

    /// Sets the context token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the per-call timeout in seconds.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the advertised requests-per-minute limit.
    pub fn with_rate_limit_per_minute(mut self, rate_limit_per_minute: u32) -> Self {
        self.rate_limit_per_minute = rate_limit_per_minute;
        self
    }

    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the config invariants.
    ///
    /// Adapter constructors call this so a live adapter never carries a
    /// nonsensical config.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidRequest`] when a cost rate is negative
    /// or `max_tokens` is zero.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.cost_per_1m_input_tokens < 0.0 || self.cost_per_1m_output_tokens < 0.0 {
            return Err(ProviderError::invalid_request(
                "cost per 1M tokens cannot be negative",
            ));
        }
        if self.max_tokens == 0 {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ProviderConfig {
        ProviderConfig::new(
            ProviderType::Claude,
            "claude-3-5-haiku-20241022",
            "test-key",
            "https://api.anthropic.com",
        )
    }

    #[test]
    fn defaults_match_documentation() {
        let config = base_config();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rate_limit_per_minute, 60);
        assert!(config.is_active);
        assert_eq!(config.health_score, 1.0);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn validate_rejects_negative_cost() {
        let config = base_config().with_cost_per_1m_tokens(-0.1, 1.0);
        let err = config.validate().expect_err("negative rate must fail");
        assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    }

    #[test]
    fn validate_rejects_zero_max_tokens() {
        let mut config = base_config();
        config.max_tokens = 0;
        let err = config.validate().expect_err("zero max_tokens must fail");
        assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    }

    #[test]
    fn validate_accepts_zero_cost_rates() {
        assert!(base_config().validate().is_ok());
    }
}
