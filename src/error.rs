use thiserror::Error;

/// Maximum number of characters of an upstream error body kept in an error.
///
/// Provider error payloads can embed the entire rejected prompt; truncation
/// keeps log lines and error messages bounded.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Aggregates every failure mode exposed by the provider adapters.
///
/// Each variant maps to one stage of the request lifecycle: validation before
/// any network call, the HTTP exchange itself, and decoding of a nominally
/// successful response. Callers match on the variant to decide whether to
/// surface the failure, fall back to another backend, or fix the request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The caller-supplied request violates a validation rule.
    ///
    /// Raised before any network traffic; never worth retrying unchanged.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    /// The backend answered with a non-2xx status.
    #[error("provider {provider} returned HTTP {status}: {body}")]
    Http {
        /// Name of the backend that failed, such as `claude`.
        provider: &'static str,
        /// HTTP status code of the response.
        status: u16,
        /// Response body, truncated to keep messages bounded.
        body: String,
    },
    /// A 2xx response whose body does not match the documented shape.
    ///
    /// Usually indicates an upstream contract change rather than a caller bug.
    #[error("provider {provider} returned an invalid response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
    /// Network-level failure: timeout, connection reset, DNS, bad UTF-8.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl ProviderError {
    /// Creates a [`ProviderError::InvalidRequest`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use watari_llm::error::ProviderError;
    ///
    /// let err = ProviderError::invalid_request("messages cannot be empty");
    /// assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    /// ```
    pub fn invalid_request<T: Into<String>>(message: T) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a [`ProviderError::Transport`] from a textual description.
    ///
    /// Keeps call sites concise and the formatting of transport failures
    /// consistent across the crate.
    ///
    /// # Examples
    ///
    /// ```
    /// use watari_llm::error::ProviderError;
    ///
    /// let err = ProviderError::transport("dns lookup failed");
    /// assert!(matches!(err, ProviderError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a [`ProviderError::Http`], truncating the body to a bounded
    /// number of characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use watari_llm::error::ProviderError;
    ///
    /// let err = ProviderError::http("claude", 429, "rate limited");
    /// assert!(matches!(err, ProviderError::Http { status: 429, .. }));
    /// ```
    pub fn http<T: Into<String>>(provider: &'static str, status: u16, body: T) -> Self {
        Self::Http {
            provider,
            status,
            body: truncate_body(&body.into()),
        }
    }

    /// Creates a [`ProviderError::InvalidResponse`] with provider context.
    pub fn invalid_response<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::InvalidResponse {
            provider,
            message: message.into(),
        }
    }
}

/// Truncates an upstream error body on a character boundary.
fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_ctor_truncates_long_bodies() {
        let long_body = "x".repeat(1000);
        let err = ProviderError::http("claude", 500, long_body);
        match err {
            ProviderError::Http {
                provider,
                status,
                body,
            } => {
                assert_eq!(provider, "claude");
                assert_eq!(status, 500);
                assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn http_ctor_keeps_short_bodies_verbatim() {
        let err = ProviderError::http("claude", 404, "not found");
        match err {
            ProviderError::Http { body, .. } => assert_eq!(body, "not found"),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let body: String = "語".repeat(MAX_ERROR_BODY_CHARS + 50);
        let err = ProviderError::http("claude", 500, body);
        match err {
            ProviderError::Http { body, .. } => {
                assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }
}
