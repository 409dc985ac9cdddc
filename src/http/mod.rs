//! Minimal HTTP boundary the adapters speak through.
//!
//! The contract is intentionally narrow: a JSON POST that resolves to a full
//! response, and a JSON POST that resolves to a byte stream. TLS, connection
//! pooling, and proxies belong to the transport implementation, not here.
//! Keeping the trait this small lets tests substitute in-memory transports.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ProviderError;

/// One outgoing JSON POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    /// Per-call timeout; transports fall back to their own default when unset.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Builds a POST request carrying a serialized JSON body.
    ///
    /// Sets `Content-Type: application/json`; providers stamp their own
    /// credential and protocol headers on top.
    ///
    /// # Examples
    ///
    /// ```
    /// use watari_llm::http::HttpRequest;
    ///
    /// let request = HttpRequest::post_json("https://example.com", br#"{}"#.to_vec());
    /// assert_eq!(
    ///     request.headers.get("Content-Type"),
    ///     Some(&"application/json".to_string())
    /// );
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
            timeout: None,
        }
    }

    /// Replaces the header map wholesale.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Overrides the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Converts the body into a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] when the payload is not valid
    /// UTF-8.
    pub fn into_string(self) -> Result<String, ProviderError> {
        String::from_utf8(self.body).map_err(|err| ProviderError::transport(err.to_string()))
    }
}

/// Byte stream yielded by a streaming POST.
///
/// Dropping the stream drops the underlying connection, so an abandoned
/// consumer releases the socket without waiting for the remaining body.
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ProviderError>> + Send>>;

/// HTTP response whose body arrives incrementally.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

/// Transport abstraction decoupling adapters from the concrete HTTP client.
///
/// # Examples
///
/// ```
/// # use async_trait::async_trait;
/// # use watari_llm::http::{HttpTransport, HttpRequest, HttpResponse, HttpStreamResponse};
/// # use watari_llm::error::ProviderError;
/// # use futures_util::stream;
/// struct EchoTransport;
///
/// #[async_trait]
/// impl HttpTransport for EchoTransport {
///     async fn post(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
///         Ok(HttpResponse { status: 200, headers: request.headers, body: request.body })
///     }
///     async fn post_stream(
///         &self,
///         request: HttpRequest,
///     ) -> Result<HttpStreamResponse, ProviderError> {
///         let body = stream::once(async move { Ok(request.body) });
///         Ok(HttpStreamResponse { status: 200, headers: request.headers, body: Box::pin(body) })
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let response = EchoTransport
///     .post(HttpRequest::post_json("https://example.com", br#"{}"#.to_vec()))
///     .await
///     .unwrap();
/// assert_eq!(response.status, 200);
/// # });
/// ```
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues the request and resolves once the full response is buffered.
    ///
    /// # Errors
    ///
    /// Implementations map network failures to [`ProviderError::Transport`].
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;

    /// Issues the request and resolves with a streaming body.
    ///
    /// # Errors
    ///
    /// Implementations map network failures to [`ProviderError::Transport`].
    async fn post_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, ProviderError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

pub mod reqwest;
