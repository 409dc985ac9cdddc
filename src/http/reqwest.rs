use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;

use crate::error::ProviderError;

use super::{DynHttpTransport, HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};

/// Default [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps a caller-configured `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a transport with the default client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] when the TLS backend cannot be
    /// initialized.
    pub fn default_client() -> Result<Self, ProviderError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| ProviderError::transport(format!("failed to create reqwest client: {err}")))
    }

    fn build_request(&self, mut request: HttpRequest) -> Result<reqwest::RequestBuilder, ProviderError> {
        let mut builder = self.client.post(&request.url);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        for (name, value) in request.headers.drain() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ProviderError::transport(format!("invalid header name: {err}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                ProviderError::transport(format!("invalid header value for {header_name}: {err}"))
            })?;
            builder = builder.header(header_name, header_value);
        }

        Ok(builder.body(request.body))
    }

    fn headers_to_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|err| ProviderError::transport(err.to_string()))?;

        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| ProviderError::transport(err.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn post_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, ProviderError> {
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|err| ProviderError::transport(err.to_string()))?;

        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|err| ProviderError::transport(err.to_string()))
        });
        let body: HttpBodyStream = Box::pin(stream);

        Ok(HttpStreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Convenience constructor for a thread-safe default transport.
///
/// # Errors
///
/// Propagates [`ReqwestTransport::default_client`] failures.
pub fn default_dyn_transport() -> Result<DynHttpTransport, ProviderError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}
