use crate::error::ProviderError;

use super::PROVIDER_NAME;

/// Maps a non-2xx Messages API response to the shared error taxonomy.
///
/// The body travels verbatim (truncated by the constructor); status-specific
/// recovery is left to the caller, which sees the code on the variant.
pub(crate) fn claude_http_error(status: u16, body: &str) -> ProviderError {
    ProviderError::http(PROVIDER_NAME, status, body)
}
