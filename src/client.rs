use std::collections::HashMap;

use crate::error::ProviderError;
use crate::provider::{DynProvider, ProviderInfo, TextStream};
use crate::types::{GenerationRequest, GenerationResponse};

/// Dispatch-only registry of adapters keyed by caller-chosen handles.
///
/// The registry forwards calls to the adapter a handle names; it never
/// selects between backends or falls back on failure — that logic belongs to
/// an external router built on top of the [`Provider`](crate::provider::Provider)
/// surface.
pub struct ProviderRegistry {
    providers: HashMap<String, DynProvider>,
}

impl ProviderRegistry {
    /// Creates a builder for registering adapters.
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder {
            providers: HashMap::new(),
        }
    }

    /// Forwards a generation call to the adapter behind `handle`.
    pub async fn generate(
        &self,
        handle: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.get(handle)?.generate(request).await
    }

    /// Forwards a streaming call to the adapter behind `handle`.
    pub async fn generate_stream(
        &self,
        handle: &str,
        request: &GenerationRequest,
    ) -> Result<TextStream, ProviderError> {
        self.get(handle)?.generate_stream(request).await
    }

    /// Capability/pricing snapshot of the adapter behind `handle`.
    pub fn provider_info(&self, handle: &str) -> Result<ProviderInfo, ProviderError> {
        Ok(self.get(handle)?.provider_info())
    }

    /// Registered handles, in arbitrary order.
    pub fn handles(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Handles whose adapters implement streaming.
    pub fn handles_supporting_streaming(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter_map(|(handle, provider)| {
                provider.supports_streaming().then(|| handle.clone())
            })
            .collect()
    }

    /// Handles whose adapters accept function/tool definitions.
    pub fn handles_supporting_function_calling(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter_map(|(handle, provider)| {
                provider.supports_function_calling().then(|| handle.clone())
            })
            .collect()
    }

    fn get(&self, handle: &str) -> Result<DynProvider, ProviderError> {
        self.providers
            .get(handle)
            .cloned()
            .ok_or_else(|| {
                ProviderError::invalid_request(format!("unknown provider handle: {handle}"))
            })
    }
}

/// Builder registering adapters under caller-chosen handles.
pub struct ProviderRegistryBuilder {
    providers: HashMap<String, DynProvider>,
}

impl ProviderRegistryBuilder {
    /// Registers an adapter; a repeated handle replaces the previous entry.
    pub fn register<S: Into<String>>(mut self, handle: S, provider: DynProvider) -> Self {
        self.providers.insert(handle.into(), provider);
        self
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            providers: self.providers,
        }
    }
}
