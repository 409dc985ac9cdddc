//! Uniform client abstraction over hosted LLM text-generation APIs.
//!
//! Callers build one [`types::GenerationRequest`], hand it to any adapter
//! implementing [`provider::Provider`], and receive one
//! [`types::GenerationResponse`] regardless of which backend served it. The
//! Claude adapter ([`provider::claude::ClaudeProvider`]) is the reference
//! implementation of the contract; further backends follow the same module
//! pattern.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod stream;
pub mod telemetry;
pub mod types;

pub use client::ProviderRegistry;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use provider::{Provider, TextStream};
pub use types::*;
