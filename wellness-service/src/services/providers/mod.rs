//! Remote model provider abstractions and implementations.
//!
//! The gateway only needs two remote operations: upload a file and get a
//! reference back, and generate text from an ordered conversation. Both sit
//! behind [`ModelProvider`] so the Gemini client can be swapped for the
//! mock in tests.

pub mod gemini;
pub mod mock;

use crate::models::RemoteFile;
use crate::services::file_store::StagedFile;
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered(_) => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// Author of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    File(RemoteFile),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// Everything needed for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub system_instruction: Option<&'a str>,
    /// Prior exchanges followed by the new user message.
    pub messages: Vec<Message>,
}

/// Trait for remote generative-model services (e.g., Gemini).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Upload a staged file and return the service's reference to it.
    async fn upload_file(
        &self,
        file: &StagedFile,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, ProviderError>;

    /// Generate the model's reply to the last message.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
