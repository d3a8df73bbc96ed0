//! AI provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction for generative model
//! backends, allowing the Gemini client to be swapped for a mock in tests.

pub mod gemini;
pub mod mock;

use crate::models::{Role, Turn};
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// One piece of a message sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

/// A single message in a model request.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::Text(text.into())])
    }
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            parts: vec![Part::Text(turn.text.clone())],
        }
    }
}

/// Generation parameters for AI requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams {
    /// Ask the model to answer with a JSON document.
    pub json_output: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    /// Conversation so far; the last entry is the message being answered.
    pub contents: Vec<Content>,
    pub params: GenerationParams,
}

/// Result of a provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,

    /// Input tokens consumed.
    pub input_tokens: u64,

    /// Output tokens generated.
    pub output_tokens: u64,
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Generate a text response.
    async fn generate(&self, request: &GenerateRequest) -> Result<ProviderResponse, ProviderError>;

    /// Name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Cheap readiness check; does not call the upstream API.
    fn health_check(&self) -> Result<(), ProviderError>;
}
