//! Mock provider implementation for testing.

use super::{GenerateRequest, GenerativeProvider, Part, ProviderError, ProviderResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Fallback {
    Echo,
    Fail(String),
}

/// Mock provider: replays queued replies, then echoes the last prompt.
/// Every request is recorded for inspection.
pub struct MockProvider {
    replies: Mutex<VecDeque<String>>,
    fallback: Fallback,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Fallback::Echo,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new();
        provider
            .replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(Into::into));
        provider
    }

    /// Every call fails with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fallback: Fallback::Fail(message.into()),
            ..Self::new()
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeProvider for MockProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        let text = match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => match &self.fallback {
                Fallback::Fail(message) => return Err(ProviderError::ApiError(message.clone())),
                Fallback::Echo => {
                    let prompt = request
                        .contents
                        .last()
                        .and_then(|c| {
                            c.parts.iter().find_map(|p| match p {
                                Part::Text(text) => Some(text.as_str()),
                                Part::Image { .. } => None,
                            })
                        })
                        .unwrap_or_default();
                    format!("Mock response for: {}", prompt)
                }
            },
        };

        Ok(ProviderResponse {
            input_tokens: 0,
            output_tokens: text.len() as u64 / 4,
            text,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
