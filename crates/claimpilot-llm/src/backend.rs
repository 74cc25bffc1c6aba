//! LLM Backend trait and test doubles.
//!
//! This module defines the transport abstraction over the concrete providers
//! (Anthropic, OpenAI, a local Ollama server) and, behind the `testing`
//! feature, a scriptable mock.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{CompletionRequest, CompletionResponse};

// ─────────────────────────────────────────────────────────────────────────────
// LLM Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for LLM backend providers.
///
/// Implementations issue exactly one request per `complete` call; retry and
/// fallback policy belongs to the caller.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Check if the backend is available and properly configured.
    async fn health_check(&self) -> Result<()>;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "testing"))]
pub use mock::{MockBackend, MockResponse};

#[cfg(any(test, feature = "testing"))]
mod mock {
    use super::*;
    use crate::error::LlmError;
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted reply of a [`MockBackend`].
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        /// Return this text.
        Text(String),
        /// Fail with `LlmError::Backend(message)`.
        Error(String),
        /// Sleep, then return the text. Pairs with paused tokio time in tests.
        Delayed(Duration, String),
        /// Panic inside the call.
        Panic(String),
    }

    impl MockResponse {
        pub fn text(text: impl Into<String>) -> Self {
            Self::Text(text.into())
        }

        pub fn error(message: impl Into<String>) -> Self {
            Self::Error(message.into())
        }

        pub fn delayed(delay: Duration, text: impl Into<String>) -> Self {
            Self::Delayed(delay, text.into())
        }
    }

    /// A mock backend for testing purposes.
    ///
    /// Returns pre-configured responses in order and records every request.
    /// Once the script is exhausted, further calls fail.
    #[derive(Debug)]
    pub struct MockBackend {
        name: String,
        responses: Mutex<Vec<MockResponse>>,
        request_log: Mutex<Vec<CompletionRequest>>,
    }

    impl MockBackend {
        /// Create a new mock backend with the given responses.
        pub fn new(responses: Vec<MockResponse>) -> Self {
            Self {
                name: "mock".to_string(),
                responses: Mutex::new(responses),
                request_log: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock backend returning each text in turn.
        pub fn with_texts<I, S>(texts: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::new(texts.into_iter().map(MockResponse::text).collect())
        }

        /// Create a mock backend with a single text response.
        pub fn with_text(text: impl Into<String>) -> Self {
            Self::new(vec![MockResponse::text(text)])
        }

        /// Set the backend name reported to callers.
        pub fn with_name(mut self, name: impl Into<String>) -> Self {
            self.name = name.into();
            self
        }

        /// Get all requests that were made to this backend.
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.request_log.lock().unwrap().clone()
        }

        /// Get the number of requests made.
        pub fn request_count(&self) -> usize {
            self.request_log.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            let model = request.model.clone();
            self.request_log.lock().unwrap().push(request);

            let next = {
                let mut responses = self.responses.lock().unwrap();
                if responses.is_empty() {
                    None
                } else {
                    Some(responses.remove(0))
                }
            };

            match next {
                None => Err(LlmError::Backend(
                    "MockBackend: no more responses available".to_string(),
                )),
                Some(MockResponse::Text(text)) => {
                    Ok(CompletionResponse::text("mock_msg", model, text))
                }
                Some(MockResponse::Error(message)) => Err(LlmError::Backend(message)),
                Some(MockResponse::Delayed(delay, text)) => {
                    tokio::time::sleep(delay).await;
                    Ok(CompletionResponse::text("mock_msg", model, text))
                }
                Some(MockResponse::Panic(message)) => panic!("{}", message),
            }
        }

        fn name(&self) -> &str {
            &self.name
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use std::time::Duration;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new("test-model", vec![Message::user(text)], 100)
    }

    #[tokio::test]
    async fn test_mock_backend_single_response() {
        let backend = MockBackend::with_text("Hello!");

        let response = backend.complete(request("Hi")).await.unwrap();

        assert_eq!(response.content, "Hello!");
        assert_eq!(response.model, "test-model");
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_multiple_responses() {
        let backend = MockBackend::new(vec![
            MockResponse::text("First"),
            MockResponse::error("boom"),
            MockResponse::text("Third"),
        ]);

        assert_eq!(backend.complete(request("1")).await.unwrap().content, "First");
        assert!(backend.complete(request("2")).await.is_err());
        assert_eq!(backend.complete(request("3")).await.unwrap().content, "Third");
        assert_eq!(backend.requests()[1].messages[0].content, "2");
    }

    #[tokio::test]
    async fn test_mock_backend_exhausted() {
        let backend = MockBackend::new(vec![]);
        assert!(backend.complete(request("Hi")).await.is_err());
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_backend_delayed() {
        let backend = MockBackend::new(vec![MockResponse::delayed(
            Duration::from_secs(30),
            "late",
        )]);

        let start = tokio::time::Instant::now();
        let response = backend.complete(request("Hi")).await.unwrap();
        assert_eq!(response.content, "late");
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_mock_backend_health_check() {
        let backend = MockBackend::with_text("test").with_name("scripted");
        assert!(backend.health_check().await.is_ok());
        assert_eq!(backend.name(), "scripted");
    }
}
