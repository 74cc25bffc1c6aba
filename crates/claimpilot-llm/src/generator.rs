//! The generation provider contract used by pipeline stages.
//!
//! A [`GenerationProvider`] turns a prompt into text. [`Generator`] is the
//! shipped implementation: a shared [`LlmBackend`] paired with the sampling
//! settings of one stage. Every failure surfaces as
//! [`LlmError::GenerationFailed`] and every call emits one tracing event with
//! sizes and latency, never the prompt or response text.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::backend::SharedBackend;
use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, Message};

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Per-stage sampling configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationSettings {
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can turn a prompt into generated text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for `prompt`, optionally steered by a system prompt.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;

    /// Name of the underlying provider, for logs.
    fn name(&self) -> &str;
}

/// A provider that can be shared across threads.
pub type SharedProvider = Arc<dyn GenerationProvider>;

// ─────────────────────────────────────────────────────────────────────────────
// Generator
// ─────────────────────────────────────────────────────────────────────────────

/// A backend bound to one stage's [`GenerationSettings`].
#[derive(Clone)]
pub struct Generator {
    backend: SharedBackend,
    settings: GenerationSettings,
}

impl Generator {
    pub fn new(backend: SharedBackend, settings: GenerationSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Wrap into a [`SharedProvider`].
    pub fn shared(self) -> SharedProvider {
        Arc::new(self)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl GenerationProvider for Generator {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let mut request = CompletionRequest::new(
            self.settings.model.clone(),
            vec![Message::user(prompt)],
            self.settings.max_tokens,
        )
        .with_temperature(self.settings.temperature);
        if let Some(system) = system {
            request = request.with_system(system);
        }

        let provider = self.backend.name();
        let started = Instant::now();
        let result = self.backend.complete(request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                tracing::info!(
                    provider,
                    model = %self.settings.model,
                    prompt_len = prompt.len(),
                    response_len = response.content.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    latency_ms,
                    "Generation completed"
                );
                Ok(response.content)
            }
            Err(e) => {
                tracing::warn!(
                    provider,
                    model = %self.settings.model,
                    prompt_len = prompt.len(),
                    latency_ms,
                    error = %e,
                    "Generation failed"
                );
                Err(match e {
                    already @ LlmError::GenerationFailed { .. } => already,
                    other => LlmError::generation_failed(provider, other),
                })
            }
        }
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}
