//! Provider selection and backend construction.
//!
//! Backends are built once at startup from a [`BackendSpec`] and shared by
//! every stage's [`Generator`](crate::Generator).

use std::sync::Arc;
use std::time::Duration;

use crate::anthropic::{AnthropicBackend, AnthropicConfig};
use crate::backend::SharedBackend;
use crate::error::{LlmError, Result};
use crate::openai::{OpenAiBackend, OpenAiConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Provider Enum
// ─────────────────────────────────────────────────────────────────────────────

/// Supported generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Anthropic Claude API
    Anthropic,
    /// OpenAI API
    OpenAi,
    /// Local Ollama instance
    Ollama,
}

impl Provider {
    /// Get the string name for this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
        }
    }

    /// Parse a provider from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Provider::Anthropic),
            "openai" | "gpt" => Some(Provider::OpenAi),
            "ollama" | "local" => Some(Provider::Ollama),
            _ => None,
        }
    }

    /// Check if this provider requires an API key.
    pub fn requires_api_key(&self) -> bool {
        match self {
            Provider::Anthropic | Provider::OpenAi => true,
            Provider::Ollama => false,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Construction
// ─────────────────────────────────────────────────────────────────────────────

/// Everything needed to construct a backend.
#[derive(Debug, Clone)]
pub struct BackendSpec {
    pub provider: Provider,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// HTTP-level timeout. The pipeline applies its own per-call deadline on top.
    pub timeout: Option<Duration>,
}

impl BackendSpec {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Construct the backend described by `spec`.
pub fn build_backend(spec: &BackendSpec) -> Result<SharedBackend> {
    let api_key = spec.api_key.as_deref().filter(|k| !k.is_empty());
    if spec.provider.requires_api_key() && api_key.is_none() {
        return Err(LlmError::Config(format!(
            "{} backend requires an API key",
            spec.provider
        )));
    }

    match spec.provider {
        Provider::Anthropic => {
            let mut config = AnthropicConfig::new(api_key.unwrap_or_default())
                .with_model(spec.model.clone());
            if let Some(ref url) = spec.base_url {
                config = config.with_base_url(url);
            }
            if let Some(timeout) = spec.timeout {
                config = config.with_timeout(timeout);
            }
            Ok(Arc::new(AnthropicBackend::new(config)?))
        }
        Provider::OpenAi | Provider::Ollama => {
            let base = if spec.provider == Provider::Ollama {
                OpenAiConfig::ollama()
            } else {
                OpenAiConfig::openai(api_key.unwrap_or_default())
            };
            let mut config = base.with_model(spec.model.clone());
            if let (Provider::Ollama, Some(key)) = (spec.provider, api_key) {
                config = config.with_api_key(key);
            }
            if let Some(ref url) = spec.base_url {
                config = config.with_base_url(url);
            }
            if let Some(timeout) = spec.timeout {
                config = config.with_timeout(timeout);
            }
            Ok(Arc::new(OpenAiBackend::new(config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_name() {
        assert_eq!(Provider::from_name("anthropic"), Some(Provider::Anthropic));
        assert_eq!(Provider::from_name("Claude"), Some(Provider::Anthropic));
        assert_eq!(Provider::from_name("OPENAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::from_name("local"), Some(Provider::Ollama));
        assert_eq!(Provider::from_name("groq"), None);
    }

    #[test]
    fn test_requires_api_key() {
        assert!(Provider::Anthropic.requires_api_key());
        assert!(Provider::OpenAi.requires_api_key());
        assert!(!Provider::Ollama.requires_api_key());
    }

    #[test]
    fn test_build_ollama_without_key() {
        let backend = build_backend(&BackendSpec::new(Provider::Ollama, "llama3.1:8b")).unwrap();
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn test_build_cloud_requires_key() {
        let err = build_backend(&BackendSpec::new(Provider::Anthropic, "claude"))
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::Config(_)));

        let backend =
            build_backend(&BackendSpec::new(Provider::OpenAi, "gpt-4o-mini").with_api_key("sk"))
                .unwrap();
        assert_eq!(backend.name(), "openai");
    }
}
