//! Turns a loaded [`ClaimPilotConfig`] into concrete settings.
//!
//! The config crate does not know about backend types; the binary feeds the
//! resolved values into the LLM and retrieval crates.

use std::time::Duration;

use crate::secrets::{self, SecretSource};
use crate::{Backend, ClaimPilotConfig, ConfigError, EmbeddingProvider, GenerationStage, Result};

/// A fully resolved generation backend.
#[derive(Debug, Clone)]
pub struct ResolvedLlm {
    pub backend: Backend,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_source: Option<SecretSource>,
    pub timeout: Option<Duration>,
}

/// Model, temperature and token ceiling for one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSettings {
    pub stage: GenerationStage,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A fully resolved embedding provider.
#[derive(Debug, Clone)]
pub struct ResolvedEmbedding {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimensions: usize,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Resolve the generation backend.
///
/// With no `[llm]` section the local Ollama backend is used. Cloud backends
/// fail here when no API key can be found.
pub fn resolve_llm(config: &ClaimPilotConfig) -> Result<ResolvedLlm> {
    let llm = config.llm.clone().unwrap_or_default();
    let backend = llm.backend.unwrap_or_default();
    let model = llm
        .model
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| backend.default_model().to_string());

    let resolved_secret = secrets::resolve_api_key(&backend, llm.api_key.as_deref());
    if backend.requires_api_key() && resolved_secret.is_none() {
        return Err(ConfigError::ApiKeyNotFound {
            backend: backend.as_str().to_string(),
            env_var: backend.env_var().to_string(),
        });
    }
    let (api_key, api_key_source) = match resolved_secret {
        Some(s) => (Some(s.value), Some(s.source)),
        None => (None, None),
    };

    Ok(ResolvedLlm {
        backend,
        model,
        base_url: llm.base_url,
        api_key,
        api_key_source,
        timeout: llm.timeout_secs.map(Duration::from_secs),
    })
}

/// Resolve one stage's generation settings on top of the backend's model.
pub fn resolve_stage(
    config: &ClaimPilotConfig,
    default_model: &str,
    stage: GenerationStage,
) -> Result<StageSettings> {
    let overrides = config.stage(stage);

    let temperature = overrides
        .temperature
        .unwrap_or_else(|| stage.default_temperature());
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::InvalidValue {
            field: format!("stages.{}.temperature", stage),
            reason: format!("{} is outside 0.0..=2.0", temperature),
        });
    }

    let max_tokens = overrides
        .max_tokens
        .unwrap_or_else(|| stage.default_max_tokens());
    if max_tokens == 0 {
        return Err(ConfigError::InvalidValue {
            field: format!("stages.{}.max_tokens", stage),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(StageSettings {
        stage,
        model: overrides
            .model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model.to_string()),
        temperature,
        max_tokens,
    })
}

/// Resolve the embedding provider, including its API key.
pub fn resolve_embedding(config: &ClaimPilotConfig) -> ResolvedEmbedding {
    let embedding = config.embedding();
    let api_key = embedding
        .provider
        .env_var()
        .and_then(|var| secrets::resolve_from(var, embedding.api_key.as_deref()))
        .map(|s| s.value);

    ResolvedEmbedding {
        provider: embedding.provider,
        model: embedding.effective_model(),
        dimensions: embedding.effective_dimensions(),
        base_url: embedding.base_url.clone(),
        api_key,
    }
}
