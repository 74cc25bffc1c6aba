//! Configuration types.
//!
//! All sections are optional so that layered files can override one section
//! at a time. Accessors on [`ClaimPilotConfig`] fall back to the built-in
//! defaults for anything no layer sets.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Root Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// ```toml
/// [llm]
/// backend = "ollama"
/// model = "llama3.1:8b"
///
/// [stages.draft]
/// temperature = 0.3
///
/// [pipeline]
/// max_compliance_retries = 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimPilotConfig {
    /// Generation backend shared by every stage.
    pub llm: Option<LlmConfig>,

    /// Per-stage generation overrides.
    pub stages: Option<StagesConfig>,

    /// Controller settings.
    pub pipeline: Option<PipelineConfig>,

    /// Policy retrieval settings.
    pub retrieval: Option<RetrievalConfig>,

    /// Embedding provider used at index and query time.
    pub embedding: Option<EmbeddingConfig>,

    /// Stage audit log settings.
    pub logging: Option<LoggingConfig>,

    /// Run persistence settings.
    pub storage: Option<StorageConfig>,
}

impl ClaimPilotConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole; fields of a section are not merged.
    pub fn merge(&mut self, other: ClaimPilotConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }

        if other.stages.is_some() {
            self.stages = other.stages;
        }

        if other.pipeline.is_some() {
            self.pipeline = other.pipeline;
        }

        if other.retrieval.is_some() {
            self.retrieval = other.retrieval;
        }

        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }

        if other.storage.is_some() {
            self.storage = other.storage;
        }
    }

    /// Effective controller settings.
    pub fn pipeline(&self) -> PipelineConfig {
        self.pipeline.clone().unwrap_or_default()
    }

    /// Effective retrieval settings.
    pub fn retrieval(&self) -> RetrievalConfig {
        self.retrieval.clone().unwrap_or_default()
    }

    /// Effective embedding settings.
    pub fn embedding(&self) -> EmbeddingConfig {
        self.embedding.clone().unwrap_or_default()
    }

    /// Effective stage audit log settings.
    pub fn audit_log(&self) -> AuditLogConfig {
        self.logging.clone().unwrap_or_default().audit
    }

    /// Effective storage settings.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// Overrides for one generation stage, if any were configured.
    pub fn stage(&self, stage: GenerationStage) -> StageConfig {
        let Some(ref stages) = self.stages else {
            return StageConfig::default();
        };
        match stage {
            GenerationStage::Classify => stages.classify.clone(),
            GenerationStage::Draft => stages.draft.clone(),
            GenerationStage::Audit => stages.audit.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Generation backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider.
    pub backend: Option<Backend>,
    /// Model identifier. Defaults per backend.
    pub model: Option<String>,
    /// Custom API base URL (proxies, a remote Ollama host).
    pub base_url: Option<String>,
    /// API key (prefer the backend's env var; warns if set here).
    pub api_key: Option<String>,
    /// HTTP-level request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Get the environment variable name for this backend's API key.
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.env_var())
    }
}

/// Supported generation backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Anthropic,
    Openai,
    #[default]
    Ollama,
}

impl Backend {
    /// Environment variable name for this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Backend::Anthropic => "ANTHROPIC_API_KEY",
            Backend::Openai => "OPENAI_API_KEY",
            Backend::Ollama => "OLLAMA_API_KEY",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Anthropic => "Anthropic",
            Backend::Openai => "OpenAI",
            Backend::Ollama => "Ollama",
        }
    }

    /// Lowercase identifier, as written in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Anthropic => "anthropic",
            Backend::Openai => "openai",
            Backend::Ollama => "ollama",
        }
    }

    /// Model used when `[llm] model` is not set.
    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::Anthropic => "claude-3-5-sonnet-20241022",
            Backend::Openai => "gpt-4",
            Backend::Ollama => "llama3.1:8b",
        }
    }

    /// Whether a run cannot start without an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Backend::Ollama)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// The pipeline stages that call the generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationStage {
    Classify,
    Draft,
    Audit,
}

impl GenerationStage {
    pub const ALL: [GenerationStage; 3] = [
        GenerationStage::Classify,
        GenerationStage::Draft,
        GenerationStage::Audit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GenerationStage::Classify => "classify",
            GenerationStage::Draft => "draft",
            GenerationStage::Audit => "audit",
        }
    }

    /// Sampling temperature when not overridden.
    pub fn default_temperature(&self) -> f32 {
        match self {
            GenerationStage::Classify => 0.0,
            GenerationStage::Draft => 0.3,
            GenerationStage::Audit => 0.0,
        }
    }

    /// Output token ceiling when not overridden.
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            GenerationStage::Classify => 100,
            GenerationStage::Draft => 1500,
            GenerationStage::Audit => 500,
        }
    }
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `[stages.*]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    pub classify: StageConfig,
    pub draft: StageConfig,
    pub audit: StageConfig,
}

/// Overrides for a single stage. Unset fields use the stage defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Use a different model than `[llm] model` for this stage.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Draft/Audit re-runs allowed before a run is escalated.
    pub max_compliance_retries: u32,
    /// Deadline for a single provider or retriever call.
    pub call_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_compliance_retries: 2,
            call_timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Policy retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Excerpts handed to drafting.
    pub top_k: usize,
    /// Index file. Relative paths resolve against the config directory.
    pub database: PathBuf,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            database: PathBuf::from("policies.db"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding provider configuration.
///
/// The same provider and model must be used for indexing and querying; the
/// index refuses embeddings of a different size.
///
/// ```toml
/// [embedding]
/// provider = "openai"
/// model = "text-embedding-3-small"
/// dimensions = 1536
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub dimensions: Option<usize>,
}

impl EmbeddingConfig {
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn effective_dimensions(&self) -> usize {
        self.dimensions
            .unwrap_or_else(|| self.provider.default_dimensions())
    }
}

/// Embedding providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Openai,
    Ollama,
    Mock,
}

impl EmbeddingProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProvider::Openai => "openai",
            EmbeddingProvider::Ollama => "ollama",
            EmbeddingProvider::Mock => "mock",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            EmbeddingProvider::Openai => "text-embedding-3-small",
            EmbeddingProvider::Ollama => "nomic-embed-text",
            EmbeddingProvider::Mock => "mock",
        }
    }

    pub fn default_dimensions(&self) -> usize {
        match self {
            EmbeddingProvider::Openai => 1536,
            EmbeddingProvider::Ollama => 768,
            EmbeddingProvider::Mock => 384,
        }
    }

    /// Env var holding the API key, for providers that need one.
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            EmbeddingProvider::Openai => Some("OPENAI_API_KEY"),
            EmbeddingProvider::Ollama | EmbeddingProvider::Mock => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging and Storage
// ─────────────────────────────────────────────────────────────────────────────

/// `[logging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Stage audit log settings.
    pub audit: AuditLogConfig,
}

/// Settings for the per-stage JSONL audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLogConfig {
    pub enabled: bool,
    /// Directory for JSONL files. Defaults to `<config dir>/audit`.
    pub path: Option<PathBuf>,
    /// Days to retain log files before cleanup.
    pub retention_days: u32,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            retention_days: 90,
        }
    }
}

/// Run persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory receiving one JSON file per saved run.
    pub runs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from("runs"),
        }
    }
}
