//! Configuration system for ClaimPilot.
//!
//! Provides TOML-based configuration with:
//! - A single generation backend with per-stage temperature and token overrides
//! - Layered config discovery (user config dir → project-local)
//! - API key resolution (env var → config file)
//!
//! # Example
//!
//! ```toml
//! [llm]
//! backend = "ollama"
//! model = "llama3.1:8b"
//!
//! [stages.draft]
//! temperature = 0.3
//! max_tokens = 1500
//!
//! [pipeline]
//! max_compliance_retries = 2
//! call_timeout_secs = 120
//! ```

pub mod discovery;
pub mod error;
pub mod resolver;
pub mod secrets;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, load_explicit, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use resolver::{
    ResolvedEmbedding, ResolvedLlm, StageSettings, resolve_embedding, resolve_llm, resolve_stage,
};
pub use secrets::{ResolvedSecret, SecretSource, resolve_api_key};
pub use types::{
    AuditLogConfig, Backend, ClaimPilotConfig, EmbeddingConfig, EmbeddingProvider,
    GenerationStage, LlmConfig, LoggingConfig, PipelineConfig, RetrievalConfig, StageConfig,
    StagesConfig, StorageConfig,
};
