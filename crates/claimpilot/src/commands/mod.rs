//! CLI command handlers.

pub mod config;
pub mod index;
pub mod payers;
pub mod run;
pub mod runs;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use claimpilot_config::{
    GenerationStage, LoadedConfig, ResolvedLlm, load_config, load_explicit, resolve_embedding,
    resolve_llm, resolve_stage,
};
use claimpilot_llm::{
    BackendSpec, EmbedderSpec, GenerationSettings, Generator, Provider, SharedBackend,
    SharedEmbedder, SharedProvider, build_backend, build_embedder,
};
use claimpilot_pipeline::{
    AppealPipeline, JsonRunStore, PipelineSettings, StageAuditConfig, StageAuditLogger,
};
use claimpilot_retrieval::PolicyIndex;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration and where it came from.
    pub loaded: LoadedConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load configuration from `explicit` or by discovery.
    pub fn load(explicit: Option<&Path>, json_output: bool, verbose: bool) -> Result<Self> {
        let loaded = match explicit {
            Some(path) => load_explicit(path)?,
            None => load_config(None)?,
        };
        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }

        Ok(Self {
            loaded,
            json_output,
            verbose,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Component construction
    // ─────────────────────────────────────────────────────────────────────

    /// Build the configured generation backend.
    pub fn backend(&self) -> Result<(ResolvedLlm, SharedBackend)> {
        let resolved = resolve_llm(&self.loaded.config)?;
        let provider = Provider::from_name(resolved.backend.as_str())
            .ok_or_else(|| anyhow!("unsupported backend '{}'", resolved.backend))?;

        let mut spec = BackendSpec::new(provider, resolved.model.clone());
        if let Some(ref key) = resolved.api_key {
            spec = spec.with_api_key(key);
        }
        if let Some(ref url) = resolved.base_url {
            spec = spec.with_base_url(url);
        }
        if let Some(timeout) = resolved.timeout {
            spec = spec.with_timeout(timeout);
        }

        let backend = build_backend(&spec)?;
        Ok((resolved, backend))
    }

    /// Wrap `backend` with one stage's sampling settings.
    fn generator(
        &self,
        backend: &SharedBackend,
        resolved: &ResolvedLlm,
        stage: GenerationStage,
    ) -> Result<SharedProvider> {
        let settings = resolve_stage(&self.loaded.config, &resolved.model, stage)?;
        tracing::debug!(
            stage = %stage,
            model = %settings.model,
            temperature = settings.temperature,
            max_tokens = settings.max_tokens,
            "Stage generation settings"
        );
        let settings =
            GenerationSettings::new(settings.model, settings.temperature, settings.max_tokens);
        Ok(Generator::new(backend.clone(), settings).shared())
    }

    pub fn embedder(&self) -> Result<SharedEmbedder> {
        let resolved = resolve_embedding(&self.loaded.config);
        let spec = EmbedderSpec {
            provider: resolved.provider.as_str().to_string(),
            model: Some(resolved.model),
            base_url: resolved.base_url,
            api_key: resolved.api_key,
            dimensions: Some(resolved.dimensions),
        };
        Ok(build_embedder(&spec)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.loaded
            .resolve_path(&self.loaded.config.retrieval().database)
    }

    /// Open (creating if needed) the policy index.
    pub fn open_index(&self) -> Result<PolicyIndex> {
        let path = self.database_path();
        tracing::debug!(path = %path.display(), "Opening policy index");
        Ok(PolicyIndex::open(&path, self.embedder()?)?)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let config = &self.loaded.config;
        let pipeline = config.pipeline();
        PipelineSettings::default()
            .with_max_compliance_retries(pipeline.max_compliance_retries)
            .with_call_timeout(pipeline.call_timeout())
            .with_top_k(config.retrieval().top_k)
    }

    /// The stage audit logger, if `[logging.audit]` enables it.
    pub fn audit_logger(&self) -> Result<Option<Arc<StageAuditLogger>>> {
        let audit = self.loaded.config.audit_log();
        if !audit.enabled {
            return Ok(None);
        }

        let dir = self
            .loaded
            .resolve_path(audit.path.as_deref().unwrap_or(Path::new("audit")));
        let config = StageAuditConfig::new(dir).with_retention_days(audit.retention_days);
        Ok(Some(Arc::new(StageAuditLogger::new(config)?)))
    }

    /// Assemble the full pipeline from configuration.
    pub fn pipeline(&self) -> Result<AppealPipeline> {
        let (resolved, backend) = self.backend()?;
        let classifier = self.generator(&backend, &resolved, GenerationStage::Classify)?;
        let drafter = self.generator(&backend, &resolved, GenerationStage::Draft)?;
        let auditor = self.generator(&backend, &resolved, GenerationStage::Audit)?;
        let retriever = Arc::new(self.open_index()?);

        let mut pipeline = AppealPipeline::new(
            classifier,
            drafter,
            auditor,
            retriever,
            self.pipeline_settings(),
        )?;
        if let Some(logger) = self.audit_logger()? {
            pipeline = pipeline.with_audit_log(logger);
        }
        Ok(pipeline)
    }

    pub fn run_store(&self) -> JsonRunStore {
        JsonRunStore::new(
            self.loaded
                .resolve_path(&self.loaded.config.storage().runs_dir),
        )
    }
}
