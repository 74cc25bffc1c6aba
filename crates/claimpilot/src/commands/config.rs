//! Config command - configuration inspection.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use serde::Serialize;

use claimpilot_config::{
    GenerationStage, resolve_embedding, resolve_llm, resolve_stage, secrets, user_config_dir,
};

use super::Context;

const PROJECT_CONFIG_FILE: &str = "claimpilot.toml";

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration (default)
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./claimpilot.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(local),
        ConfigCommand::Path => cmd_path(),
    }
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    sources: Vec<String>,
    llm: LlmOutput,
    stages: Vec<StageOutput>,
    max_compliance_retries: u32,
    call_timeout_secs: u64,
    top_k: usize,
    database: String,
    embedding: EmbeddingOutput,
    audit_log: Option<String>,
    runs_dir: String,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LlmOutput {
    backend: String,
    model: String,
    base_url: Option<String>,
    api_key: Option<String>,
    api_key_source: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StageOutput {
    stage: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingOutput {
    provider: String,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
}

fn collect(ctx: &Context) -> ShowOutput {
    let loaded = &ctx.loaded;
    let config = &loaded.config;

    let llm = match resolve_llm(config) {
        Ok(resolved) => LlmOutput {
            backend: resolved.backend.as_str().to_string(),
            model: resolved.model,
            base_url: resolved.base_url,
            api_key: resolved.api_key.as_deref().map(secrets::mask),
            api_key_source: resolved.api_key_source.map(|s| s.to_string()),
            error: None,
        },
        Err(e) => {
            let section = config.llm.clone().unwrap_or_default();
            let backend = section.backend.unwrap_or_default();
            LlmOutput {
                backend: backend.as_str().to_string(),
                model: section
                    .model
                    .unwrap_or_else(|| backend.default_model().to_string()),
                base_url: section.base_url,
                api_key: None,
                api_key_source: None,
                error: Some(e.to_string()),
            }
        }
    };

    let stages = GenerationStage::ALL
        .iter()
        .filter_map(|&stage| resolve_stage(config, &llm.model, stage).ok())
        .map(|s| StageOutput {
            stage: s.stage.to_string(),
            model: s.model,
            temperature: s.temperature,
            max_tokens: s.max_tokens,
        })
        .collect();

    let embedding = resolve_embedding(config);
    let pipeline = config.pipeline();
    let audit = config.audit_log();

    ShowOutput {
        sources: loaded
            .loaded_from()
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        llm,
        stages,
        max_compliance_retries: pipeline.max_compliance_retries,
        call_timeout_secs: pipeline.call_timeout_secs,
        top_k: config.retrieval().top_k,
        database: ctx.database_path().display().to_string(),
        embedding: EmbeddingOutput {
            provider: embedding.provider.as_str().to_string(),
            model: embedding.model,
            dimensions: embedding.dimensions,
            api_key: embedding.api_key.as_deref().map(secrets::mask),
        },
        audit_log: audit.enabled.then(|| {
            loaded
                .resolve_path(audit.path.as_deref().unwrap_or(std::path::Path::new("audit")))
                .display()
                .to_string()
        }),
        runs_dir: loaded
            .resolve_path(&config.storage().runs_dir)
            .display()
            .to_string(),
        warnings: loaded.warnings.clone(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let output = collect(ctx);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# ClaimPilot Configuration\n");

    if output.sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &output.sources {
            println!("  {}", source);
        }
        println!();
    }

    let llm = &output.llm;
    println!("Generation:");
    println!("  backend: {}", llm.backend);
    println!("  model:   {}", llm.model);
    if let Some(ref url) = llm.base_url {
        println!("  url:     {}", url);
    }
    match (&llm.api_key, &llm.api_key_source) {
        (Some(key), Some(source)) => println!("  api key: {} ({})", key, source),
        _ => println!("  api key: (none)"),
    }
    if let Some(ref error) = llm.error {
        println!("  ⚠ {}", error);
    }
    println!();

    println!("Stages:");
    for stage in &output.stages {
        println!(
            "  {:<10} {}  temperature={}  max_tokens={}",
            stage.stage, stage.model, stage.temperature, stage.max_tokens
        );
    }
    println!();

    println!("Pipeline:");
    println!("  max_compliance_retries: {}", output.max_compliance_retries);
    println!("  call_timeout_secs:      {}", output.call_timeout_secs);
    println!("  top_k:                  {}", output.top_k);
    println!();

    println!("Retrieval:");
    println!("  database:  {}", output.database);
    println!(
        "  embedding: {} / {} ({} dims)",
        output.embedding.provider, output.embedding.model, output.embedding.dimensions
    );
    if let Some(ref key) = output.embedding.api_key {
        println!("  api key:   {}", key);
    }
    println!();

    println!("Storage:");
    println!(
        "  audit log: {}",
        output.audit_log.as_deref().unwrap_or("(disabled)")
    );
    println!("  runs:      {}", output.runs_dir);
    println!();

    if !output.warnings.is_empty() {
        println!("Warnings:");
        for w in &output.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = ctx.loaded.config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'claimpilot config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(PROJECT_CONFIG_FILE)
    } else {
        let dir =
            user_config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&dir)?;
        dir.join("config.toml")
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    std::fs::write(&path, TEMPLATE)?;
    println!("✓ Created config file: {}", path.display());

    Ok(())
}

fn cmd_path() -> Result<()> {
    if let Some(path) = claimpilot_config::user_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}

const TEMPLATE: &str = r#"# ClaimPilot Configuration

# Generation backend: ollama | anthropic | openai
# API keys come from ANTHROPIC_API_KEY / OPENAI_API_KEY.
[llm]
backend = "ollama"
model = "llama3.1:8b"
# base_url = "http://localhost:11434/v1"

# Per-stage overrides
[stages.classify]
temperature = 0.0
max_tokens = 100

[stages.draft]
temperature = 0.3
max_tokens = 1500

[stages.audit]
temperature = 0.0
max_tokens = 500

[pipeline]
max_compliance_retries = 2
call_timeout_secs = 120

[retrieval]
top_k = 3
database = "policies.db"

# Embeddings for policy retrieval: openai | ollama | mock
[embedding]
provider = "ollama"
model = "nomic-embed-text"
dimensions = 768

[logging.audit]
enabled = true
retention_days = 90

[storage]
runs_dir = "runs"
"#;
