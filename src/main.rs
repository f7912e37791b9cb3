//! prompt-shim CLI.
//!
//! Usage:
//!   prompt-shim synthesize --schema builtin:analyst_signal --preset trading
//!   prompt-shim intercept --schema response.json --prompt prompt.json --agent risk_manager

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use prompt_shim::clients::{CallOptions, InterceptingAgent, LlmRequest, call_llm};
use prompt_shim::config::{ModelSelection, ShimConfig};
use prompt_shim::prompt::Prompt;
use prompt_shim::schema::Schema;
use prompt_shim::schemas;
use prompt_shim::synth::{DefaultOverrides, synthesize};
use tracing::info;
use tracing_subscriber::EnvFilter;

const BUILTIN_PREFIX: &str = "builtin:";

#[derive(Parser)]
#[command(name = "prompt-shim")]
#[command(about = "Intercept structured LLM calls and answer with default responses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default instance for a schema
    Synthesize {
        #[command(flatten)]
        defaults: DefaultsArgs,
    },
    /// Record a prompt as an intercepted call and print the default response
    Intercept {
        #[command(flatten)]
        defaults: DefaultsArgs,
        /// Prompt file: a JSON array of {role, content} messages, or plain text
        #[arg(long)]
        prompt: PathBuf,
        /// Agent the call is made for
        #[arg(long)]
        agent: Option<String>,
        /// Component issuing the call
        #[arg(long)]
        caller: Option<String>,
    },
}

#[derive(Args)]
struct DefaultsArgs {
    /// JSON Schema or descriptor file, or builtin:<name>
    #[arg(long)]
    schema: String,
    /// Schema name, replacing the document title
    #[arg(long)]
    name: Option<String>,
    /// Field override as name=value; repeatable
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,
    /// Override preset applied before --set values
    #[arg(long, value_enum)]
    preset: Option<Preset>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Trading,
}

impl DefaultsArgs {
    fn load_schema(&self) -> Result<Schema> {
        let (document, fallback) = match self.schema.strip_prefix(BUILTIN_PREFIX) {
            Some(name) => {
                let doc = schemas::builtin(name).with_context(|| {
                    format!(
                        "unknown builtin schema '{}' (available: {})",
                        name,
                        schemas::BUILTIN_NAMES.join(", ")
                    )
                })?;
                (doc, name.to_string())
            }
            None => {
                let path = Path::new(&self.schema);
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read schema {}", path.display()))?;
                let doc = serde_json::from_str(&text)
                    .with_context(|| format!("schema {} is not valid JSON", path.display()))?;
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Response")
                    .to_string();
                (doc, stem)
            }
        };

        let mut schema = Schema::from_document(&fallback, &document)?;
        if let Some(name) = &self.name {
            schema.name = name.clone();
        }
        Ok(schema)
    }

    fn overrides(&self) -> Result<DefaultOverrides> {
        let mut overrides = match self.preset {
            Some(Preset::Trading) => DefaultOverrides::trading(),
            None => DefaultOverrides::new(),
        };
        overrides.extend(DefaultOverrides::from_pairs(&self.overrides)?);
        Ok(overrides)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    ShimConfig::load_env_file();

    // stdout carries transcripts and JSON; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(ShimConfig::log_filter(|key| {
            std::env::var(key).ok()
        })))
        .with_writer(std::io::stderr)
        .init();

    let config = ShimConfig::load()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Synthesize { defaults } => {
            let schema = defaults.load_schema()?;
            let instance = synthesize(&schema, &defaults.overrides()?)?;
            println!("{}", serde_json::to_string_pretty(&instance)?);
        }
        Commands::Intercept {
            defaults,
            prompt,
            agent,
            caller,
        } => {
            let schema = defaults.load_schema()?;
            let overrides = defaults.overrides()?;
            let text = std::fs::read_to_string(&prompt)
                .with_context(|| format!("failed to read prompt {}", prompt.display()))?;

            let mut request = LlmRequest::new(Prompt::from_text(&text))
                .with_model(ModelSelection::resolve(&config, agent.as_deref()));
            request.agent = agent;
            request.caller = caller;

            info!(
                output_dir = %config.output_dir.display(),
                "Intercepting call for schema {}",
                schema.name
            );
            let shim = InterceptingAgent::from_config(&config).with_overrides(overrides.clone());
            let options = CallOptions::default()
                .with_max_retries(config.max_retries)
                .with_overrides(overrides);
            let value = call_llm(&shim, &request, &schema, &options).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}
