//! Arbiter CLI - score content with an LLM judge.
//!
//! ## Commands
//!
//! - `evaluate`: score content against a rubric and print a report
//! - `check-rubric`: validate a rubric file without calling a model
//! - `prompt`: print the exact request a judge would receive
//!
//! The Anthropic key is read from `ANTHROPIC_API_KEY`, which may live in a
//! `.env` file in the working directory.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use arbiter_core::{EvaluationResult, Rubric};
use arbiter_runtime::{
    evaluate_with_retry, ArbiterConfig, Judge, JudgeProvider, ProviderRegistry, DEFAULT_MODEL,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score content against a rubric with an LLM judge", long_about = None)]
struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score content against a rubric
    Evaluate {
        /// Rubric file (YAML or JSON)
        #[arg(short, long)]
        rubric: PathBuf,

        #[command(flatten)]
        input: ContentArgs,

        /// Config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Judge model, overriding the config
        #[arg(short, long)]
        model: Option<String>,

        /// Per-call timeout, e.g. "45s"
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Token budget for the judge's reply
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Retries on transient provider failures (0 disables)
        #[arg(long)]
        retries: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Validate a rubric file
    CheckRubric {
        /// Rubric file (YAML or JSON)
        rubric: PathBuf,
    },

    /// Print the request a judge would receive, without sending it
    Prompt {
        /// Rubric file (YAML or JSON)
        #[arg(short, long)]
        rubric: PathBuf,

        #[command(flatten)]
        input: ContentArgs,

        /// Config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct ContentArgs {
    /// Content to judge; read from stdin when neither this nor --file is given
    content: Option<String>,

    /// Read the content from a file
    #[arg(long, conflicts_with = "content")]
    file: Option<PathBuf>,
}

impl ContentArgs {
    fn read(&self) -> Result<String> {
        let content = match (&self.content, &self.file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read content from {}", path.display()))?,
            (None, None) => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read content from stdin")?;
                buffer
            }
        };

        if content.trim().is_empty() {
            bail!("Content to judge is empty");
        }
        Ok(content)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Serialize)]
struct Report<'a> {
    evaluated_at: DateTime<Utc>,
    provider: &'a str,
    model: &'a str,
    rubric: Option<&'a str>,
    #[serde(flatten)]
    result: &'a EvaluationResult,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Outcome of reading `.env`, kept until tracing is up to report it.
#[derive(Debug)]
enum EnvFile {
    Loaded(PathBuf),
    Missing,
    Unreadable(String),
}

impl EnvFile {
    fn from_result(result: std::result::Result<PathBuf, dotenvy::Error>) -> Self {
        match result {
            Ok(path) => EnvFile::Loaded(path),
            Err(e) if e.not_found() => EnvFile::Missing,
            Err(e) => EnvFile::Unreadable(e.to_string()),
        }
    }

    fn log(&self) {
        match self {
            EnvFile::Loaded(path) => {
                tracing::debug!(path = %path.display(), "Loaded environment file")
            }
            EnvFile::Missing => {}
            EnvFile::Unreadable(error) => {
                tracing::warn!(error = %error, "Ignoring unreadable .env file")
            }
        }
    }
}

async fn ensure_ready(provider: &dyn JudgeProvider) -> Result<()> {
    if !provider.health_check().await {
        bail!(
            "Judge provider '{}' is not ready: check its API key",
            provider.name()
        );
    }
    Ok(())
}

fn load_rubric(path: &Path) -> Result<Rubric> {
    Rubric::from_file(path).with_context(|| format!("Invalid rubric {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<ArbiterConfig> {
    match path {
        Some(path) => ArbiterConfig::from_file(path)
            .with_context(|| format!("Invalid config {}", path.display())),
        None => Ok(ArbiterConfig::default()),
    }
}

fn set_provider_option(config: &mut ArbiterConfig, key: &str, value: JsonValue) -> Result<()> {
    match config.provider_config.as_object_mut() {
        Some(options) => {
            options.insert(key.to_string(), value);
            Ok(())
        }
        None => bail!("provider_config must be a JSON object"),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_evaluate(
    rubric: PathBuf,
    input: ContentArgs,
    config: Option<PathBuf>,
    model: Option<String>,
    timeout: Option<Duration>,
    max_tokens: Option<u32>,
    retries: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let rubric = load_rubric(&rubric)?;
    let content = input.read()?;

    let mut config = load_config(config.as_deref())?;
    if let Some(model) = model {
        set_provider_option(&mut config, "model", JsonValue::String(model))?;
    }
    if let Some(timeout) = timeout {
        set_provider_option(
            &mut config,
            "timeout",
            JsonValue::String(humantime::format_duration(timeout).to_string()),
        )?;
    }
    if let Some(max_tokens) = max_tokens {
        config.judge.constraints.max_tokens = max_tokens;
    }
    if let Some(retries) = retries {
        config.judge.retry.max_retries = retries;
    }
    config.validate().context("Invalid settings")?;

    let provider = ProviderRegistry::with_defaults()
        .create(&config.provider, &config.provider_config)
        .with_context(|| format!("Failed to set up '{}' judge provider", config.provider))?;
    ensure_ready(&*provider).await?;
    let model = config.provider_config["model"]
        .as_str()
        .unwrap_or(DEFAULT_MODEL)
        .to_string();

    let retry = config.judge.retry.clone();
    let judge = Judge::new(provider).with_config(config.judge);
    let result = evaluate_with_retry(&judge, &content, &rubric, &retry)
        .await
        .context("Evaluation failed")?;

    match format {
        OutputFormat::Json => {
            let report = Report {
                evaluated_at: Utc::now(),
                provider: judge.provider_name(),
                model: &model,
                rubric: rubric.name(),
                result: &result,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("score: {:.2}", result.score);
            for entry in &result.scores {
                let max = rubric
                    .criterion(&entry.criterion)
                    .map(|c| c.max_score)
                    .unwrap_or_default();
                println!("  {}: {} / {}", entry.criterion, entry.score, max);
            }
            if !result.rationale.is_empty() {
                println!("rationale: {}", result.rationale);
            }
        }
    }
    Ok(())
}

fn run_check_rubric(path: PathBuf) -> Result<()> {
    let rubric = load_rubric(&path)?;

    println!(
        "{}: {} criteria{}",
        rubric.name().unwrap_or("rubric"),
        rubric.len(),
        if rubric.is_weighted() { ", weighted" } else { "" }
    );
    for criterion in rubric.criteria() {
        match criterion.weight {
            Some(weight) => println!(
                "  {} (0 to {}, weight {})",
                criterion.name, criterion.max_score, weight
            ),
            None => println!("  {} (0 to {})", criterion.name, criterion.max_score),
        }
    }
    Ok(())
}

fn run_prompt(rubric: PathBuf, input: ContentArgs, config: Option<PathBuf>) -> Result<()> {
    let rubric = load_rubric(&rubric)?;
    let content = input.read()?;
    let config = load_config(config.as_deref())?;

    let system_prompt = config.judge.system_prompt.clone();
    let constraints = config.judge.constraints.clone();
    let prompt = arbiter_runtime::prompts::render_prompt(&rubric, &content, &constraints);

    println!("=== system ===\n{}\n", system_prompt.trim());
    println!("=== user ===\n{}", prompt);
    if !constraints.opening_marker.is_empty() {
        println!("=== assistant (prefill) ===\n{}\n", constraints.opening_marker);
    }
    println!(
        "stop sequence: {:?}, max tokens: {}",
        constraints.closing_marker, constraints.max_tokens
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // .env may set RUST_LOG, so it is read before the filter is built
    let env_file = EnvFile::from_result(dotenvy::dotenv());
    init_tracing(cli.verbose);
    env_file.log();

    match cli.command {
        Commands::Evaluate {
            rubric,
            input,
            config,
            model,
            timeout,
            max_tokens,
            retries,
            format,
        } => {
            run_evaluate(
                rubric, input, config, model, timeout, max_tokens, retries, format,
            )
            .await
        }
        Commands::CheckRubric { rubric } => run_check_rubric(rubric),
        Commands::Prompt {
            rubric,
            input,
            config,
        } => run_prompt(rubric, input, config),
    }
}
