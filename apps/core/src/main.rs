//! FilingLens: SEC 8-K event classification pipeline.
//!
//! Downloads 8-K filings, classifies the disclosed events with a local LLM
//! against a configurable event taxonomy, validates the model output against
//! the taxonomy schema, and stores the results.

mod classify;
mod database;
mod error;
mod extract;
mod ingest;
mod llm;
mod models;
mod pipeline;
mod prompt;
mod taxonomy;
mod validator;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm::{GeneratorConfig, GeneratorHandle};
use pipeline::Pipeline;
use prompt::{PromptLibrary, TemplateVariant, DEFAULT_PROMPT_DIR};
use taxonomy::{EventTaxonomy, DEFAULT_TAXONOMY_PATH};

const DEFAULT_DB_PATH: &str = "data/filings.sqlite";

/// FilingLens: classify SEC 8-K filings with a local LLM.
#[derive(Parser)]
#[command(name = "filinglens", version, about)]
struct Cli {
    /// Path to the event taxonomy store.
    #[arg(long, default_value = DEFAULT_TAXONOMY_PATH, global = true)]
    config: PathBuf,

    /// Path to the prompt template directory.
    #[arg(long, default_value = DEFAULT_PROMPT_DIR, global = true)]
    prompts: PathBuf,

    /// Path to the results database.
    #[arg(long, default_value = DEFAULT_DB_PATH, global = true)]
    db: PathBuf,

    /// Model identifier, overriding OLLAMA_MODEL.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Upper bound in seconds on one backend invocation.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a single filing by URL or raw text.
    Classify {
        /// URL of the 8-K filing to download and classify.
        #[arg(long, conflicts_with = "text")]
        url: Option<String>,

        /// Raw filing text to classify directly.
        #[arg(long)]
        text: Option<String>,

        /// Prompt template name (zero_shot.tpl or cot.tpl).
        #[arg(long, default_value = "zero_shot.tpl")]
        template: String,
    },

    /// Classify many filings from a file with one URL per line.
    Batch {
        /// Path to the URL list file.
        url_list: PathBuf,

        /// Prompt template name (zero_shot.tpl or cot.tpl).
        #[arg(long, default_value = "zero_shot.tpl")]
        template: String,
    },

    /// Manage the event taxonomy.
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },

    /// Inspect stored classification results.
    Results {
        #[command(subcommand)]
        action: ResultsAction,
    },
}

#[derive(Subcommand)]
enum EventsAction {
    /// Add a new event type.
    Add {
        label: String,
        /// Default relevance for the new event type.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        relevant: bool,
    },
    /// Remove an event type.
    Remove { label: String },
    /// Update the default relevance of an event type.
    SetRelevance {
        label: String,
        relevant: bool,
    },
    /// List all configured event types.
    List,
}

#[derive(Subcommand)]
enum ResultsAction {
    /// Show one result by id.
    Get { id: String },
    /// List all stored results.
    List,
    /// List results for a filing URL.
    ByUrl { url: String },
    /// Delete one result by id.
    Delete { id: String },
    /// Delete all stored results.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Events { .. } => run_events(&cli),
        Command::Results { .. } => run_results(&cli).await,
        Command::Classify { .. } | Command::Batch { .. } => run_pipeline(cli).await,
    }
}

fn run_events(cli: &Cli) -> Result<()> {
    let Command::Events { action } = &cli.command else {
        unreachable!()
    };
    let mut taxonomy =
        EventTaxonomy::load(&cli.config).context("Failed to load event taxonomy")?;

    match action {
        EventsAction::Add { label, relevant } => {
            taxonomy.add_event_type(label, *relevant)?;
            println!("Added event type: {}", label);
        }
        EventsAction::Remove { label } => {
            if !taxonomy.contains(label) {
                bail!("Unknown event type: {}", label);
            }
            taxonomy.remove_event_type(label)?;
            println!("Removed event type: {}", label);
        }
        EventsAction::SetRelevance { label, relevant } => {
            if !taxonomy.contains(label) {
                bail!("Unknown event type: {}", label);
            }
            taxonomy.update_relevance(label, *relevant)?;
            println!("Updated relevance for {}", label);
        }
        EventsAction::List => {
            println!("Configured event types:");
            for label in taxonomy.labels() {
                println!("- {} (default relevant: {})", label, taxonomy.default_relevance(&label));
            }
        }
    }
    Ok(())
}

async fn run_results(cli: &Cli) -> Result<()> {
    let Command::Results { action } = &cli.command else {
        unreachable!()
    };
    let pool = database::init_db(&cli.db)
        .await
        .context("Failed to initialize database")?;

    match action {
        ResultsAction::Get { id } => match database::get_result(&pool, id).await? {
            Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            None => bail!("Result not found: {}", id),
        },
        ResultsAction::List => {
            let results = database::get_all_results(&pool).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        ResultsAction::ByUrl { url } => {
            let results = database::get_results_by_url(&pool, url).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        ResultsAction::Delete { id } => {
            if database::delete_result(&pool, id).await? {
                println!("Deleted result: {}", id);
            } else {
                bail!("Result not found: {}", id);
            }
        }
        ResultsAction::Clear => {
            let deleted = database::delete_all_results(&pool).await?;
            println!("Deleted {} results", deleted);
        }
    }
    Ok(())
}

async fn run_pipeline(cli: Cli) -> Result<()> {
    let prompts = PromptLibrary::new(&cli.prompts);
    prompts
        .ensure_defaults()
        .context("Failed to initialize prompt templates")?;

    let mut generator_config = GeneratorConfig::from_env();
    if cli.model.is_some() {
        generator_config.model = cli.model.clone();
    }
    let backend = Arc::new(GeneratorHandle::new(generator_config));

    let pool = database::init_db(&cli.db)
        .await
        .context("Failed to initialize database")?;

    let mut pipeline = Pipeline::new(prompts, backend, pool, cli.config.clone());
    if let Some(secs) = cli.timeout_secs {
        pipeline = pipeline.with_generation_timeout(Duration::from_secs(secs));
    }

    match cli.command {
        Command::Classify { url, text, template } => {
            let use_reasoning = TemplateVariant::from_name(&template)? == TemplateVariant::Reasoning;

            let stored = match (url, text) {
                (Some(url), None) => pipeline.classify_url(&url, use_reasoning).await?,
                (None, Some(text)) => pipeline.classify_text(&text, use_reasoning).await?,
                _ => bail!("Exactly one of --url or --text is required"),
            };
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Command::Batch { url_list, template } => {
            let use_reasoning = TemplateVariant::from_name(&template)? == TemplateVariant::Reasoning;

            let raw = std::fs::read_to_string(&url_list)
                .with_context(|| format!("Failed to read {}", url_list.display()))?;
            let urls: Vec<String> = raw
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            info!(count = urls.len(), "starting batch run");

            let items = pipeline.classify_batch(&urls, use_reasoning).await;
            for item in &items {
                match &item.outcome {
                    Ok(stored) => println!(
                        "{}  validation={}  id={}",
                        item.url, stored.validation, stored.id
                    ),
                    Err(e) => println!("{}  error: {}", item.url, e),
                }
            }
            let failed = items.iter().filter(|i| i.outcome.is_err()).count();
            info!(total = items.len(), failed, "batch run complete");
        }
        Command::Events { .. } | Command::Results { .. } => unreachable!(),
    }
    Ok(())
}
