//! Argus-CTI - Feed-to-MISP threat intelligence pipeline

mod config;
mod pipeline;

use anyhow::{Context, Result};
use argus_core::{FilterEngine, RuleSet};
use argus_enrich::{EnrichConfig, TagInferer};
use argus_feeds::{FeedSource, RecencyWindow};
use argus_misp::{EventSink, MispClient};
use argus_store::{SeenStore, DEFAULT_SEEN_PATH};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "argus-cti")]
#[command(about = "Argus-CTI pipeline: fetch -> infer -> filter -> MISP")]
#[command(version)]
struct Cli {
    /// Enable verbose logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Logging level
    #[arg(
        long,
        global = true,
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once
    Run(RunArgs),

    /// Validate a filters file
    ValidateFilters {
        /// Path to the filters YAML/JSON file
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to the feeds YAML/JSON file
    #[arg(long)]
    feeds: PathBuf,

    /// Path to the filters YAML/JSON file
    #[arg(long)]
    filters: PathBuf,

    /// MISP instance URL
    #[arg(long, env = "MISP_URL")]
    misp_url: Option<String>,

    /// MISP API key
    #[arg(long, env = "MISP_KEY", hide_env_values = true)]
    misp_key: Option<String>,

    /// Only include entries from the last N hours
    #[arg(long, default_value_t = 24)]
    hours: u32,

    /// Where already-published ids are kept
    #[arg(long, env = "ARGUS_SEEN_PATH", default_value = DEFAULT_SEEN_PATH)]
    seen_path: PathBuf,

    /// Verify the MISP TLS certificate
    #[arg(long)]
    verify_tls: bool,

    /// Log what would be published without publishing or saving
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => {
            run_pipeline(args).await?;
        }
        Commands::ValidateFilters { path } => {
            validate_filters_file(&path)?;
        }
    }

    Ok(())
}

async fn run_pipeline(args: RunArgs) -> Result<()> {
    info!("Loading feeds from {:?}", args.feeds);
    let urls = config::load_feeds(&args.feeds)?;
    let filter = config::load_filters(&args.filters)?.map(FilterEngine::new);

    let sink: Option<Box<dyn EventSink>> = if args.dry_run {
        info!("Dry run: nothing will be published or saved");
        None
    } else {
        let url = args
            .misp_url
            .context("MISP URL is required (--misp-url or MISP_URL)")?;
        let key = args
            .misp_key
            .context("MISP API key is required (--misp-key or MISP_KEY)")?;
        let client = MispClient::new(&url, key, args.verify_tls)?;
        Some(Box::new(client) as Box<dyn EventSink>)
    };

    let source = FeedSource::new(urls.as_slice())?;
    let enrich_config = EnrichConfig::from_env()?;
    let inferer = TagInferer::from_config(&enrich_config);

    let pipeline = Pipeline::new(
        Box::new(source),
        Box::new(inferer),
        filter,
        sink,
        SeenStore::new(&args.seen_path),
        RecencyWindow::hours(args.hours),
    );
    let report = pipeline.run().await?;

    if pipeline.is_dry_run() {
        eprintln!("Would process {} new entries", report.planned);
    } else {
        eprintln!("Processed {} new entries", report.new_entries());
        if report.failed > 0 {
            eprintln!("{} entries failed and will be retried", report.failed);
        }
    }
    Ok(())
}

fn validate_filters_file(path: &PathBuf) -> Result<()> {
    info!("Validating filters: {:?}", path);

    let rules: RuleSet = match config::load_filters(path) {
        Ok(Some(rules)) => rules,
        Ok(None) => {
            println!("Filters file defines no rules; every entry would pass through.");
            return Ok(());
        }
        Err(e) => {
            eprintln!("Filters validation failed:");
            eprintln!("  - {:#}", e);
            anyhow::bail!("Validation failed");
        }
    };

    println!("Filters are valid!");
    println!("  Rules: {}", rules.len());
    for (index, rule) in rules.rules().iter().enumerate() {
        if rule.is_empty() {
            println!("    - rule {}: matches every entry", index);
            continue;
        }
        let conditions: Vec<String> = rule
            .conditions
            .iter()
            .map(|c| format!("{} {}", c.field, c.criterion))
            .collect();
        println!("    - rule {}: {}", index, conditions.join(" AND "));
    }
    Ok(())
}
