//! Batch driver: identifies aliases and extracts collocates across a corpus.
//!
//! Usage: collocates [--config FILE] [--root DIR] [--workers N] [--force] <aliases|collocates> [TYPE]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collocate_core::{BatchReport, BatchRunner, EntityType, PipelineConfig};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "collocates")]
#[command(about = "Entity alias resolution and collocate extraction for story corpora")]
struct Cli {
    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Corpus root (one subdirectory per story)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    workers: Option<usize>,

    /// Recompute outputs that already exist
    #[arg(long)]
    force: bool,

    /// Log filter, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Locate entity aliases and resolved pronouns in every story
    Aliases {
        /// character, concept or noun (default: the config's `entity_type`)
        #[arg(value_parser = parse_entity_type)]
        entity_type: Option<EntityType>,
    },

    /// Extract dependency collocates for previously located aliases
    Collocates {
        /// character, concept or noun (default: the config's `entity_type`)
        #[arg(value_parser = parse_entity_type)]
        entity_type: Option<EntityType>,
    },
}

fn parse_entity_type(s: &str) -> std::result::Result<EntityType, String> {
    EntityType::from_str(s).ok_or_else(|| {
        let names: Vec<&str> = EntityType::ALL.iter().map(|t| t.name()).collect();
        format!("expected one of: {}", names.join(", "))
    })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = build_config(&cli)?;
    let runner = BatchRunner::new(config);

    let entity_type = runner.config().entity_type.name();
    let report = match cli.command {
        Command::Aliases { .. } => {
            info!(entity_type, "identifying aliases");
            runner.identify_configured_aliases()
        }
        Command::Collocates { .. } => {
            info!(entity_type, "extracting collocates");
            runner.extract_configured_collocates()
        }
    }
    .with_context(|| format!("batch over {} failed", runner.corpus().root().display()))?;

    print_report(&report, cli.json)?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            PipelineConfig::load(path).with_context(|| format!("cannot load config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    config.force |= cli.force;
    if let Command::Aliases { entity_type: Some(entity_type) } | Command::Collocates { entity_type: Some(entity_type) } =
        cli.command
    {
        config.entity_type = entity_type;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "{} processed, {} skipped, {} failed ({} stories)",
        report.processed.len(),
        report.skipped.len(),
        report.failed.len(),
        report.total()
    );
    for (id, error) in &report.failed {
        warn!(story = %id, "{error}");
        println!("  FAILED {id}: {error}");
    }
    Ok(())
}
