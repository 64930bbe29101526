//! Binary entry point for sightline.
//!
//! Exposes the routing, aggregation, vocabulary and tier components on the
//! command line for inspection and scripting.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::VocabAction;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sightline::config::SightlineConfig;
use sightline::observability::{self, InitOptions};

/// Sightline - routing, tier failover, detection merging and adaptive
/// vocabulary for assistive perception.
#[derive(Parser)]
#[command(name = "sightline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "SIGHTLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Route an utterance to a pipeline.
    Route {
        /// The utterance.
        #[arg(required = true)]
        text: Vec<String>,

        /// Print the decision as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Merge two detection streams (JSON arrays of detections).
    Merge {
        /// General detector output.
        general: PathBuf,

        /// Open-vocabulary detector output.
        open: PathBuf,

        /// Print the merged set as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Inspect or grow the adaptive vocabulary.
    Vocab {
        /// Vocabulary subcommand.
        #[command(subcommand)]
        action: VocabAction,
    },

    /// Run a deep-analysis request through the configured tiers.
    Analyze {
        /// The question.
        #[arg(required = true)]
        query: Vec<String>,

        /// Image to send with the question.
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Feed the response to the vocabulary.
        #[arg(long)]
        learn: bool,

        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show tier health.
    Tiers {
        /// Probe every tier before reporting.
        #[arg(long)]
        probe: bool,
    },

    /// Show the effective configuration.
    Config,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let _observability = match observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: false,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration from an explicit path or the default locations.
fn load_config(path: Option<&Path>) -> sightline::Result<SightlineConfig> {
    let config = match path {
        Some(path) => SightlineConfig::load_from_file(path)?,
        None => SightlineConfig::load_default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Runs the selected command.
async fn run_command(command: Commands, config: SightlineConfig) -> anyhow::Result<()> {
    match command {
        Commands::Route { text, json } => commands::cmd_route(&config, &text.join(" "), json),
        Commands::Merge {
            general,
            open,
            json,
        } => commands::cmd_merge(&config, &general, &open, json),
        Commands::Vocab { action } => commands::cmd_vocab(&config, action),
        Commands::Analyze {
            query,
            image,
            learn,
            json,
        } => commands::cmd_analyze(&config, &query.join(" "), image.as_deref(), learn, json).await,
        Commands::Tiers { probe } => commands::cmd_tiers(&config, probe).await,
        Commands::Config => commands::cmd_config(&config),
    }
}
