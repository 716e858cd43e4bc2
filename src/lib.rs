mod commands;
mod pipeline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Read player attributes from card screenshots.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "card-scan", version)]
pub struct Cli {
    /// Data directory holding config.json, roi_config.json, player_names.json and models/
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Debug logging for every crate
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip the result cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Save intermediate images to the debug directory
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Recognize card screenshots, one JSON line per image
    Scan {
        /// Image files or directories of screenshots
        #[arg(required = true, value_name = "FILE_OR_DIR")]
        paths: Vec<PathBuf>,
    },
    /// Record a player name correction
    Correct {
        /// Name as it was read
        raw: String,
        /// Name it should read as
        corrected: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "card_scan=debug,card_vision=debug,card_data=debug,card_capture=debug"
    } else {
        "card_scan=info,card_vision=info,card_data=info,card_capture=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute(cli) {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let data_dir = card_data::resolve_data_dir(cli.data_dir);
    tracing::info!("Data directory: {}", data_dir.display());
    let mut data = card_data::CardData::load(&data_dir);
    if cli.no_cache {
        data.settings.enable_caching = false;
    }
    if cli.debug {
        data.settings.debug_mode = true;
    }

    match cli.command {
        Command::Scan { paths } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            let mut stdout = std::io::stdout().lock();
            runtime.block_on(commands::scan(&data, paths, &mut stdout))?;
        }
        Command::Correct { raw, corrected } => {
            commands::correct(&data, &raw, &corrected)?;
        }
    }
    Ok(())
}
