use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "docwatch")]
#[command(about = "Watches documentation sites, diffs what changed, and publishes daily HTML reports")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all sources, diff against stored snapshots, and publish reports
    Run {
        /// Skip report generation
        #[arg(long)]
        no_reports: bool,

        /// Skip the Telegram notification
        #[arg(long)]
        no_notify: bool,
    },

    /// Rebuild the master report listing from stored daily records
    RebuildIndex,

    /// Write a starter configuration file
    Init {
        /// Target path (defaults to docwatch.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Run {
                no_reports,
                no_notify,
            } => {
                engine.run(no_reports, no_notify).await?;
                Ok(())
            }
            Commands::RebuildIndex => engine.rebuild_index().await,
            Commands::Init { path } => engine.init(path).await,
        }
    }
}
