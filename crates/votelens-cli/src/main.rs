mod config;
mod context;
mod entrypoints;
mod outcomes;
mod recommendations;
mod votes;

use std::time::Instant;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::context::{Context, StageStats};

#[derive(Parser)]
#[command(name = "votelens", version)]
#[command(about = "Resolve Bundestag roll-call votes to the documents they decide and derive per-party outcomes")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Recompute stage outputs even if they already exist
    #[arg(long, global = true)]
    force: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Fetch votes, record party ballots and resolve entrypoints
    Entrypoints,
    /// Parse recommendation documents into underlying proposals
    Recommendations,
    /// Build the votes table with document content
    Build,
    /// Derive per-party outcomes with mirroring
    Outcomes,
    /// Run every stage in order
    Run,
}

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Entrypoints,
    Recommendations,
    Build,
    Outcomes,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Self::Entrypoints => "entrypoints",
            Self::Recommendations => "recommendations",
            Self::Build => "build",
            Self::Outcomes => "outcomes",
        }
    }

    async fn run(self, ctx: &Context) -> Result<StageStats> {
        match self {
            Self::Entrypoints => entrypoints::run(ctx).await,
            Self::Recommendations => recommendations::run(ctx).await,
            Self::Build => votes::run(ctx).await,
            Self::Outcomes => outcomes::run(ctx).await,
        }
    }
}

impl Command {
    fn stages(self) -> &'static [Stage] {
        match self {
            Self::Entrypoints => &[Stage::Entrypoints],
            Self::Recommendations => &[Stage::Recommendations],
            Self::Build => &[Stage::Build],
            Self::Outcomes => &[Stage::Outcomes],
            Self::Run => &[
                Stage::Entrypoints,
                Stage::Recommendations,
                Stage::Build,
                Stage::Outcomes,
            ],
        }
    }
}

async fn run(ctx: &Context, command: Command) -> Result<()> {
    for &stage in command.stages() {
        let start = Instant::now();
        let stats = stage.run(ctx).await?;
        info!(
            stage = stage.name(),
            items = stats.items,
            failed = stats.failed,
            rows = stats.rows,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "stage complete"
        );
        eprintln!(
            "  {:<16} {} items, {} failed, {} rows",
            stage.name(),
            stats.items,
            stats.failed,
            stats.rows
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("votelens v{}", env!("CARGO_PKG_VERSION"));

    let ctx = Context::from_settings(&cli.settings)?.with_force(cli.force);
    run(&ctx, cli.command).await
}
