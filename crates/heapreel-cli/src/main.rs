//! heapreel command-line driver.
//!
//! Usage:
//!   heapreel compile <workload.json>
//!   heapreel run <allocator.wat> <workload.json> [-c 256] [-O key=value]
//!   heapreel time <allocator.wat> <workload.json> [--repeat N]
//!   heapreel replay <trace.json> [--progress 0.5 | --step]
//!
//! Traces go to stdout (or `--output`); diagnostics and allocator logs
//! go to stderr.

mod cli;
mod commands;
mod grid;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Compile {
            workload,
            compiler,
            output,
        } => commands::compile_cmd(&workload, &compiler, output.as_deref()),
        Commands::Run {
            allocator,
            workload,
            sandbox,
            compiler,
            palette,
            output,
        } => commands::run_cmd(
            &allocator,
            &workload,
            &sandbox,
            &compiler,
            &palette,
            output.as_deref(),
        ),
        Commands::Time {
            allocator,
            workload,
            sandbox,
            compiler,
            repeat,
        } => commands::time_cmd(&allocator, &workload, &sandbox, &compiler, repeat),
        Commands::Replay {
            trace,
            capacity,
            width,
            progress,
            step,
        } => commands::replay_cmd(&trace, capacity, width, progress, step),
    }
}
