//! Command-line structure.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// heapreel: run a WebAssembly allocator against a scripted workload
/// and scrub through what it did.
#[derive(Parser)]
#[command(name = "heapreel")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a workload into its time-stamped call list
    Compile {
        /// Workload JSON file
        workload: PathBuf,

        #[command(flatten)]
        compiler: CompilerArgs,

        /// Write the calls here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Execute a workload against an allocator and record the trace
    Run {
        /// Allocator module (.wat or .wasm)
        allocator: PathBuf,

        /// Workload JSON file
        workload: PathBuf,

        #[command(flatten)]
        sandbox: SandboxArgs,

        #[command(flatten)]
        compiler: CompilerArgs,

        /// Palette for allocations without a color (e.g. `#4c8bf5,0xf5a04c`)
        #[arg(long, value_delimiter = ',')]
        palette: Vec<String>,

        /// Write the trace here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Measure raw allocator throughput over a workload
    Time {
        /// Allocator module (.wat or .wasm)
        allocator: PathBuf,

        /// Workload JSON file
        workload: PathBuf,

        #[command(flatten)]
        sandbox: SandboxArgs,

        #[command(flatten)]
        compiler: CompilerArgs,

        /// Number of passes, each in a freshly loaded sandbox
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },

    /// Render a recorded trace as text frames
    Replay {
        /// Trace JSON file, as written by `run`
        trace: PathBuf,

        /// Number of cells in the rendered memory
        #[arg(short, long, default_value_t = 256)]
        capacity: u32,

        /// Cells per rendered row
        #[arg(long, default_value_t = 32)]
        width: u32,

        /// Render the single frame at this progress, in [0, 1]
        #[arg(short, long, conflicts_with = "step")]
        progress: Option<f64>,

        /// Render one frame per event, stepping with `next`
        #[arg(long)]
        step: bool,
    },
}

/// Sandbox construction flags.
#[derive(Args)]
pub struct SandboxArgs {
    /// Size of the simulated address space in bytes
    #[arg(short, long, default_value_t = 256)]
    pub capacity: u32,

    /// Instruction budget per allocator call
    #[arg(long)]
    pub fuel: Option<u64>,

    /// Echo allocator log messages as they happen
    #[arg(long)]
    pub debug: bool,

    /// Allocator-specific option, `key=value` (repeatable)
    #[arg(short = 'O', long = "option", value_parser = parse_option)]
    pub options: Vec<(String, String)>,
}

/// Workload compiler flags.
#[derive(Args)]
pub struct CompilerArgs {
    /// Default operation length in milliseconds
    #[arg(long, default_value_t = 500.0)]
    pub interval: f64,

    /// Time of each thread's first operation in milliseconds
    #[arg(long, default_value_t = 0.001)]
    pub start_offset: f64,
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}
