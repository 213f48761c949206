//! Subcommand implementations.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use heapreel::engine::time;
use heapreel::prelude::*;
use heapreel::replay::{read_trace, write_trace};
use heapreel::workload::{attr::parse_color, parse_workload};

use crate::cli::{CompilerArgs, SandboxArgs};
use crate::grid::TextGrid;

// ── Helpers ────────────────────────────────────────────────────────

fn compiler_config(args: &CompilerArgs) -> Result<CompilerConfig> {
    let config = CompilerConfig {
        default_interval: Micros::from_millis_f64(args.interval)
            .with_context(|| format!("invalid --interval {}", args.interval))?,
        start_offset: Micros::from_millis_f64(args.start_offset)
            .with_context(|| format!("invalid --start-offset {}", args.start_offset))?,
    };
    config.validate()?;
    Ok(config)
}

fn compile_file(path: &Path, config: &CompilerConfig) -> Result<Vec<Call>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading workload {}", path.display()))?;
    let nodes = parse_workload(&json).with_context(|| format!("parsing {}", path.display()))?;
    let calls =
        compile(&nodes, config).with_context(|| format!("compiling {}", path.display()))?;
    Ok(calls)
}

fn sandbox_options(args: &SandboxArgs) -> SandboxOptions {
    let mut options = SandboxOptions {
        fuel: args.fuel,
        debug: args.debug,
        ..SandboxOptions::with_capacity(args.capacity)
    };
    for (k, v) in &args.options {
        options = options.option(k.clone(), v.clone());
    }
    options
}

fn load_sandbox(path: &Path, options: SandboxOptions) -> Result<Sandbox> {
    let source =
        fs::read(path).with_context(|| format!("reading allocator {}", path.display()))?;
    Sandbox::load(source, options).with_context(|| format!("loading {}", path.display()))
}

/// Open `path` for writing, or stdout.
fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating {}", p.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn print_logs(logs: &[LogRecord]) {
    for log in logs {
        eprintln!(
            "[t{} @{}] {}: {}",
            log.thread_id,
            log.time,
            log.level(),
            log.message()
        );
    }
}

// ── compile ────────────────────────────────────────────────────────

pub fn compile_cmd(workload: &Path, args: &CompilerArgs, out: Option<&Path>) -> Result<()> {
    let calls = compile_file(workload, &compiler_config(args)?)?;
    let mut w = output(out)?;
    serde_json::to_writer_pretty(&mut w, &calls)?;
    writeln!(w)?;
    w.flush()?;
    tracing::info!(calls = calls.len(), "workload compiled");
    Ok(())
}

// ── run ────────────────────────────────────────────────────────────

pub fn run_cmd(
    allocator: &Path,
    workload: &Path,
    sandbox: &SandboxArgs,
    compiler: &CompilerArgs,
    palette: &[String],
    out: Option<&Path>,
) -> Result<()> {
    let calls = compile_file(workload, &compiler_config(compiler)?)?;
    let mut config = EngineConfig::default();
    if !palette.is_empty() {
        config.palette = palette
            .iter()
            .map(|s| parse_color(s).with_context(|| format!("invalid palette color '{s}'")))
            .collect::<Result<_>>()?;
    }
    let host = load_sandbox(allocator, sandbox_options(sandbox))?;

    let result = match run(host, calls, &config) {
        Ok(result) => result,
        Err(e) => {
            print_logs(&e.logs);
            return Err(e).context("allocator run failed");
        }
    };
    print_logs(&result.logs);

    let mut w = output(out)?;
    write_trace(&result.trace, &mut w)?;
    w.flush()?;

    let m = &result.metrics;
    eprintln!(
        "{} calls ({} malloc, {} free, {} annotate), {} log entries in {}µs",
        m.calls, m.mallocs, m.frees, m.annotations, m.log_entries, m.wall_us
    );
    match result.peak_address {
        Some(peak) => eprintln!(
            "peak address {peak}, {} bytes in {} blocks still allocated",
            result.occupied,
            result.live_allocations.len()
        ),
        None => eprintln!("nothing was allocated"),
    }
    Ok(())
}

// ── time ───────────────────────────────────────────────────────────

pub fn time_cmd(
    allocator: &Path,
    workload: &Path,
    sandbox: &SandboxArgs,
    compiler: &CompilerArgs,
    repeat: u32,
) -> Result<()> {
    if repeat == 0 {
        bail!("--repeat must be at least 1");
    }
    let calls = compile_file(workload, &compiler_config(compiler)?)?;
    let options = sandbox_options(sandbox);
    let mut total_ops = 0usize;
    let mut total_secs = 0.0;
    for pass in 0..repeat {
        let mut host = load_sandbox(allocator, options.clone())?;
        let t = time(&mut host, &calls).with_context(|| format!("timing pass {pass}"))?;
        total_ops += t.ops;
        total_secs += t.elapsed.as_secs_f64();
        println!(
            "pass {pass}: {} ops in {:.3}ms ({:.0} ops/s)",
            t.ops,
            t.elapsed.as_secs_f64() * 1e3,
            t.ops_per_sec()
        );
    }
    if repeat > 1 && total_secs > 0.0 {
        println!("mean: {:.0} ops/s", total_ops as f64 / total_secs);
    }
    Ok(())
}

// ── replay ─────────────────────────────────────────────────────────

pub fn replay_cmd(
    path: &Path,
    capacity: u32,
    width: u32,
    progress: Option<f64>,
    step: bool,
) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let trace = read_trace(BufReader::new(file))
        .with_context(|| format!("reading trace {}", path.display()))?;
    let mut replay = Replay::new(trace, TextGrid::new(capacity, width))
        .context("trace does not fit the requested capacity")?;

    let mut out = io::stdout().lock();
    if step {
        loop {
            frame(&mut out, &replay)?;
            if replay.time() >= replay.total_duration() {
                break;
            }
            replay.next();
        }
    } else {
        replay.set_progress(progress.unwrap_or(1.0))?;
        frame(&mut out, &replay)?;
    }
    Ok(())
}

fn frame(out: &mut impl Write, replay: &Replay<TextGrid>) -> Result<()> {
    let reached = replay.reached();
    let label = match reached.checked_sub(1).and_then(|i| replay.call(i)) {
        Some(call) => call.to_string(),
        None => "start".to_string(),
    };
    writeln!(
        out,
        "── {} / {} ({:.1}%) {label}",
        replay.time(),
        replay.total_duration(),
        replay.progress() * 100.0
    )?;
    write!(out, "{}", replay.view().render())?;
    Ok(())
}
