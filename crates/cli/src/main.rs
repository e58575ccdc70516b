//! Successor-chain prefetcher CLI.
//!
//! This binary replays address traces through a host cache with the
//! prefetch engine attached. It provides:
//! 1. **Run:** Load a trace (and optionally a JSON config), apply command-line
//!    overrides, replay, and print a sectioned report or JSON.
//! 2. **Config:** Print the default configuration as JSON, ready to edit.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use chainpf_core::Simulator;
use chainpf_core::config::{Config, LookaheadMode};
use chainpf_core::stats::STATS_SECTIONS;

#[derive(Parser, Debug)]
#[command(
    name = "chainpf",
    author,
    version,
    about = "Successor-chain (Markov) prefetcher trace simulator",
    long_about = "Replay an address trace through a set-associative cache with the chain prefetcher attached.\n\nExamples:\n  chainpf run --trace list_walk.trace\n  chainpf run --trace list_walk.trace --mode single --degree 10 --threshold 0\n  chainpf config > chainpf.json && chainpf run -t list_walk.trace -c chainpf.json --json"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and report statistics.
    Run {
        /// Address trace, one access per line.
        #[arg(short, long)]
        trace: PathBuf,

        /// JSON configuration file (defaults apply to missing fields).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Lookahead strategy.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Steps each chain may take.
        #[arg(long)]
        degree: Option<u32>,

        /// Chain queue capacity (queued mode).
        #[arg(long)]
        queue_size: Option<usize>,

        /// Carried-confidence threshold.
        #[arg(long)]
        threshold: Option<u32>,

        /// Run the cache without the prefetcher.
        #[arg(long)]
        no_prefetch: bool,

        /// Print statistics as JSON instead of a report.
        #[arg(long)]
        json: bool,

        /// Report sections to print (summary, prefetch, cache).
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,
    },

    /// Print the default configuration as JSON.
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Single,
    Queued,
}

impl From<ModeArg> for LookaheadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => Self::Single,
            ModeArg::Queued => Self::Queued,
        }
    }
}

/// Parameters of the `run` subcommand.
struct RunArgs {
    trace: PathBuf,
    config: Option<PathBuf>,
    mode: Option<ModeArg>,
    degree: Option<u32>,
    queue_size: Option<usize>,
    threshold: Option<u32>,
    no_prefetch: bool,
    json: bool,
    sections: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            trace,
            config,
            mode,
            degree,
            queue_size,
            threshold,
            no_prefetch,
            json,
            sections,
        } => cmd_run(RunArgs {
            trace,
            config,
            mode,
            degree,
            queue_size,
            threshold,
            no_prefetch,
            json,
            sections,
        }),
        Commands::Config => cmd_config(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[!] {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`, else `info` or `debug`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the effective configuration, replays the trace, and prints the results.
fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    if let Some(unknown) = args
        .sections
        .iter()
        .find(|s| !STATS_SECTIONS.contains(&s.as_str()))
    {
        bail!(
            "unknown stats section '{unknown}' (expected one of: {})",
            STATS_SECTIONS.join(", ")
        );
    }

    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(mode) = args.mode {
        config.prefetcher.mode = mode.into();
    }
    if let Some(degree) = args.degree {
        config.prefetcher.degree = degree;
    }
    if let Some(queue_size) = args.queue_size {
        config.prefetcher.queue_size = queue_size;
    }
    if let Some(threshold) = args.threshold {
        config.prefetcher.confidence_threshold = threshold;
    }
    if args.no_prefetch {
        config.cache.prefetch_enabled = false;
    }

    tracing::info!(
        trace = %args.trace.display(),
        mode = ?config.prefetcher.mode,
        degree = config.prefetcher.degree,
        prefetch = config.cache.prefetch_enabled,
        "configuration loaded"
    );

    let stats = Simulator::run_file(&config, &args.trace)
        .with_context(|| format!("simulation of '{}' failed", args.trace.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print_sections(&args.sections);
    }
    Ok(())
}

/// Prints `Config::default()` as pretty JSON.
fn cmd_config() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&Config::default())?);
    Ok(())
}
