//! GHB stride prefetcher trace replay CLI.
//!
//! This binary drives the prefetcher as a cache host would. It performs:
//! 1. **Configuration:** Plain defaults, the feedback-directed preset, or a JSON file.
//! 2. **Replay:** Feeds every access and fill of a text trace to the engine.
//! 3. **Report:** Prints each issued prefetch and a summary of engine counters.

use std::path::{Path, PathBuf};
use std::{fs, io, process};

use clap::{Parser, Subcommand};
use ghbsim_core::PrefetchConfig;
use tracing_subscriber::EnvFilter;

mod trace;

use trace::{Replay, TraceError};

#[derive(Parser, Debug)]
#[command(
    name = "ghbsim",
    author,
    version,
    about = "GHB stride prefetcher trace replay",
    long_about = "Replay a cache access trace through the GHB stride prefetcher.\n\nTrace lines:\n  A <pc> <addr> [hit] [useful]\n  F <addr> <prefetch> [evicted]\n\nExamples:\n  ghbsim run --trace loop.trace\n  ghbsim run --trace loop.trace --feedback\n  ghbsim run --trace loop.trace --config fdp.json\n\nSet RUST_LOG=ghbsim_core=trace to log every prediction."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and print the prefetches it triggers.
    Run {
        /// Trace file to replay.
        #[arg(short, long)]
        trace: PathBuf,

        /// JSON prefetcher configuration (overrides --feedback).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use the feedback-directed preset instead of the plain defaults.
        #[arg(long)]
        feedback: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            trace,
            config,
            feedback,
        } => cmd_run(&trace, config.as_deref(), feedback),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn read(path: &Path) -> Result<String, TraceError> {
    fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(path: Option<&Path>, feedback: bool) -> Result<PrefetchConfig, TraceError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&read(path)?)?),
        None if feedback => Ok(PrefetchConfig::feedback_directed()),
        None => Ok(PrefetchConfig::default()),
    }
}

/// Loads the configuration and trace, replays it, and prints the counters.
fn cmd_run(trace: &Path, config: Option<&Path>, feedback: bool) -> Result<(), TraceError> {
    let config = load_config(config, feedback)?;
    let events = trace::parse(&read(trace)?)?;
    tracing::info!(events = events.len(), trace = %trace.display(), "replaying");

    let mut replay = Replay::new(&config)?;
    let stdout = io::stdout();
    replay.run(&events, &mut stdout.lock())?;

    let engine = replay.engine();
    let stats = engine.stats();
    println!();
    println!("Accesses:        {}", stats.accesses);
    println!(
        "Predictions:     {} ({:.1}%)",
        stats.predictions,
        stats.prediction_rate() * 100.0
    );
    println!("Issued:          {}", stats.issued);
    println!("Index evictions: {}", stats.index_evictions);
    println!("Out of range:    {}", stats.out_of_range);
    if let Some(point) = engine.operating_point() {
        println!("Distance drops:  {}", stats.distance_rejected);
        println!("Intervals:       {}", stats.intervals);
        println!(
            "Final level:     {} (distance {}, degree {})",
            point.level, point.distance, point.degree
        );
    }
    Ok(())
}
