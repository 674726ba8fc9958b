use std::io::{BufReader, Write};

use anyhow::{Context, Result};
use avitrack::command_channel::{self, Command, CommandError};
use avitrack::config::{self, AppConfig};
use avitrack::emission::{self, ProcessingStats};
use avitrack::frame_source::FrameSource;
use avitrack::pipeline::{self, Detector};
use avitrack::tracker::Tracker;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "avitrack", version, about = "CPU-only real-time detection and tracking for small moving objects against sky backgrounds")]
struct Cli {
    /// Input video file path
    #[arg(short, long)]
    input: Option<String>,

    /// Output path (reserved for future annotated-video export)
    #[arg(short, long)]
    output: Option<String>,

    /// Path to a TOML configuration file (defaults to `avitrack.toml` in
    /// the working directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Run in IPC mode, reading NDJSON commands from stdin
    #[arg(long)]
    ipc: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("avitrack=info,warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    // A bad config file is a fatal startup error (exit 1), not a reason to
    // silently fall back to defaults.
    let config = config::load(cli.config.as_deref())?;

    if cli.ipc {
        run_ipc_mode(&config)
    } else {
        let input = cli
            .input
            .context("--input is required unless --ipc is set")?;
        run_cli_mode(&input, &config)
    }
}

fn build_tracker(config: &AppConfig) -> Tracker {
    Tracker::new(
        config.tracking.max_disappeared,
        config.tracking.max_distance,
        config.temporal_filter.clone().into(),
    )
}

fn run_cli_mode(input: &str, config: &AppConfig) -> Result<()> {
    println!("{}", "=".repeat(60));
    println!("Bird Tracking System - CLI Mode");
    println!("{}", "=".repeat(60));
    println!("Input:  {input}");
    println!("{}", "=".repeat(60));
    println!();

    let mut source = FrameSource::open(input)?;
    let mut detector = Detector::new(&config.detection, &config.spatial_filter)?;
    let mut tracker = build_tracker(config);
    let progress_interval = config.output.progress_interval_frames;

    let results = pipeline::run(&mut source, &mut detector, &mut tracker, || false, |data| {
        emission::maybe_print_progress(data.frame, &data.stats, progress_interval);
    })?;

    emission::print_summary(&results);
    Ok(())
}

fn run_ipc_mode(config: &AppConfig) -> Result<()> {
    let stdout = std::io::stdout();
    let rx = command_channel::spawn(BufReader::new(std::io::stdin()));

    for command in rx.iter() {
        match command {
            Ok(Command::Start { input }) => {
                let mut lock = stdout.lock();
                emission::emit_started(&mut lock)?;
                drop(lock);

                match process_stream(&input, config, &stdout, &rx) {
                    Ok((results, stopped)) => {
                        let mut lock = stdout.lock();
                        emission::emit_completed(&mut lock, &results)?;
                        drop(lock);
                        if stopped {
                            // A stop mid-run ends this IPC session too,
                            // same as a bare stop received between runs.
                            break;
                        }
                    }
                    Err(e) => {
                        let mut lock = stdout.lock();
                        emission::emit_error(&mut lock, &e.to_string())?;
                    }
                }
            }
            Ok(Command::Stop) => {
                let mut lock = stdout.lock();
                emission::emit_stopped(&mut lock)?;
                break;
            }
            Err(e) => {
                let mut lock = stdout.lock();
                emission::emit_error(&mut lock, &e.to_string())?;
            }
        }
    }

    Ok(())
}

/// Runs one video through the pipeline, polling `rx` for a `stop` command
/// at every frame boundary so a run in progress can be cut short instead of
/// running to EOF before the command is even looked at. Returns the final
/// stats plus whether a stop was observed during this run.
fn process_stream(
    input: &str,
    config: &AppConfig,
    stdout: &std::io::Stdout,
    rx: &flume::Receiver<std::result::Result<Command, CommandError>>,
) -> Result<(ProcessingStats, bool)> {
    let mut source = FrameSource::open(input)?;
    let mut detector = Detector::new(&config.detection, &config.spatial_filter)?;
    let mut tracker = build_tracker(config);

    let stopped = std::cell::Cell::new(false);
    let should_stop = || match rx.try_recv() {
        Ok(Ok(Command::Stop)) => {
            stopped.set(true);
            true
        }
        // A Start received mid-run is a protocol violation (only one run
        // is ever active); drop it rather than queueing a second stream.
        _ => false,
    };

    let results = pipeline::run(&mut source, &mut detector, &mut tracker, should_stop, |data| {
        let mut lock = stdout.lock();
        if emission::emit_frame_data(&mut lock, &data).is_err() {
            let _ = lock.flush();
        }
    })?;

    Ok((results, stopped.get()))
}
