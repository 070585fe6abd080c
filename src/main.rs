//! CLI Entry Point for force_daq
//!
//! Provides a command-line interface for:
//! - Replaying a captured device stream through a full acquisition session
//! - Decoding a single chunk
//! - Printing the effective configuration
//!
//! # Capture files
//!
//! One chunk per line, exactly as the transport delivered it (raw text or lowercase
//! hex). A line may start with `<arrival_ms>\t` to carry its arrival time; lines
//! without it reuse the previous arrival time.
//!
//! Relative `--export` and `--book` paths are placed under `session.output_dir`.
//!
//! # Usage
//!
//! ```bash
//! force_daq replay --device platform-80hz capture.txt --export out/jump.csv --label "cmj 1"
//! force_daq decode --device encoder "3054R-56.7R0.22R"
//! FORCE_DAQ_MOTION__LOAD_KG=40 force_daq config
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use force_daq::config::DaqConfig;
use force_daq::core::{DeviceType, RawFrame};
use force_daq::data::storage::export_session_csv;
use force_daq::logging::{self, OutputFormat, TracingConfig};
use force_daq::router::DeviceRouter;
use force_daq::session::{load_book, save_book, AcquisitionSession, SessionBook};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "force_daq")]
#[command(about = "Decode force dynamometer, force platform and encoder streams", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = force_daq::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "compact")]
    log_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a capture file through an acquisition session
    Replay {
        /// Device that produced the capture
        #[arg(long)]
        device: DeviceType,

        /// Capture file, one chunk per line
        capture: PathBuf,

        /// Write the finished session to this CSV file (relative to `session.output_dir`)
        #[arg(long)]
        export: Option<PathBuf>,

        /// Append the finished session to this JSON session book (relative to
        /// `session.output_dir`)
        #[arg(long)]
        book: Option<PathBuf>,

        /// Label for the finished session
        #[arg(long, default_value = "replay")]
        label: String,

        /// Free-form notes stored in the session metadata
        #[arg(long)]
        notes: Option<String>,
    },

    /// Decode a single chunk and print the samples as JSON
    Decode {
        /// Device that produced the chunk
        #[arg(long)]
        device: DeviceType,

        /// Raw text or lowercase hex
        chunk: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DaqConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    config.validate()?;

    let level = logging::parse_log_level(&config.application.log_level)?;
    logging::init(TracingConfig::new(level).with_format(cli.log_format))?;

    match cli.command {
        Commands::Replay {
            device,
            capture,
            export,
            book,
            label,
            notes,
        } => {
            let export = export.map(|p| config.session.resolve(&p));
            let book = book.map(|p| config.session.resolve(&p));
            let finish = Finish {
                export: export.as_deref(),
                book: book.as_deref(),
                label: &label,
                notes: notes.as_deref(),
            };
            replay(&config, device, &capture, &finish)
        }
        Commands::Decode { device, chunk } => decode(&config, device, &chunk),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Split an optional `<arrival_ms>\t` prefix off a capture line.
fn split_arrival(line: &str) -> (Option<u64>, &str) {
    match line.split_once('\t') {
        Some((prefix, rest)) => match prefix.parse::<u64>() {
            Ok(ms) => (Some(ms), rest),
            Err(_) => (None, line),
        },
        None => (None, line),
    }
}

/// What to do with a replayed session once the capture is exhausted.
struct Finish<'a> {
    export: Option<&'a Path>,
    book: Option<&'a Path>,
    label: &'a str,
    notes: Option<&'a str>,
}

fn replay(config: &DaqConfig, device: DeviceType, capture: &Path, finish: &Finish<'_>) -> Result<()> {
    let content = fs::read_to_string(capture)
        .with_context(|| format!("reading capture {}", capture.display()))?;

    let mut session = AcquisitionSession::start(device, config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut arrival_ms = 0;

    for line in content.lines() {
        let (stamp, chunk) = split_arrival(line.trim_end_matches('\r'));
        arrival_ms = stamp.unwrap_or(arrival_ms);
        if chunk.is_empty() {
            continue;
        }

        let ingested = session.ingest(&RawFrame::text(chunk, arrival_ms))?;
        if let Some(reply) = ingested.reply {
            info!(reply = reply.trim_end(), "device requested identification");
        }
        if !ingested.decoded.is_empty() {
            writeln!(out, "{}", serde_json::to_string(&ingested.decoded)?)?;
        }
    }

    let stats = session.stats();
    info!(
        emitted = stats.emitted,
        malformed = stats.malformed,
        out_of_range = stats.out_of_range,
        "replay complete"
    );

    if finish.export.is_none() && finish.book.is_none() {
        return Ok(());
    }

    if let Some(notes) = finish.notes {
        session.set_notes(notes);
    }
    let finished = session.finish(finish.label)?;
    if finished.is_empty() {
        warn!("finished session holds no samples");
    }

    if let Some(path) = finish.export {
        let rows = export_session_csv(&finished, path)?;
        info!(path = %path.display(), rows, "session exported");
    }

    if let Some(path) = finish.book {
        let mut book = if path.exists() {
            load_book(path).with_context(|| format!("loading session book {}", path.display()))?
        } else {
            SessionBook::new()
        };
        let test = book.push(finished);
        save_book(&book, path)?;
        info!(path = %path.display(), test, "session added to book");
    }

    Ok(())
}

fn decode(config: &DaqConfig, device: DeviceType, chunk: &str) -> Result<()> {
    let mut router = DeviceRouter::new(config)?;
    let decoded = router.route(device, &RawFrame::text(chunk, 0));
    println!("{}", serde_json::to_string_pretty(&decoded)?);

    let stats = router.stats();
    if stats.dropped() > 0 {
        info!(
            malformed = stats.malformed,
            out_of_range = stats.out_of_range,
            "some input was dropped"
        );
    }
    Ok(())
}
