//! RT130 Telemetry CLI Application
//!
//! Operator diagnostics built on the rt130-decoder library:
//! - Decode a single record file
//! - Classify a state-of-health log
//! - Resolve SEED channel identifiers from the unit configuration
//! - Replay a capture through a live unit task and print what it emits

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rt130_decoder::{classify, LineClass, LogTextSummary, RecordKind, SohInfo, StatusRecord};
use std::path::{Path, PathBuf};

mod capture;
mod config;
mod report;

use report::OutputFormat;

/// RT130 Telemetry - Decode and replay Reftek 130 status records
#[derive(Parser, Debug)]
#[command(name = "rt130-cli")]
#[command(about = "Decode and replay RT130 status records", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one record and print its summary
    Decode {
        /// Record kind code (XC, DK, US, AQ, AD, EH, ET, DS, SC, OM)
        #[arg(short, long)]
        kind: RecordKind,

        /// File holding the raw record bytes
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Classify a state-of-health log file
    Soh {
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Resolve the SEED identifier of a stream/channel
    Seedname {
        /// Path to the unit configuration (units.toml)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Unit number in hex (e.g. 9C3E)
        #[arg(short, long)]
        unit: String,

        /// 0-based stream index
        #[arg(short, long)]
        stream: usize,

        /// 0-based channel position within the stream
        #[arg(long)]
        channel: usize,
    },

    /// Replay a capture file through a unit task
    Run {
        /// Path to the unit configuration (units.toml)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Length-framed capture file
        #[arg(long, value_name = "FILE")]
        capture: PathBuf,

        /// Unit number in hex (e.g. 9C3E)
        #[arg(short, long)]
        unit: String,

        /// Print the unit state dump when the replay ends
        #[arg(long)]
        dump: bool,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("RT130 CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using decoder library v{}", rt130_decoder::VERSION);

    match &args.command {
        Command::Decode { kind, file } => decode_mode(*kind, file, args.format),
        Command::Soh { file } => soh_mode(file, args.format),
        Command::Seedname {
            config,
            unit,
            stream,
            channel,
        } => seedname_mode(config, unit, *stream, *channel),
        Command::Run {
            config,
            capture,
            unit,
            dump,
        } => run_mode(config, capture, unit, *dump, args.format),
    }
}

/// Decode one record file and print it
fn decode_mode(kind: RecordKind, file: &Path, format: OutputFormat) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read record file: {:?}", file))?;
    let record = StatusRecord::decode(kind, &bytes)
        .with_context(|| format!("Failed to decode {} record from {:?}", kind, file))?;
    println!("{}", report::render(&record, format)?);
    Ok(())
}

/// Classify every line of a log file
fn soh_mode(file: &Path, format: OutputFormat) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read log file: {:?}", file))?;

    let mut info = SohInfo::default();
    let mut summary = LogTextSummary::default();
    let mut unknown = Vec::new();
    for line in text.lines().map(|l| l.trim_end_matches('\r')) {
        if line.trim().is_empty() {
            continue;
        }
        match classify(line) {
            Ok(LineClass::Benign) => summary.benign += 1,
            Ok(LineClass::Unknown) => {
                summary.unknown += 1;
                unknown.push(line.to_string());
            }
            Ok(class) => {
                info.apply(class);
                summary.recognized += 1;
            }
            Err(e) => {
                log::warn!("Skipping line: {}", e);
                summary.malformed += 1;
            }
        }
    }

    let report = report::SohReport {
        summary,
        info: &info,
        unknown: &unknown,
    };
    println!("{}", report.render(format)?);
    Ok(())
}

/// Resolve one seedname from the configuration
fn seedname_mode(config_path: &Path, unit: &str, stream: usize, channel: usize) -> Result<()> {
    let app = config::load_config(config_path)?;
    let unit = config::parse_unit(unit)?;
    let unit_config = app
        .unit(unit)
        .cloned()
        .with_context(|| format!("Unit {:04X} not found in {:?}", unit, config_path))?;

    let state = rt130_decoder::UnitState::new(unit_config, app.tracker);
    let name = state.seedname(stream, channel);
    if name.resolved {
        println!("{}", name.id);
    } else {
        println!("{} (unresolved)", name.id);
    }
    Ok(())
}

/// Feed a capture to one unit task and print every outbound message
fn run_mode(config_path: &Path, capture_path: &Path, unit: &str, dump: bool, format: OutputFormat) -> Result<()> {
    let app = config::load_config(config_path)?;
    let unit = config::parse_unit(unit)?;
    let unit_config = app
        .unit(unit)
        .cloned()
        .with_context(|| format!("Unit {:04X} not found in {:?}", unit, config_path))?;

    let data = std::fs::read(capture_path).with_context(|| format!("Failed to read capture: {:?}", capture_path))?;
    let frames = capture::read_frames(&data).with_context(|| format!("Invalid capture: {:?}", capture_path))?;
    log::info!("Replaying {} frames to unit {:04X}", frames.len(), unit);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tick = app.tracker.tick();
        let mut registry = rt130_decoder::UnitRegistry::new(app.tracker, tx);
        let handle = registry.get_or_create(unit_config);

        let printer = tokio::spawn(async move {
            let mut printed = 0usize;
            while let Some(message) = rx.recv().await {
                match report::render_outbound(&message, format) {
                    Ok(line) => println!("{}", line),
                    Err(e) => log::error!("Cannot render message: {}", e),
                }
                printed += 1;
            }
            printed
        });

        for frame in frames {
            match frame {
                capture::Frame::Record { kind, bytes } => handle.send_record(kind, bytes).await?,
                capture::Frame::Log(text) => handle.send_log_text(text).await?,
                capture::Frame::Unknown { .. } => {}
            }
        }

        // Give the scheduler two ticks to see the final snapshots
        tokio::time::sleep(tick * 2).await;

        if dump {
            println!("{}", handle.dump().await?);
        }
        for finished in registry.finished() {
            log::error!("Unit {:04X} stopped during replay", finished);
        }
        let result = registry.shutdown().await;
        drop(registry);
        drop(handle);

        let printed = printer.await.context("Output task failed")?;
        log::info!("{} outbound messages", printed);
        result.context("Unit task failed")
    })
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "rt130-cli", "seedname", "--config", "units.toml", "--unit", "9C3E", "--stream", "0",
            "--channel", "1",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Seedname { stream: 0, channel: 1, .. }
        ));

        let args = Args::try_parse_from(["rt130-cli", "decode", "--kind", "xc", "--file", "rec.bin", "--format", "json"])
            .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert!(matches!(args.command, Command::Decode { kind: RecordKind::Clock, .. }));

        assert!(Args::try_parse_from(["rt130-cli", "decode", "--kind", "ZZ", "--file", "x"]).is_err());
    }
}
