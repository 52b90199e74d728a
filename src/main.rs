//! Wearable Collector CLI
//!
//! Replays recorded sensor notifications through the collector and exports
//! the session table.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use wearable_collector::{
    collector::{Collector, CollectorConfig, DecodedPacket, PumpStatus, SensorType},
    config::Config,
    core::decode_packet,
    stats::SessionStats,
    transport::ReplayTransport,
    VERSION,
};

#[derive(Parser)]
#[command(name = "wearable-collector")]
#[command(version = VERSION)]
#[command(about = "Collect ACC/PPG samples from wearable sensor notifications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded notification stream
    Replay {
        /// Recording with one hex-encoded packet per line
        #[arg(long, short)]
        input: PathBuf,

        /// Pause between packets in milliseconds (defaults to config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Export file (defaults to a timestamped file in the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Decode a single hex-encoded packet
    Decode {
        /// Packet bytes as hex
        packet: String,
    },

    /// Show statistics from the last session
    Status,

    /// Show configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            input,
            interval_ms,
            output,
        } => cmd_replay(input, interval_ms, output),
        Commands::Decode { packet } => cmd_decode(&packet),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    }
}

fn cmd_replay(
    input: PathBuf,
    interval_ms: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Wearable Collector v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        Config::default()
    });
    if let Err(e) = config.ensure_directories() {
        tracing::warn!(error = %e, "could not create directories");
    }

    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.replay_interval());
    let transport = ReplayTransport::from_file(&input, interval)
        .with_context(|| format!("loading recording {input:?}"))?;

    let stats = Arc::new(SessionStats::with_persistence(config.stats_path()));
    let mut collector = Collector::new(CollectorConfig::from(&config)).with_stats(stats.clone());
    collector.connect(Box::new(transport))?;

    println!("Replaying {input:?}");
    println!("  Window duration: {}s", config.window_duration.as_secs());
    println!("  Packet interval: {}ms", interval.as_millis());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    let mut last_report = Instant::now();
    while running.load(Ordering::SeqCst) {
        if collector.poll(Duration::from_millis(100)) == PumpStatus::Ended {
            break;
        }
        if last_report.elapsed() >= Duration::from_secs(1) {
            print_windows(&collector);
            last_report = Instant::now();
        }
    }

    println!();
    println!("Stopping collection...");
    collector.stop();
    print_windows(&collector);

    if collector.record_log().is_empty() {
        println!("No samples collected, nothing to export.");
    } else {
        let export_path = output.unwrap_or_else(|| {
            config.export_path.join(format!(
                "session_{}.csv",
                Utc::now().format("%Y%m%d_%H%M%S")
            ))
        });
        collector.export_to(&export_path)?;
        println!("Exported {} rows to {export_path:?}", collector.record_log().len());
    }

    if let Err(e) = stats.save() {
        tracing::warn!(error = %e, "could not save session stats");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn print_windows(collector: &Collector) {
    let line: Vec<String> = SensorType::ALL
        .iter()
        .map(|&sensor| collector.buffer(sensor))
        .map(|buffer| {
            let seconds = buffer.span_ms() / 1000.0;
            format!("{}: {} samples over {seconds:.1}s", buffer.sensor_type(), buffer.len())
        })
        .collect();
    println!("[{}] {}", Utc::now().format("%H:%M:%S"), line.join(" | "));
}

/// JSON shape printed by `decode`.
#[derive(Serialize)]
struct DecodeReport<'a> {
    sensor: &'a str,
    sample_count: usize,
    #[serde(flatten)]
    packet: &'a DecodedPacket,
}

fn cmd_decode(packet: &str) -> anyhow::Result<()> {
    let compact: String = packet.chars().filter(|c| !c.is_whitespace()).collect();
    let data = hex::decode(&compact).context("packet is not valid hex")?;

    let Some(decoded) = decode_packet(&data) else {
        bail!(
            "packet too short: {} bytes, need a 3-byte header and at least one 3-byte sample",
            data.len()
        );
    };

    let sensor = decoded
        .header
        .sensor_type()
        .map(|s| s.label())
        .unwrap_or("unknown");
    let report = DecodeReport {
        sensor,
        sample_count: decoded.sample_count(),
        packet: &decoded,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Wearable Collector Status");
    println!("=========================");
    println!();

    let stats_path = config.stats_path();
    if !stats_path.exists() {
        println!("No previous session data found.");
        return Ok(());
    }

    let persisted = SessionStats::load(&stats_path)
        .with_context(|| format!("reading {stats_path:?}"))?;
    let stats = persisted.stats;

    println!("Last session: {}", stats.session_id);
    println!("  Started: {}", stats.session_start.format("%Y-%m-%d %H:%M:%S"));
    println!("  Saved: {}", persisted.last_updated.format("%Y-%m-%d %H:%M:%S"));
    println!("  Packets received: {}", stats.packets_received);
    println!("  Malformed packets dropped: {}", stats.malformed_packets);
    println!("  Unrecognized packet types: {}", stats.unrecognized_packets);
    println!("  ACC samples: {}", stats.acc_samples);
    println!("  PPG samples: {}", stats.ppg_samples);
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
