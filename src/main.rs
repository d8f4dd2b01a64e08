//! Paceline - real-time driving-line coaching engine.
//!
//! # Usage
//!
//! ```bash
//! # Coach from a live TCP telemetry stream
//! paceline --artifacts artifacts --tcp 10.0.0.5:7878
//!
//! # Coach from a broker bridge on stdin
//! telemetry_bridge | paceline --artifacts artifacts --stdin
//!
//! # Replay a recorded session at 20x
//! paceline --artifacts artifacts --replay session.jsonl --speed 20
//!
//! # Demo lap without a vehicle
//! paceline --artifacts artifacts --simulate
//! ```
//!
//! # Environment Variables
//!
//! - `PACELINE_CONFIG`: path to a coach.toml overriding ./coach.toml
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use paceline::acquisition::{JsonlSource, SampleSource, StdinSource, SyntheticSource, TcpSource};
use paceline::coach::{CoachPipeline, CoachState, ProcessingLoop};
use paceline::config::CoachConfig;
use paceline::egress::{spawn_egress, spawn_heartbeat, JsonLineSink};
use paceline::track::load_artifacts;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "paceline")]
#[command(about = "Real-time driving-line coaching engine")]
#[command(version)]
struct CliArgs {
    /// Directory containing track.json, turn_zones.json, stop_lines.json,
    /// and zone_memory.json
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Path to a coach.toml (overrides PACELINE_CONFIG and ./coach.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read telemetry from stdin (JSON, one object per line)
    #[arg(long)]
    stdin: bool,

    /// Connect to a telemetry TCP server
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Replay a recorded JSONL telemetry log
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Speed multiplier for replay pacing (1 = realtime)
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Generate a synthetic demo lap instead of reading real telemetry
    #[arg(long)]
    simulate: bool,

    /// Sample interval for the synthetic lap (seconds)
    #[arg(long, default_value = "0.2")]
    sim_interval: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => CoachConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let config = CoachConfig::load();
            config.validate().context("built-in configuration invalid")?;
            config
        }
    };

    let artifacts = load_artifacts(&args.artifacts, &config.track, &config.profiles)
        .with_context(|| {
            format!("failed to load track artifacts from {}", args.artifacts.display())
        })?;
    let track_origin = (artifacts.track_map.origin(), artifacts.track_map.length_m());

    let pipeline = CoachPipeline::new(&config, artifacts);

    // Egress: cues and heartbeats to stdout, one JSON object per line.
    let (egress, egress_task) =
        spawn_egress(JsonLineSink::new(tokio::io::stdout()), config.transport.egress_queue);

    let shared = Arc::new(RwLock::new(CoachState {
        gate_open: config.session.start_open,
        ..CoachState::default()
    }));
    let cancel = CancellationToken::new();

    let heartbeat = spawn_heartbeat(
        egress.clone(),
        shared.clone(),
        config.transport.status_interval_secs,
        cancel.clone(),
    );

    // Ctrl-C requests a graceful stop: the in-flight sample finishes and
    // queued cues drain before exit.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                cancel.cancel();
            }
        });
    }

    let mut source = build_source(&args, track_origin).await?;

    info!("Coaching system running, waiting for telemetry...");
    let stats =
        ProcessingLoop::new(pipeline, egress, shared, cancel.clone()).run(source.as_mut()).await;

    // Stop the heartbeat, then let the egress writer drain.
    cancel.cancel();
    if let Err(e) = heartbeat.await {
        warn!(error = %e, "heartbeat task join failed");
    }
    if let Err(e) = egress_task.await {
        warn!(error = %e, "egress task join failed");
    }

    info!(cues = stats.cues_emitted, "Shutdown complete");
    Ok(())
}

/// Pick the sample source from CLI flags. Exactly one mode is used; flags
/// are checked in priority order replay > tcp > stdin > simulate.
async fn build_source(
    args: &CliArgs,
    track_origin: ((f64, f64), f64),
) -> Result<Box<dyn SampleSource>> {
    if let Some(path) = &args.replay {
        return Ok(Box::new(JsonlSource::load(path, args.speed)?));
    }
    if let Some(addr) = &args.tcp {
        return Ok(Box::new(TcpSource::connect(addr).await?));
    }
    if args.stdin {
        return Ok(Box::new(StdinSource::new()));
    }
    if args.simulate {
        let ((lat0, lon0), length_m) = track_origin;
        return Ok(Box::new(SyntheticSource::new(lat0, lon0, length_m, args.sim_interval)));
    }
    anyhow::bail!("no telemetry source selected: use --stdin, --tcp, --replay, or --simulate")
}
