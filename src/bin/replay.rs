//! Offline replay tool: run a recorded telemetry log through the coaching
//! pipeline and print every cue.
//!
//! The pipeline is synchronous, so replay needs no runtime: events are fed
//! in log order with optional wall-clock pacing. Timing-sensitive behavior
//! (debounce windows, cooldowns, re-announcements) depends only on recorded
//! timestamps, so a full-speed replay produces exactly the cues the live
//! session would have.
//!
//! ```bash
//! replay --log session.jsonl --artifacts artifacts --speedup 20
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use paceline::acquisition::{parse_event, SourceEvent};
use paceline::coach::{processing_loop::log_final_stats, CoachPipeline};
use paceline::config::CoachConfig;
use paceline::track::load_artifacts;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a recorded telemetry log through the coaching pipeline")]
struct CliArgs {
    /// JSONL telemetry log to replay
    #[arg(long, value_name = "FILE")]
    log: PathBuf,

    /// Directory containing track artifacts
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Replay speed multiplier; 0 disables pacing entirely
    #[arg(long, default_value = "0.0")]
    speedup: f64,

    /// Stop after this many events
    #[arg(long)]
    max_events: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let config = CoachConfig::load();
    config.validate().context("configuration invalid")?;
    let artifacts = load_artifacts(&args.artifacts, &config.track, &config.profiles)
        .with_context(|| {
            format!("failed to load track artifacts from {}", args.artifacts.display())
        })?;
    let mut pipeline = CoachPipeline::new(&config, artifacts);

    let contents = std::fs::read_to_string(&args.log)
        .with_context(|| format!("failed to read telemetry log {}", args.log.display()))?;

    let mut events = 0usize;
    let mut cues = 0usize;
    let mut last_ts: Option<f64> = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(event) = parse_event(line) else {
            continue;
        };
        if let Some(max) = args.max_events {
            if events >= max {
                break;
            }
        }
        events += 1;

        match event {
            SourceEvent::Telemetry(sample) => {
                if args.speedup > 0.0 {
                    if let (Some(ts), Some(last)) = (sample.timestamp, last_ts) {
                        let gap = ((ts - last) / args.speedup).clamp(0.0, 5.0);
                        if gap > 0.0 {
                            std::thread::sleep(std::time::Duration::from_secs_f64(gap));
                        }
                    }
                    last_ts = sample.timestamp.or(last_ts);
                }
                if let Some(cue) = pipeline.process(&sample) {
                    cues += 1;
                    println!(
                        "[CUE] {} | zone={} state={} deviation={:.2}",
                        cue.text, cue.zone_id, cue.state, cue.deviation
                    );
                }
            }
            SourceEvent::Control(cmd) => pipeline.handle_control(cmd),
            SourceEvent::Eof => break,
        }

        if events % 200 == 0 {
            info!(events, cues, "replay progress");
        }
    }

    log_final_stats(&pipeline.stats());
    info!(events, cues, "Replay done");
    Ok(())
}
