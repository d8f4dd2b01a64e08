//! Unified event processing loop shared across all input modes.
//!
//! One task owns the pipeline and consumes the source strictly in arrival
//! order; reordering samples of the same zone context would corrupt the
//! stabilizer's debounce and cooldown semantics. Cancellation is observed
//! only between events, so an in-flight sample always finishes processing.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::acquisition::{SampleSource, SourceEvent};
use crate::egress::EgressHandle;
use crate::types::PipelineStats;

use super::CoachPipeline;

/// Progress log cadence (samples).
const PROGRESS_INTERVAL: u64 = 100;

/// Shared snapshot of the loop's state, read by the heartbeat task.
#[derive(Debug, Clone, Default)]
pub struct CoachState {
    pub gate_open: bool,
    pub stats: PipelineStats,
    pub last_sample_time: Option<f64>,
}

/// Owns all state needed for the unified processing loop.
pub struct ProcessingLoop {
    pipeline: CoachPipeline,
    egress: EgressHandle,
    shared: Arc<RwLock<CoachState>>,
    cancel: CancellationToken,
}

impl ProcessingLoop {
    pub fn new(
        pipeline: CoachPipeline,
        egress: EgressHandle,
        shared: Arc<RwLock<CoachState>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { pipeline, egress, shared, cancel }
    }

    /// Run until the source is exhausted or cancellation fires.
    ///
    /// Returns final pipeline statistics.
    pub async fn run<S: SampleSource + ?Sized>(mut self, source: &mut S) -> PipelineStats {
        info!("Processing telemetry from {}...", source.source_name());

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[ProcessingLoop] shutdown signal received");
                    break;
                }
                result = source.next_event() => match result {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!("[ProcessingLoop] source error: {e:#}");
                        break;
                    }
                },
            };

            match event {
                SourceEvent::Telemetry(mut sample) => {
                    // Stamp receive time when the sender omitted one, so the
                    // stabilizer always has a time base.
                    if sample.timestamp.is_none() {
                        sample.timestamp =
                            Some(chrono::Utc::now().timestamp_millis() as f64 / 1000.0);
                    }

                    if let Some(cue) = self.pipeline.process(&sample) {
                        self.egress.publish_cue(cue);
                    }

                    let stats = self.pipeline.stats();
                    {
                        let mut state = self.shared.write().await;
                        state.stats = stats;
                        state.gate_open = self.pipeline.gate_open();
                        state.last_sample_time = sample.timestamp;
                    }

                    if stats.samples_seen % PROGRESS_INTERVAL == 0 {
                        info!(
                            samples = stats.samples_seen,
                            cues = stats.cues_emitted,
                            rejected = stats.samples_rejected,
                            "progress"
                        );
                    }
                }
                SourceEvent::Control(cmd) => {
                    self.pipeline.handle_control(cmd);
                    let mut state = self.shared.write().await;
                    state.gate_open = self.pipeline.gate_open();
                }
                SourceEvent::Eof => {
                    info!(
                        "[ProcessingLoop] source {} reached end of data",
                        source.source_name()
                    );
                    break;
                }
            }
        }

        let stats = self.pipeline.stats();
        log_final_stats(&stats);
        stats
    }
}

/// Final statistics block, printed once at shutdown.
pub fn log_final_stats(stats: &PipelineStats) {
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("FINAL STATISTICS");
    info!("   Samples Seen:     {}", stats.samples_seen);
    info!("   Gate Drops:       {}", stats.gate_drops);
    info!(
        "   Rejected:         {} (missing: {}, out-of-range: {})",
        stats.samples_rejected, stats.rejected_missing_channel, stats.rejected_out_of_range
    );
    info!("   Zone Misses:      {}", stats.zone_misses);
    info!("   Profile Misses:   {}", stats.profile_misses);
    info!("   Evaluations:      {}", stats.evaluations);
    info!("   Cues Emitted:     {}", stats.cues_emitted);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
