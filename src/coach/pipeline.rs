//! The orchestrator: wires filter, locator, profiles, evaluator, and
//! stabilizer together per incoming sample.
//!
//! `process` is a pure function of (sample, static track knowledge, mutable
//! stabilizer state) plus the gate; every early exit is counted so operators
//! can see where samples go.

use tracing::{debug, info};

use crate::config::CoachConfig;
use crate::track::TrackArtifacts;
use crate::types::{ControlCommand, Cue, PipelineStats, StatusReport, TelemetrySample};

use super::{CueStabilizer, SanityFilter, SessionGate, StateEvaluator};

pub struct CoachPipeline {
    filter: SanityFilter,
    artifacts: TrackArtifacts,
    evaluator: StateEvaluator,
    stabilizer: CueStabilizer,
    gate: SessionGate,
    stats: PipelineStats,
}

impl CoachPipeline {
    pub fn new(config: &CoachConfig, artifacts: TrackArtifacts) -> Self {
        info!(
            scope = ?config.stabilizer.scope,
            debounce = ?config.stabilizer.debounce_mode,
            profiles = artifacts.profiles.len(),
            "Initializing coaching pipeline"
        );
        Self {
            filter: SanityFilter::new(config.sanity.clone()),
            artifacts,
            evaluator: StateEvaluator::new(
                config.evaluator.clone(),
                config.stabilizer.thresholds.clone(),
            ),
            stabilizer: CueStabilizer::new(config.stabilizer.clone()),
            gate: SessionGate::new(config.session.start_open),
            stats: PipelineStats::default(),
        }
    }

    /// Run one raw sample through the full sequence, yielding at most one cue.
    pub fn process(&mut self, raw: &TelemetrySample) -> Option<Cue> {
        self.stats.samples_seen += 1;

        if !self.gate.is_open() {
            self.stats.gate_drops += 1;
            return None;
        }

        let sample = match self.filter.sanitize(raw) {
            Ok(sample) => sample,
            Err(reason) => {
                self.stats.record_rejection(&reason);
                debug!(%reason, "sample rejected by sanity filter");
                return None;
            }
        };

        let pos = self.artifacts.track_map.project(sample.latitude, sample.longitude);

        let Some(zone) = self.artifacts.locator.locate(pos.s_m, pos.d_m) else {
            self.stats.zone_misses += 1;
            return None;
        };

        let Some(profile) = self.artifacts.profiles.profile(&zone.id) else {
            self.stats.profile_misses += 1;
            debug!(zone = %zone.id, "no usable profile for zone");
            return None;
        };

        self.stats.evaluations += 1;
        let eval = self.evaluator.evaluate(&sample, &zone, profile);

        let cue = self.stabilizer.observe(&eval);
        if let Some(ref c) = cue {
            self.stats.cues_emitted += 1;
            info!(
                zone = %c.zone_id,
                kind = %c.kind,
                state = %c.state,
                deviation = c.deviation,
                "cue emitted"
            );
        }
        cue
    }

    /// Apply a control command from the transport.
    pub fn handle_control(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::SetSession(open) => {
                let reopened = self.gate.set_open(open);
                if reopened {
                    self.stabilizer.reset();
                    info!("stabilizer state reset after session reopen");
                }
            }
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn gate_open(&self) -> bool {
        self.gate.is_open()
    }

    pub fn status_report(&self, timestamp: f64, status: &str) -> StatusReport {
        StatusReport {
            timestamp,
            status: status.to_string(),
            gate_open: self.gate.is_open(),
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoachConfig;
    use crate::track::{ProfileBand, TrackGeometry, TrackMap, ZoneLocator, ZoneProfile,
        ZoneProfileStore};
    use crate::types::DrivingState;

    /// 1 km straight eastbound test track, one stop line at s = 600 m with
    /// an 80 m approach window, profiles for STRAIGHT and the stop approach.
    fn artifacts(config: &CoachConfig) -> TrackArtifacts {
        let track_map = TrackMap::new(TrackGeometry {
            lat0: 40.0,
            lon0: -77.0,
            x: vec![0.0, 500.0, 1000.0],
            y: vec![0.0, 0.0, 0.0],
            s: vec![0.0, 500.0, 1000.0],
            length_m: 1000.0,
        })
        .unwrap();
        let locator = ZoneLocator::new(
            vec![],
            vec![crate::track::StopLine { stop_line: 1, s_stop_m: 600.0 }],
            1000.0,
            &config.track,
        );
        let profiles = ZoneProfileStore::new(
            vec![
                ZoneProfile {
                    zone_id: "STRAIGHT".to_string(),
                    speed_mps: ProfileBand::Target { target: 10.0, tolerance: 2.0 },
                    power_w: ProfileBand::Target { target: 100.0, tolerance: 100.0 },
                    confidence: 1.0,
                    samples: 100,
                },
                ZoneProfile {
                    zone_id: "STOP_1_APPROACH".to_string(),
                    speed_mps: ProfileBand::Target { target: 5.0, tolerance: 1.0 },
                    power_w: ProfileBand::Target { target: 50.0, tolerance: 100.0 },
                    confidence: 1.0,
                    samples: 100,
                },
            ],
            config.profiles.confidence_min,
        )
        .unwrap();
        TrackArtifacts { track_map, locator, profiles }
    }

    /// Sample at a given track x (meters east of origin) and speed.
    fn sample_at(ts: f64, x_m: f64, speed_kmh: f64) -> TelemetrySample {
        // Invert the equirectangular projection for longitude.
        let lon = -77.0 + (x_m / (6_371_000.0 * 40.0_f64.to_radians().cos())).to_degrees();
        TelemetrySample {
            timestamp: Some(ts),
            latitude: Some(40.0),
            longitude: Some(lon),
            speed: Some(speed_kmh),
            voltage: Some(48.0),
            current: Some(2.0),
            power: Some(100.0),
        }
    }

    fn pipeline_with(debounce_samples: u32) -> CoachPipeline {
        let mut config = CoachConfig::default();
        config.stabilizer.debounce_samples = debounce_samples;
        let artifacts = artifacts(&config);
        CoachPipeline::new(&config, artifacts)
    }

    #[test]
    fn on_pace_sample_emits_nothing() {
        let mut p = pipeline_with(1);
        assert!(p.process(&sample_at(0.0, 100.0, 36.0)).is_none()); // 10 m/s on target
        let stats = p.stats();
        assert_eq!(stats.samples_seen, 1);
        assert_eq!(stats.evaluations, 1);
        assert_eq!(stats.cues_emitted, 0);
    }

    #[test]
    fn rejected_sample_is_counted_not_propagated() {
        let mut p = pipeline_with(1);
        let mut raw = sample_at(0.0, 100.0, 36.0);
        raw.speed = None;
        assert!(p.process(&raw).is_none());
        let stats = p.stats();
        assert_eq!(stats.samples_rejected, 1);
        assert_eq!(stats.rejected_missing_channel, 1);
        assert_eq!(stats.evaluations, 0);
    }

    #[test]
    fn overspeed_on_straight_cues_coast_after_debounce() {
        let mut p = pipeline_with(2);
        // 20 m/s against a 10 +/- 2 target: deviation 5.0
        assert!(p.process(&sample_at(0.0, 100.0, 72.0)).is_none());
        let cue = p.process(&sample_at(1.0, 110.0, 72.0)).unwrap();
        assert_eq!(cue.state, DrivingState::Red);
        assert_eq!(cue.zone_id, "STRAIGHT");
        assert_eq!(p.stats().cues_emitted, 1);
    }

    #[test]
    fn closed_gate_drops_without_touching_state() {
        let mut p = pipeline_with(1);
        p.handle_control(ControlCommand::SetSession(false));

        assert!(p.process(&sample_at(0.0, 100.0, 72.0)).is_none());
        assert!(p.process(&sample_at(1.0, 100.0, 72.0)).is_none());
        let stats = p.stats();
        assert_eq!(stats.gate_drops, 2);
        assert_eq!(stats.evaluations, 0);
    }

    #[test]
    fn reopen_resets_hysteresis() {
        let mut p = pipeline_with(1);
        // Drive STRAIGHT red.
        assert!(p.process(&sample_at(0.0, 100.0, 72.0)).is_some());

        p.handle_control(ControlCommand::SetSession(false));
        p.handle_control(ControlCommand::SetSession(true));

        // First post-reopen sample sees a fresh green context: an on-pace
        // sample emits nothing, with no memory of the pre-close red.
        assert!(p.process(&sample_at(100.0, 100.0, 36.0)).is_none());
        // And a red sample re-debounces from scratch (debounce 1 re-emits).
        assert!(p.process(&sample_at(101.0, 100.0, 72.0)).is_some());
    }

    #[test]
    fn status_report_carries_counters() {
        let mut p = pipeline_with(1);
        let _ = p.process(&sample_at(0.0, 100.0, 36.0));
        let report = p.status_report(5.0, "alive");
        assert!(report.gate_open);
        assert_eq!(report.stats.samples_seen, 1);
        assert_eq!(report.status, "alive");
    }
}
