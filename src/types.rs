//! Core data types shared across the coaching pipeline.
//!
//! Everything here is a plain value type: samples flowing in from the
//! transport, zone classifications, evaluation results flowing between the
//! pipeline stages, and cues flowing back out. Mutable pipeline state lives
//! with the components that own it, not here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Inbound telemetry
// ============================================================================

/// One raw vehicle reading as received from the transport.
///
/// Every channel except the timestamp may be absent or implausible; the
/// sanity filter decides what survives. Accepts both `timestamp` and the
/// short `ts` key used by older onboard firmware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Unix epoch seconds. Stamped by the ingest loop when the sender
    /// omitted it.
    #[serde(default, alias = "ts")]
    pub timestamp: Option<f64>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    /// Ground speed in km/h (GPS-derived on the vehicle).
    #[serde(default)]
    pub speed: Option<f64>,

    /// Pack voltage in volts.
    #[serde(default)]
    pub voltage: Option<f64>,

    /// Pack current in amperes. Negative while regenerating.
    #[serde(default)]
    pub current: Option<f64>,

    /// Electrical power draw in watts.
    #[serde(default)]
    pub power: Option<f64>,
}

/// A telemetry sample with every downstream channel present and plausible.
///
/// Produced only by the sanity filter; there is no other constructor path in
/// release code, so the rest of the pipeline can rely on the fields without
/// re-checking ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedSample {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Ground speed converted to m/s.
    pub speed_mps: f64,
    /// Power draw in watts, measured or derived from voltage and current.
    pub power_w: f64,
    /// Voltage that survived filtering, kept for observability.
    pub voltage_v: Option<f64>,
    /// Current that survived filtering, kept for observability.
    pub current_a: Option<f64>,
}

/// Why a raw sample was dropped before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize)]
pub enum RejectReason {
    #[error("missing channel: {channel}")]
    MissingChannel { channel: &'static str },

    #[error("channel {channel} out of range: {value}")]
    OutOfRange { channel: &'static str, value: f64 },
}

// ============================================================================
// Zones
// ============================================================================

/// Static track segment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneKind {
    Straight,
    Turn,
    StopApproach,
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneKind::Straight => write!(f, "STRAIGHT"),
            ZoneKind::Turn => write!(f, "TURN"),
            ZoneKind::StopApproach => write!(f, "STOP_APPROACH"),
        }
    }
}

/// Outcome of locating a position on the track: which zone, and what kind.
///
/// Zone ids follow the exporter's naming: `STRAIGHT`, `TURN_<n>`,
/// `STOP_<n>_APPROACH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAssignment {
    pub id: String,
    pub kind: ZoneKind,
}

impl ZoneAssignment {
    pub fn new(id: impl Into<String>, kind: ZoneKind) -> Self {
        Self { id: id.into(), kind }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Raw per-sample verdict before stabilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrivingState {
    Green,
    Red,
}

impl std::fmt::Display for DrivingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrivingState::Green => write!(f, "green"),
            DrivingState::Red => write!(f, "red"),
        }
    }
}

/// Result of comparing one sanitized sample against its zone profile.
///
/// Ephemeral: produced per sample, consumed by the stabilizer, then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub zone_id: String,
    pub zone_kind: ZoneKind,
    /// Raw green/red verdict from the evaluator (pre-hysteresis).
    pub state: DrivingState,
    /// Aggregated deviation magnitude (unitless, normalized per channel).
    pub deviation: f64,
    /// Signed normalized speed deviation. Positive means too fast.
    pub speed_dev: f64,
    /// Signed normalized power deviation. Positive means drawing too much.
    pub power_dev: f64,
    pub timestamp: f64,
}

impl EvaluationResult {
    /// A malformed evaluation must never corrupt stabilizer state, so the
    /// stabilizer checks this before touching anything.
    pub fn is_well_formed(&self) -> bool {
        self.deviation.is_finite()
            && self.speed_dev.is_finite()
            && self.power_dev.is_finite()
            && self.timestamp.is_finite()
            && !self.zone_id.is_empty()
    }
}

// ============================================================================
// Cues
// ============================================================================

/// What the driver should do about a confirmed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CueKind {
    SpeedUp,
    Coast,
    Brake,
    OnPace,
}

impl CueKind {
    /// Short driver-facing instruction for this cue.
    pub fn instruction(self) -> &'static str {
        match self {
            CueKind::SpeedUp => "Below pace, speed up",
            CueKind::Coast => "Too fast, coast and reduce throttle",
            CueKind::Brake => "Stop ahead, brake and keep power low",
            CueKind::OnPace => "Back on pace",
        }
    }
}

impl std::fmt::Display for CueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CueKind::SpeedUp => write!(f, "SPEED_UP"),
            CueKind::Coast => write!(f, "COAST"),
            CueKind::Brake => write!(f, "BRAKE"),
            CueKind::OnPace => write!(f, "ON_PACE"),
        }
    }
}

/// A confirmed, non-suppressed coaching cue headed for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub timestamp: f64,
    pub zone_id: String,
    pub zone_kind: ZoneKind,
    pub state: DrivingState,
    pub kind: CueKind,
    pub text: String,
    /// Deviation magnitude at the confirming sample.
    pub deviation: f64,
}

impl Cue {
    pub fn new(eval: &EvaluationResult, state: DrivingState, kind: CueKind) -> Self {
        Self {
            timestamp: eval.timestamp,
            zone_id: eval.zone_id.clone(),
            zone_kind: eval.zone_kind,
            state,
            kind,
            text: format!("{}: {}", eval.zone_id, kind.instruction()),
            deviation: eval.deviation,
        }
    }
}

// ============================================================================
// Control & status
// ============================================================================

/// Commands consumed from the control channel of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Open (`true`) or close (`false`) the session gate.
    SetSession(bool),
}

/// Periodic liveness report published alongside cues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub timestamp: f64,
    pub status: String,
    pub gate_open: bool,
    pub stats: PipelineStats,
}

/// Observability counters maintained by the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Samples received from the source, gated or not.
    pub samples_seen: u64,
    /// Samples skipped because the session gate was closed.
    pub gate_drops: u64,
    /// Samples rejected by the sanity filter.
    pub samples_rejected: u64,
    pub rejected_missing_channel: u64,
    pub rejected_out_of_range: u64,
    /// Samples with no zone (off-track or before the first lap marker).
    pub zone_misses: u64,
    /// Samples in a zone with no usable profile.
    pub profile_misses: u64,
    /// Samples that reached the evaluator.
    pub evaluations: u64,
    pub cues_emitted: u64,
}

impl PipelineStats {
    pub fn record_rejection(&mut self, reason: &RejectReason) {
        self.samples_rejected += 1;
        match reason {
            RejectReason::MissingChannel { .. } => self.rejected_missing_channel += 1,
            RejectReason::OutOfRange { .. } => self.rejected_out_of_range += 1,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
