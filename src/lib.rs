//! Paceline: real-time driving-line coaching.
//!
//! Ingests live vehicle telemetry, compares each reading against the
//! recorded optimal profile for the current track zone, and emits debounced,
//! hysteresis-stabilized coaching cues so the driver can match the optimal
//! line without being spammed.
//!
//! ## Architecture
//!
//! - **Acquisition**: transport-agnostic sample sources (JSONL, stdin, TCP,
//!   synthetic)
//! - **Track**: static geometry, zone boundaries, and zone profiles loaded
//!   once at startup
//! - **Coach**: the per-sample evaluation pipeline and its stabilizer state
//!   machine
//! - **Egress**: best-effort cue and heartbeat publication

pub mod acquisition;
pub mod coach;
pub mod config;
pub mod egress;
pub mod track;
pub mod types;

// Re-export the coach configuration
pub use config::CoachConfig;

// Re-export commonly used types
pub use types::{
    ControlCommand, Cue, CueKind, DrivingState, EvaluationResult, PipelineStats, RejectReason,
    SanitizedSample, StatusReport, TelemetrySample, ZoneAssignment, ZoneKind,
};

// Re-export the pipeline components
pub use coach::{CoachPipeline, CueStabilizer, ProcessingLoop, SanityFilter, SessionGate,
    StateEvaluator};

// Re-export track knowledge
pub use track::{load_artifacts, ArtifactError, TrackArtifacts};
