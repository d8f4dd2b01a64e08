//! Coach configuration structs, loading, and validation.
//!
//! Each struct implements `Default` with values matching the original
//! deployment, ensuring unchanged behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::ZoneKind;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a coaching deployment.
///
/// Load with [`CoachConfig::load`] which searches:
/// 1. `$PACELINE_CONFIG` env var
/// 2. `./coach.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Session gate behavior
    #[serde(default)]
    pub session: SessionConfig,

    /// Transport-side tuning (heartbeat interval, egress queue depth)
    #[serde(default)]
    pub transport: TransportConfig,

    /// Plausibility ranges for raw telemetry channels
    #[serde(default)]
    pub sanity: SanityLimits,

    /// Track geometry tuning
    #[serde(default)]
    pub track: TrackConfig,

    /// Zone profile lookup tuning
    #[serde(default)]
    pub profiles: ProfileConfig,

    /// Deviation scoring
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Hysteresis / debounce / cooldown state machine
    #[serde(default)]
    pub stabilizer: StabilizerConfig,
}

impl CoachConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PACELINE_CONFIG` environment variable
    /// 2. `./coach.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PACELINE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded coach config from PACELINE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PACELINE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PACELINE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("coach.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded coach config from ./coach.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./coach.toml, using defaults");
                }
            }
        }

        info!("No coach.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all thresholds for internal consistency.
    ///
    /// Rules:
    /// - Hysteresis must be a real dead band: `green_enter < red_enter`
    /// - Cooldowns, intervals, and tolerances must be non-negative
    /// - Debounce must require at least one sample / a positive window
    /// - Reduction weights must be positive
    /// - Sanity ranges must have min < max
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let t = &self.stabilizer.thresholds;
        for (section, t) in [
            ("straight", &t.straight),
            ("turn", &t.turn),
            ("stop_approach", &t.stop_approach),
        ] {
            if t.green_enter >= t.red_enter {
                errors.push(format!(
                    "stabilizer.thresholds.{section}: green_enter ({}) must be strictly below red_enter ({})",
                    t.green_enter, t.red_enter
                ));
            }
            if t.green_enter < 0.0 {
                errors.push(format!(
                    "stabilizer.thresholds.{section}: green_enter must be non-negative"
                ));
            }
            if t.cooldown_secs < 0.0 {
                errors.push(format!(
                    "stabilizer.thresholds.{section}: cooldown_secs must be non-negative"
                ));
            }
        }

        if self.stabilizer.debounce_samples == 0 {
            errors.push("stabilizer.debounce_samples must be at least 1".to_string());
        }
        if self.stabilizer.debounce_window_secs <= 0.0 {
            errors.push("stabilizer.debounce_window_secs must be positive".to_string());
        }
        if self.stabilizer.reannounce_secs <= 0.0 {
            errors.push("stabilizer.reannounce_secs must be positive".to_string());
        }

        if self.evaluator.speed_weight <= 0.0 || self.evaluator.power_weight <= 0.0 {
            errors.push("evaluator weights must be positive".to_string());
        }

        let s = &self.sanity;
        for (name, min, max) in [
            ("speed_kmh", s.speed_min_kmh, s.speed_max_kmh),
            ("voltage_v", s.voltage_min_v, s.voltage_max_v),
            ("current_a", s.current_min_a, s.current_max_a),
            ("power_w", s.power_min_w, s.power_max_w),
        ] {
            if min >= max {
                errors.push(format!("sanity.{name}: min ({min}) must be below max ({max})"));
            }
        }

        if self.track.stop_approach_m <= 0.0 {
            errors.push("track.stop_approach_m must be positive".to_string());
        }
        if self.track.max_offtrack_m <= 0.0 {
            errors.push("track.max_offtrack_m must be positive".to_string());
        }

        if !(0.0..=1.0).contains(&self.profiles.confidence_min) {
            errors.push("profiles.confidence_min must be within [0, 1]".to_string());
        }

        if self.transport.status_interval_secs <= 0.0 {
            errors.push("transport.status_interval_secs must be positive".to_string());
        }
        if self.transport.egress_queue == 0 {
            errors.push("transport.egress_queue must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Session gate startup behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether the gate starts open before any control message arrives.
    #[serde(default = "default_true")]
    pub start_open: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { start_open: true }
    }
}

/// Transport-side tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Seconds between heartbeat status reports.
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: f64,

    /// Bounded depth of the outbound cue/status channel.
    #[serde(default = "default_egress_queue")]
    pub egress_queue: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            status_interval_secs: default_status_interval(),
            egress_queue: default_egress_queue(),
        }
    }
}

/// Plausibility ranges for raw telemetry channels.
///
/// Negative floors on current and power allow regenerative braking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanityLimits {
    #[serde(default = "default_speed_min")]
    pub speed_min_kmh: f64,
    #[serde(default = "default_speed_max")]
    pub speed_max_kmh: f64,
    #[serde(default = "default_voltage_min")]
    pub voltage_min_v: f64,
    #[serde(default = "default_voltage_max")]
    pub voltage_max_v: f64,
    #[serde(default = "default_current_min")]
    pub current_min_a: f64,
    #[serde(default = "default_current_max")]
    pub current_max_a: f64,
    #[serde(default = "default_power_min")]
    pub power_min_w: f64,
    #[serde(default = "default_power_max")]
    pub power_max_w: f64,
}

impl Default for SanityLimits {
    fn default() -> Self {
        Self {
            speed_min_kmh: default_speed_min(),
            speed_max_kmh: default_speed_max(),
            voltage_min_v: default_voltage_min(),
            voltage_max_v: default_voltage_max(),
            current_min_a: default_current_min(),
            current_max_a: default_current_max(),
            power_min_w: default_power_min(),
            power_max_w: default_power_max(),
        }
    }
}

/// Track geometry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Length of the coached window before each stop line (meters along track).
    #[serde(default = "default_stop_approach")]
    pub stop_approach_m: f64,

    /// Maximum lateral distance from the centerline before a position is
    /// treated as off-track (no zone assigned).
    #[serde(default = "default_max_offtrack")]
    pub max_offtrack_m: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            stop_approach_m: default_stop_approach(),
            max_offtrack_m: default_max_offtrack(),
        }
    }
}

/// Zone profile lookup tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profiles below this confidence are skipped as if absent.
    #[serde(default = "default_confidence_min")]
    pub confidence_min: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { confidence_min: default_confidence_min() }
    }
}

/// How per-channel deviations reduce to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Largest absolute per-channel deviation wins.
    MaxAbs,
    /// Weighted sum of absolute per-channel deviations.
    WeightedSum,
}

/// Deviation scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_reduction")]
    pub reduction: Reduction,
    #[serde(default = "default_weight")]
    pub speed_weight: f64,
    #[serde(default = "default_weight")]
    pub power_weight: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            reduction: default_reduction(),
            speed_weight: default_weight(),
            power_weight: default_weight(),
        }
    }
}

/// Whether stabilizer state is tracked per zone or as one global context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilizerScope {
    PerZone,
    Global,
}

/// Whether debounce counts samples or elapsed sample time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceMode {
    Samples,
    Window,
}

/// Hysteresis thresholds and cooldown for one zone kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneThresholds {
    /// Deviation magnitude below which a RED context may return to GREEN.
    pub green_enter: f64,
    /// Deviation magnitude above which a GREEN context may go RED.
    /// Must be strictly above `green_enter`.
    pub red_enter: f64,
    /// Minimum seconds between emitted cues for this zone kind.
    pub cooldown_secs: f64,
}

/// Per-kind threshold table.
///
/// Turn zones tolerate larger deviation than straights; stop approaches sit
/// in between but re-cue faster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindThresholds {
    #[serde(default = "default_straight_thresholds")]
    pub straight: ZoneThresholds,
    #[serde(default = "default_turn_thresholds")]
    pub turn: ZoneThresholds,
    #[serde(default = "default_stop_thresholds")]
    pub stop_approach: ZoneThresholds,
}

impl KindThresholds {
    pub fn for_kind(&self, kind: ZoneKind) -> &ZoneThresholds {
        match kind {
            ZoneKind::Straight => &self.straight,
            ZoneKind::Turn => &self.turn,
            ZoneKind::StopApproach => &self.stop_approach,
        }
    }
}

impl Default for KindThresholds {
    fn default() -> Self {
        Self {
            straight: default_straight_thresholds(),
            turn: default_turn_thresholds(),
            stop_approach: default_stop_thresholds(),
        }
    }
}

/// Hysteresis / debounce / cooldown state machine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilizerConfig {
    #[serde(default = "default_scope")]
    pub scope: StabilizerScope,

    #[serde(default = "default_debounce_mode")]
    pub debounce_mode: DebounceMode,

    /// Consecutive agreeing samples required to confirm a transition
    /// (`debounce_mode = "samples"`).
    #[serde(default = "default_debounce_samples")]
    pub debounce_samples: u32,

    /// Elapsed sample time a proposal must persist to confirm
    /// (`debounce_mode = "window"`).
    #[serde(default = "default_debounce_window")]
    pub debounce_window_secs: f64,

    /// Seconds after which a persistently RED context is re-announced.
    #[serde(default = "default_reannounce")]
    pub reannounce_secs: f64,

    #[serde(default)]
    pub thresholds: KindThresholds,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            debounce_mode: default_debounce_mode(),
            debounce_samples: default_debounce_samples(),
            debounce_window_secs: default_debounce_window(),
            reannounce_secs: default_reannounce(),
            thresholds: KindThresholds::default(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors, all fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Defaults (matching the original deployment)
// ============================================================================

fn default_true() -> bool {
    true
}
fn default_status_interval() -> f64 {
    2.0
}
fn default_egress_queue() -> usize {
    64
}
fn default_speed_min() -> f64 {
    0.0
}
fn default_speed_max() -> f64 {
    200.0
}
fn default_voltage_min() -> f64 {
    0.0
}
fn default_voltage_max() -> f64 {
    500.0
}
fn default_current_min() -> f64 {
    -100.0
}
fn default_current_max() -> f64 {
    200.0
}
fn default_power_min() -> f64 {
    -1000.0
}
fn default_power_max() -> f64 {
    5000.0
}
fn default_stop_approach() -> f64 {
    80.0
}
fn default_max_offtrack() -> f64 {
    30.0
}
fn default_confidence_min() -> f64 {
    0.4
}
fn default_reduction() -> Reduction {
    Reduction::MaxAbs
}
fn default_weight() -> f64 {
    1.0
}
fn default_scope() -> StabilizerScope {
    StabilizerScope::PerZone
}
fn default_debounce_mode() -> DebounceMode {
    DebounceMode::Samples
}
fn default_debounce_samples() -> u32 {
    3
}
fn default_debounce_window() -> f64 {
    1.5
}
fn default_reannounce() -> f64 {
    10.0
}
fn default_straight_thresholds() -> ZoneThresholds {
    ZoneThresholds { green_enter: 0.5, red_enter: 1.0, cooldown_secs: 3.0 }
}
fn default_turn_thresholds() -> ZoneThresholds {
    ZoneThresholds { green_enter: 0.75, red_enter: 1.5, cooldown_secs: 4.0 }
}
fn default_stop_thresholds() -> ZoneThresholds {
    ZoneThresholds { green_enter: 0.6, red_enter: 1.0, cooldown_secs: 2.0 }
}

// ============================================================================
// Tests
// ============================================================================
