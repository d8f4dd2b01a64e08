//! Cue stabilization: hysteresis, debounce, cooldown, re-announcement.
//!
//! The evaluator's raw green/red stream is too noisy to put in front of a
//! driver. This state machine confirms a transition only after repeated
//! consistent evidence (debounce), requires asymmetric enter thresholds so a
//! single boundary value cannot flap (hysteresis), rate-limits emissions per
//! zone kind (cooldown), and periodically re-announces a persistently red
//! context so the driver is reminded without being spammed every sample.
//!
//! All timing decisions use sample timestamps, never wall clock, so a replay
//! produces exactly the cues the live run would have.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::{DebounceMode, StabilizerConfig, StabilizerScope};
use crate::types::{Cue, CueKind, DrivingState, EvaluationResult, ZoneKind};

/// Key for the global-scope context map.
const GLOBAL_CONTEXT: &str = "GLOBAL";

/// Mutable per-context stabilizer state.
///
/// One entry per zone id (or a single `GLOBAL` entry, depending on the
/// configured scope). Owned exclusively by [`CueStabilizer`]; lives until
/// process exit or a session-gate reopen resets it.
#[derive(Debug, Clone)]
struct ZoneContextState {
    /// Currently confirmed state. Starts optimistic.
    confirmed: DrivingState,
    /// Transition target currently being debounced, if any.
    pending: Option<DrivingState>,
    /// Consecutive samples that agreed with `pending`.
    pending_count: u32,
    /// Timestamp of the first sample in the current pending streak.
    pending_since: f64,
    /// State of the last cue actually emitted for this context.
    last_emitted: Option<DrivingState>,
    /// Timestamp of the last emitted cue.
    last_emitted_at: Option<f64>,
}

impl Default for ZoneContextState {
    fn default() -> Self {
        Self {
            confirmed: DrivingState::Green,
            pending: None,
            pending_count: 0,
            pending_since: 0.0,
            last_emitted: None,
            last_emitted_at: None,
        }
    }
}

/// Debounced, hysteresis-stabilized cue decision state machine.
pub struct CueStabilizer {
    cfg: StabilizerConfig,
    contexts: HashMap<String, ZoneContextState>,
}

impl CueStabilizer {
    pub fn new(cfg: StabilizerConfig) -> Self {
        Self { cfg, contexts: HashMap::new() }
    }

    /// Feed one evaluation; returns a cue when a confirmed, non-suppressed
    /// emission is due.
    ///
    /// A malformed evaluation is a strict no-op: state untouched, no cue.
    pub fn observe(&mut self, eval: &EvaluationResult) -> Option<Cue> {
        if !eval.is_well_formed() {
            warn!(zone = %eval.zone_id, "malformed evaluation ignored");
            return None;
        }

        let thresholds = *self.cfg.thresholds.for_kind(eval.zone_kind);
        let key = match self.cfg.scope {
            StabilizerScope::PerZone => eval.zone_id.as_str(),
            StabilizerScope::Global => GLOBAL_CONTEXT,
        };
        let entry = self.contexts.entry(key.to_string()).or_default();

        // Hysteresis: which transition, if any, does this sample argue for?
        let proposed = match entry.confirmed {
            DrivingState::Green if eval.deviation > thresholds.red_enter => {
                Some(DrivingState::Red)
            }
            DrivingState::Red if eval.deviation < thresholds.green_enter => {
                Some(DrivingState::Green)
            }
            _ => None,
        };

        // Debounce bookkeeping: strict consecutive agreement, any breaking
        // sample resets the streak to zero.
        match proposed {
            Some(target) if entry.pending == Some(target) => {
                entry.pending_count += 1;
            }
            Some(target) => {
                entry.pending = Some(target);
                entry.pending_count = 1;
                entry.pending_since = eval.timestamp;
            }
            None => {
                entry.pending = None;
                entry.pending_count = 0;
            }
        }

        // Confirmation check.
        let mut confirmed_now = None;
        if let Some(target) = entry.pending {
            let done = match self.cfg.debounce_mode {
                DebounceMode::Samples => entry.pending_count >= self.cfg.debounce_samples,
                DebounceMode::Window => {
                    eval.timestamp - entry.pending_since >= self.cfg.debounce_window_secs
                }
            };
            if done {
                entry.confirmed = target;
                entry.pending = None;
                entry.pending_count = 0;
                confirmed_now = Some(target);
                debug!(zone = %eval.zone_id, state = %target, "state transition confirmed");
            }
        }

        // Emission decision. Cooldown overrides everything: a confirmation
        // inside the window is recorded in state but not re-emitted.
        let cooled = entry
            .last_emitted_at
            .map_or(true, |t| eval.timestamp - t >= thresholds.cooldown_secs);

        let mut emit = None;
        if let Some(state) = confirmed_now {
            if entry.last_emitted != Some(state) {
                if cooled {
                    emit = Some(state);
                } else {
                    debug!(zone = %eval.zone_id, state = %state, "cue suppressed by cooldown");
                }
            }
        }

        // Persistently red with nothing in flight: remind the driver once
        // the re-announcement interval has elapsed. This also recovers a red
        // whose original confirmation fell inside the cooldown window.
        if emit.is_none()
            && entry.confirmed == DrivingState::Red
            && entry.pending.is_none()
            && cooled
            && entry
                .last_emitted_at
                .map_or(false, |t| eval.timestamp - t >= self.cfg.reannounce_secs)
        {
            emit = Some(DrivingState::Red);
        }

        let state = emit?;
        entry.last_emitted = Some(state);
        entry.last_emitted_at = Some(eval.timestamp);
        Some(Cue::new(eval, state, cue_kind(state, eval)))
    }

    /// Forget all context state. Called on session-gate reopen so a new
    /// session never resumes with stale hysteresis.
    pub fn reset(&mut self) {
        self.contexts.clear();
    }

    /// Confirmed state for a zone context, if one has been observed.
    pub fn confirmed_state(&self, zone_id: &str) -> Option<DrivingState> {
        let key = match self.cfg.scope {
            StabilizerScope::PerZone => zone_id,
            StabilizerScope::Global => GLOBAL_CONTEXT,
        };
        self.contexts.get(key).map(|c| c.confirmed)
    }
}

/// Pick the driver instruction for a confirmed state.
fn cue_kind(state: DrivingState, eval: &EvaluationResult) -> CueKind {
    if state == DrivingState::Green {
        return CueKind::OnPace;
    }
    if eval.speed_dev.abs() >= eval.power_dev.abs() {
        if eval.speed_dev > 0.0 {
            if eval.zone_kind == ZoneKind::StopApproach {
                CueKind::Brake
            } else {
                CueKind::Coast
            }
        } else {
            CueKind::SpeedUp
        }
    } else if eval.power_dev > 0.0 {
        CueKind::Coast
    } else {
        CueKind::SpeedUp
    }
}
