//! Session gate: external on/off control over the whole pipeline.
//!
//! The gate is flipped only by control commands arriving through the same
//! ordered event stream as telemetry, so a flip is never observed mid-sample.

use tracing::info;

pub struct SessionGate {
    open: bool,
}

impl SessionGate {
    pub fn new(start_open: bool) -> Self {
        Self { open: start_open }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Apply a gate command. Returns `true` only on a closed-to-open
    /// transition, which obliges the caller to reset stabilizer state.
    pub fn set_open(&mut self, open: bool) -> bool {
        let reopened = open && !self.open;
        if open != self.open {
            info!(open, "session gate changed");
        }
        self.open = open;
        reopened
    }
}
