//! Plausibility filtering and fallback derivation for raw telemetry.
//!
//! Channels fall into two classes. Required channels (position, speed) have
//! no redundancy: missing or implausible values reject the whole sample.
//! Redundant channels (voltage, current, power) degrade gracefully: an
//! implausible reading is demoted to absent, and power is re-derived from
//! voltage and current when the measured value did not survive.
//!
//! Filtering is pure given the sample and the configured limits; a sample is
//! either fully sanitized or rejected, never partially repaired.

use crate::config::SanityLimits;
use crate::types::{RejectReason, SanitizedSample, TelemetrySample};

const KMH_TO_MPS: f64 = 1.0 / 3.6;

pub struct SanityFilter {
    limits: SanityLimits,
}

impl SanityFilter {
    pub fn new(limits: SanityLimits) -> Self {
        Self { limits }
    }

    /// Validate and repair one raw sample.
    pub fn sanitize(&self, raw: &TelemetrySample) -> Result<SanitizedSample, RejectReason> {
        let timestamp = require_finite("timestamp", raw.timestamp)?;
        let latitude = require_finite("latitude", raw.latitude)?;
        let longitude = require_finite("longitude", raw.longitude)?;

        // Speed has no fallback: out of range rejects the sample.
        let speed_kmh = require_finite("speed", raw.speed)?;
        if speed_kmh < self.limits.speed_min_kmh || speed_kmh > self.limits.speed_max_kmh {
            return Err(RejectReason::OutOfRange { channel: "speed", value: speed_kmh });
        }

        // Voltage and current are fallback inputs only: implausible readings
        // are demoted to absent rather than rejecting.
        let voltage_v = raw
            .voltage
            .filter(|v| v.is_finite())
            .filter(|v| (self.limits.voltage_min_v..=self.limits.voltage_max_v).contains(v));
        let current_a = raw
            .current
            .filter(|i| i.is_finite())
            .filter(|i| (self.limits.current_min_a..=self.limits.current_max_a).contains(i));

        // Power: prefer the measured channel, fall back to V * |I|.
        // Absolute current because regen current is negative while the
        // magnitude of electrical power is what the profiles record.
        let measured = raw
            .power
            .filter(|p| p.is_finite())
            .filter(|p| (self.limits.power_min_w..=self.limits.power_max_w).contains(p));
        let power_w = match measured {
            Some(p) => p,
            None => match (voltage_v, current_a) {
                (Some(v), Some(i)) => v * i.abs(),
                _ => return Err(RejectReason::MissingChannel { channel: "power" }),
            },
        };
        if power_w < self.limits.power_min_w || power_w > self.limits.power_max_w {
            return Err(RejectReason::OutOfRange { channel: "power", value: power_w });
        }

        Ok(SanitizedSample {
            timestamp,
            latitude,
            longitude,
            speed_mps: speed_kmh * KMH_TO_MPS,
            power_w,
            voltage_v,
            current_a,
        })
    }
}

fn require_finite(channel: &'static str, value: Option<f64>) -> Result<f64, RejectReason> {
    let v = value.ok_or(RejectReason::MissingChannel { channel })?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RejectReason::OutOfRange { channel, value: v })
    }
}
