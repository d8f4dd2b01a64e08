//! Synthetic lap generator for demo runs without a vehicle.
//!
//! Drives a virtual car along the track origin's heading at a wavering
//! speed, emitting samples at a fixed rate with measurement noise. A small
//! fraction of samples drop the power channel so the sanity filter's
//! fallback derivation is exercised end to end.

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::TelemetrySample;

use super::{SampleSource, SourceEvent};

/// Mean Earth radius in meters, matching the track projection.
const R_EARTH: f64 = 6_371_000.0;

pub struct SyntheticSource {
    lat0: f64,
    lon0: f64,
    track_length_m: f64,
    interval_secs: f64,
    x_m: f64,
    rng: StdRng,
}

impl SyntheticSource {
    /// Build a generator around the loaded track's origin.
    pub fn new(lat0: f64, lon0: f64, track_length_m: f64, interval_secs: f64) -> Self {
        Self {
            lat0,
            lon0,
            track_length_m,
            interval_secs,
            x_m: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    fn make_sample(&mut self) -> TelemetrySample {
        // Wavering pace: slow-fast oscillation over the lap plus jitter.
        let phase = (self.x_m / self.track_length_m) * std::f64::consts::TAU;
        let speed_mps = 9.0 + 3.0 * phase.sin() + self.rng.gen_range(-0.5..0.5);
        let speed_mps = speed_mps.max(0.5);

        self.x_m = (self.x_m + speed_mps * self.interval_secs) % self.track_length_m;

        let voltage = 48.0 + self.rng.gen_range(-0.8..0.8);
        let current = 2.0 + 1.5 * phase.sin().max(0.0) + self.rng.gen_range(-0.3..0.3);

        // Every so often the power channel goes missing, like the real bus.
        let power = if self.rng.gen_bool(0.1) { None } else { Some(voltage * current) };

        let lon = self.lon0 + (self.x_m / (R_EARTH * self.lat0.to_radians().cos())).to_degrees();

        TelemetrySample {
            timestamp: Some(chrono::Utc::now().timestamp_millis() as f64 / 1000.0),
            latitude: Some(self.lat0),
            longitude: Some(lon),
            speed: Some(speed_mps * 3.6),
            voltage: Some(voltage),
            current: Some(current),
            power,
        }
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        tokio::time::sleep(tokio::time::Duration::from_secs_f64(self.interval_secs)).await;
        Ok(SourceEvent::Telemetry(self.make_sample()))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}
