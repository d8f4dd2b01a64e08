//! Per-zone optimal profiles ("zone memory").
//!
//! A profile stores the recorded optimal band for each coached channel of one
//! zone. Bands come in two shapes: a target with symmetric tolerance, or an
//! explicit min/max range. The store is read-only after startup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ArtifactError;

/// Optimal band for one channel.
///
/// Deviation is normalized so 1.0 always means "one tolerance (or one range
/// width) outside the optimum", which lets hysteresis thresholds apply
/// uniformly across channels and zones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileBand {
    Target { target: f64, tolerance: f64 },
    Range { min: f64, max: f64 },
}

impl ProfileBand {
    /// Signed normalized deviation of `value` from this band.
    ///
    /// Target bands: `(value - target) / tolerance`.
    /// Range bands: 0 inside `[min, max]`, else the signed distance outside
    /// normalized by the range width.
    pub fn deviation(&self, value: f64) -> f64 {
        match *self {
            ProfileBand::Target { target, tolerance } => (value - target) / tolerance,
            ProfileBand::Range { min, max } => {
                let width = max - min;
                if value < min {
                    (value - min) / width
                } else if value > max {
                    (value - max) / width
                } else {
                    0.0
                }
            }
        }
    }

    fn validate(&self, context: &str) -> Result<(), ArtifactError> {
        match *self {
            ProfileBand::Target { tolerance, .. } if tolerance <= 0.0 => {
                Err(ArtifactError::Profile(format!(
                    "{context}: tolerance must be positive, got {tolerance}"
                )))
            }
            ProfileBand::Range { min, max } if min >= max => Err(ArtifactError::Profile(
                format!("{context}: range min ({min}) must be below max ({max})"),
            )),
            _ => Ok(()),
        }
    }
}

/// Recorded optimal ranges for one zone, keyed by zone id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneProfile {
    pub zone_id: String,

    /// Optimal ground speed band in m/s.
    pub speed_mps: ProfileBand,

    /// Optimal power draw band in watts.
    pub power_w: ProfileBand,

    /// Exporter's confidence in this profile, 0..=1.
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// Number of recorded laps/samples behind the profile.
    #[serde(default)]
    pub samples: u64,
}

fn default_confidence() -> f64 {
    1.0
}

/// Read-only lookup of zone profiles, loaded once at startup.
#[derive(Debug)]
pub struct ZoneProfileStore {
    profiles: HashMap<String, ZoneProfile>,
    confidence_min: f64,
}

impl ZoneProfileStore {
    /// Build the store, validating every band.
    ///
    /// Duplicate zone ids and malformed bands are startup errors; an empty
    /// profile set is too, since the pipeline would coach against nothing.
    pub fn new(entries: Vec<ZoneProfile>, confidence_min: f64) -> Result<Self, ArtifactError> {
        if entries.is_empty() {
            return Err(ArtifactError::Profile("zone memory contains no profiles".to_string()));
        }

        let mut profiles = HashMap::with_capacity(entries.len());
        for profile in entries {
            profile.speed_mps.validate(&format!("{} speed_mps", profile.zone_id))?;
            profile.power_w.validate(&format!("{} power_w", profile.zone_id))?;
            if !(0.0..=1.0).contains(&profile.confidence) {
                return Err(ArtifactError::Profile(format!(
                    "{}: confidence {} outside [0, 1]",
                    profile.zone_id, profile.confidence
                )));
            }
            if profiles.insert(profile.zone_id.clone(), profile).is_some() {
                return Err(ArtifactError::Profile("duplicate zone id in zone memory".to_string()));
            }
        }

        info!(zones = profiles.len(), confidence_min, "Zone memory loaded");
        Ok(Self { profiles, confidence_min })
    }

    /// Look up the profile for a zone.
    ///
    /// Returns `None` for unknown zones and for profiles below the confidence
    /// floor; both are expected skip-and-continue outcomes.
    pub fn profile(&self, zone_id: &str) -> Option<&ZoneProfile> {
        let profile = self.profiles.get(zone_id)?;
        if profile.confidence < self.confidence_min {
            debug!(
                zone_id,
                confidence = profile.confidence,
                floor = self.confidence_min,
                "profile below confidence floor, skipping"
            );
            return None;
        }
        Some(profile)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(target: f64, tolerance: f64) -> ProfileBand {
        ProfileBand::Target { target, tolerance }
    }

    fn profile(zone_id: &str, confidence: f64) -> ZoneProfile {
        ZoneProfile {
            zone_id: zone_id.to_string(),
            speed_mps: target(15.0, 2.0),
            power_w: target(100.0, 30.0),
            confidence,
            samples: 100,
        }
    }

    #[test]
    fn target_band_deviation_is_signed_and_normalized() {
        let band = target(15.0, 2.0);
        assert_eq!(band.deviation(15.0), 0.0);
        assert_eq!(band.deviation(17.0), 1.0);
        assert_eq!(band.deviation(20.0), 2.5);
        assert_eq!(band.deviation(11.0), -2.0);
    }

    #[test]
    fn range_band_deviation_zero_inside() {
        let band = ProfileBand::Range { min: 10.0, max: 20.0 };
        assert_eq!(band.deviation(10.0), 0.0);
        assert_eq!(band.deviation(15.0), 0.0);
        assert_eq!(band.deviation(20.0), 0.0);
        assert_eq!(band.deviation(25.0), 0.5);
        assert_eq!(band.deviation(5.0), -0.5);
    }

    #[test]
    fn band_json_shapes_roundtrip() {
        let t: ProfileBand = serde_json::from_str(r#"{"target": 15.0, "tolerance": 2.0}"#).unwrap();
        assert_eq!(t, target(15.0, 2.0));
        let r: ProfileBand = serde_json::from_str(r#"{"min": 10.0, "max": 20.0}"#).unwrap();
        assert_eq!(r, ProfileBand::Range { min: 10.0, max: 20.0 });
    }

    #[test]
    fn store_rejects_bad_bands() {
        let mut p = profile("TURN_1", 1.0);
        p.speed_mps = target(15.0, 0.0);
        assert!(ZoneProfileStore::new(vec![p], 0.4).is_err());

        let mut p = profile("TURN_1", 1.0);
        p.power_w = ProfileBand::Range { min: 50.0, max: 50.0 };
        assert!(ZoneProfileStore::new(vec![p], 0.4).is_err());
    }

    #[test]
    fn store_rejects_duplicates_and_empty() {
        assert!(ZoneProfileStore::new(vec![], 0.4).is_err());
        let err =
            ZoneProfileStore::new(vec![profile("TURN_1", 1.0), profile("TURN_1", 0.9)], 0.4);
        assert!(err.is_err());
    }

    #[test]
    fn low_confidence_profiles_are_invisible() {
        let store = ZoneProfileStore::new(
            vec![profile("TURN_1", 0.9), profile("TURN_2", 0.2)],
            0.4,
        )
        .unwrap();
        assert!(store.profile("TURN_1").is_some());
        assert!(store.profile("TURN_2").is_none());
        assert!(store.profile("TURN_3").is_none());
        assert_eq!(store.len(), 2);
    }
}
