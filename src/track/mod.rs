//! Static track knowledge: centerline geometry, zone boundaries, and
//! per-zone optimal profiles.
//!
//! Everything in this module is loaded once at startup from externally
//! produced artifacts and never mutated afterwards. Missing or unparseable
//! artifacts halt startup; running against an empty lookup would silently
//! coach against nothing.

mod artifacts;
mod geometry;
mod profiles;
mod zones;

pub use artifacts::{load_artifacts, ArtifactError, TrackArtifacts};
pub use geometry::{TrackGeometry, TrackMap, TrackPosition};
pub use profiles::{ProfileBand, ZoneProfile, ZoneProfileStore};
pub use zones::{StopLine, TurnSegment, ZoneLocator};
