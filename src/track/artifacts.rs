//! Startup loading of externally produced track artifacts.
//!
//! Four files under the artifacts directory, all JSON, all produced by the
//! offline survey/export tooling:
//!
//! - `track.json` — centerline geometry ([`TrackGeometry`])
//! - `turn_zones.json` — turn segments along the progress coordinate
//! - `stop_lines.json` — stop line positions
//! - `zone_memory.json` — per-zone optimal profiles
//!
//! Any missing or unparseable file is a fatal startup error; the per-sample
//! pipeline never deals with artifact problems.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

use crate::config::{ProfileConfig, TrackConfig};

use super::{StopLine, TrackGeometry, TrackMap, TurnSegment, ZoneLocator, ZoneProfile,
    ZoneProfileStore};

/// Artifact loading and validation errors. All fatal at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid track geometry: {0}")]
    Geometry(String),

    #[error("invalid zone profile: {0}")]
    Profile(String),
}

/// The fully loaded static track knowledge.
#[derive(Debug)]
pub struct TrackArtifacts {
    pub track_map: TrackMap,
    pub locator: ZoneLocator,
    pub profiles: ZoneProfileStore,
}

/// Load and validate all artifacts from `dir`.
pub fn load_artifacts(
    dir: &Path,
    track_cfg: &TrackConfig,
    profile_cfg: &ProfileConfig,
) -> Result<TrackArtifacts, ArtifactError> {
    let geometry: TrackGeometry = load_json(&dir.join("track.json"))?;
    let turns: Vec<TurnSegment> = load_json(&dir.join("turn_zones.json"))?;
    let stops: Vec<StopLine> = load_json(&dir.join("stop_lines.json"))?;
    let memory: Vec<ZoneProfile> = load_json(&dir.join("zone_memory.json"))?;

    let track_map = TrackMap::new(geometry)?;
    let locator = ZoneLocator::new(turns, stops, track_map.length_m(), track_cfg);
    let profiles = ZoneProfileStore::new(memory, profile_cfg.confidence_min)?;

    info!(
        dir = %dir.display(),
        track_length_m = track_map.length_m(),
        profiles = profiles.len(),
        "Track artifacts loaded"
    );

    Ok(TrackArtifacts { track_map, locator, profiles })
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ArtifactError::Io { path: path.to_path_buf(), source: e })?;
    serde_json::from_str(&contents)
        .map_err(|e| ArtifactError::Parse { path: path.to_path_buf(), source: e })
}
