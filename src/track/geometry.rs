//! Track centerline geometry and GPS projection.
//!
//! The track is a polyline in a local planar frame with a precomputed arc
//! length at every vertex. A GPS fix is first converted to that frame with an
//! equirectangular approximation around the surveyed origin, then projected
//! onto the nearest polyline segment to obtain the progress coordinate `s`
//! (meters along track) and the signed lateral offset `d` (meters, left of
//! travel positive).

use serde::{Deserialize, Serialize};

use super::ArtifactError;

/// Mean Earth radius in meters.
const R_EARTH: f64 = 6_371_000.0;

/// Degenerate-segment guard for the projection loop (squared meters).
const MIN_SEGMENT_LEN2: f64 = 1e-9;

/// Raw centerline geometry as stored in `track.json`.
///
/// `x`/`y` are vertex coordinates in the local frame, `s` the arc length at
/// each vertex, `lat0`/`lon0` the surveyed GPS origin of the frame. The
/// exporter writes the origin so live runs and replays project identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackGeometry {
    pub lat0: f64,
    pub lon0: f64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub s: Vec<f64>,
    pub length_m: f64,
}

/// A position expressed in track coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPosition {
    /// Progress along the track in meters, within `[0, length_m)`.
    pub s_m: f64,
    /// Signed lateral distance from the centerline in meters.
    pub d_m: f64,
}

/// Validated track geometry with projection operations.
#[derive(Debug)]
pub struct TrackMap {
    geom: TrackGeometry,
    cos_lat0: f64,
}

impl TrackMap {
    /// Validate raw geometry and build the map.
    pub fn new(geom: TrackGeometry) -> Result<Self, ArtifactError> {
        let n = geom.x.len();
        if n < 2 {
            return Err(ArtifactError::Geometry(format!(
                "track polyline needs at least 2 vertices, got {n}"
            )));
        }
        if geom.y.len() != n || geom.s.len() != n {
            return Err(ArtifactError::Geometry(format!(
                "track arrays disagree in length: x={}, y={}, s={}",
                n,
                geom.y.len(),
                geom.s.len()
            )));
        }
        if !(geom.length_m > 0.0) {
            return Err(ArtifactError::Geometry(format!(
                "track length must be positive, got {}",
                geom.length_m
            )));
        }
        if geom.s.windows(2).any(|w| w[1] < w[0]) {
            return Err(ArtifactError::Geometry(
                "arc length column must be non-decreasing".to_string(),
            ));
        }
        let cos_lat0 = geom.lat0.to_radians().cos();
        Ok(Self { geom, cos_lat0 })
    }

    /// Total track length in meters.
    pub fn length_m(&self) -> f64 {
        self.geom.length_m
    }

    /// Surveyed GPS origin of the local frame as `(lat0, lon0)`.
    pub fn origin(&self) -> (f64, f64) {
        (self.geom.lat0, self.geom.lon0)
    }

    /// Convert a GPS fix to the local planar frame.
    pub fn gps_to_local_xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        let x = (lon - self.geom.lon0).to_radians() * self.cos_lat0 * R_EARTH;
        let y = (lat - self.geom.lat0).to_radians() * R_EARTH;
        (x, y)
    }

    /// Project a GPS fix onto the centerline.
    ///
    /// Scans every segment, clamps the foot of the perpendicular to the
    /// segment, and keeps the closest candidate. The lateral sign comes from
    /// the cross product with the segment direction.
    pub fn project(&self, lat: f64, lon: f64) -> TrackPosition {
        let (px, py) = self.gps_to_local_xy(lat, lon);
        self.project_xy(px, py)
    }

    /// Project a local-frame point onto the centerline.
    pub fn project_xy(&self, px: f64, py: f64) -> TrackPosition {
        let xs = &self.geom.x;
        let ys = &self.geom.y;
        let ss = &self.geom.s;

        let mut best_dist2 = f64::INFINITY;
        let mut best_s = 0.0;
        let mut best_sign = 1.0;

        for i in 0..xs.len() - 1 {
            let (ax, ay) = (xs[i], ys[i]);
            let (bx, by) = (xs[i + 1], ys[i + 1]);
            let (vx, vy) = (bx - ax, by - ay);

            let vv = vx * vx + vy * vy;
            if vv < MIN_SEGMENT_LEN2 {
                continue;
            }

            let (wx, wy) = (px - ax, py - ay);
            let t = ((wx * vx + wy * vy) / vv).clamp(0.0, 1.0);

            let (cx, cy) = (ax + t * vx, ay + t * vy);
            let (dx, dy) = (px - cx, py - cy);
            let dist2 = dx * dx + dy * dy;

            if dist2 < best_dist2 {
                best_dist2 = dist2;
                best_s = ss[i] + t * (ss[i + 1] - ss[i]);
                let cross = vx * (py - ay) - vy * (px - ax);
                best_sign = if cross >= 0.0 { 1.0 } else { -1.0 };
            }
        }

        TrackPosition { s_m: best_s, d_m: best_sign * best_dist2.sqrt() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 km straight track pointing east, origin at the start line.
    fn straight_geom() -> TrackGeometry {
        TrackGeometry {
            lat0: 40.0,
            lon0: -77.0,
            x: vec![0.0, 500.0, 1000.0],
            y: vec![0.0, 0.0, 0.0],
            s: vec![0.0, 500.0, 1000.0],
            length_m: 1000.0,
        }
    }

    #[test]
    fn rejects_degenerate_polylines() {
        let mut geom = straight_geom();
        geom.x.truncate(1);
        geom.y.truncate(1);
        geom.s.truncate(1);
        assert!(TrackMap::new(geom).is_err());

        let mut geom = straight_geom();
        geom.s.pop();
        assert!(TrackMap::new(geom).is_err());

        let mut geom = straight_geom();
        geom.length_m = 0.0;
        assert!(TrackMap::new(geom).is_err());
    }

    #[test]
    fn origin_projects_to_start() {
        let map = TrackMap::new(straight_geom()).unwrap();
        let pos = map.project(40.0, -77.0);
        assert!(pos.s_m.abs() < 1e-6);
        assert!(pos.d_m.abs() < 1e-6);
    }

    #[test]
    fn midpoint_projects_to_interpolated_s() {
        let map = TrackMap::new(straight_geom()).unwrap();
        let pos = map.project_xy(250.0, 0.0);
        assert!((pos.s_m - 250.0).abs() < 1e-9);
    }

    #[test]
    fn lateral_sign_follows_travel_direction() {
        let map = TrackMap::new(straight_geom()).unwrap();
        // Track runs +x; left of travel is +y.
        let left = map.project_xy(300.0, 4.0);
        let right = map.project_xy(300.0, -4.0);
        assert!((left.d_m - 4.0).abs() < 1e-9);
        assert!((right.d_m + 4.0).abs() < 1e-9);
    }

    #[test]
    fn beyond_last_vertex_clamps_to_end() {
        let map = TrackMap::new(straight_geom()).unwrap();
        let pos = map.project_xy(1100.0, 0.0);
        assert!((pos.s_m - 1000.0).abs() < 1e-9);
        assert!((pos.d_m.abs() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn gps_east_offset_maps_to_positive_x() {
        let map = TrackMap::new(straight_geom()).unwrap();
        let (x, y) = map.gps_to_local_xy(40.0, -76.999);
        assert!(x > 0.0);
        assert!(y.abs() < 1e-6);
    }
}
