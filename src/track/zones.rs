//! Zone assignment along the track progress coordinate.
//!
//! Zones are classified with the priority Turn > StopApproach > Straight.
//! Turn intervals are half-open `[start, end)` and wrap-safe across the
//! start/finish line: a position exactly at a turn's end boundary belongs to
//! whatever comes next, never to the turn itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrackConfig;
use crate::types::{ZoneAssignment, ZoneKind};

/// One turn segment from `turn_zones.json`, bounded in track meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TurnSegment {
    pub s_start: f64,
    pub s_end: f64,
}

/// One stop line from `stop_lines.json`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StopLine {
    pub stop_line: u32,
    pub s_stop_m: f64,
}

/// Deterministic zone lookup against static geometry.
#[derive(Debug)]
pub struct ZoneLocator {
    turns: Vec<TurnSegment>,
    stops: Vec<StopLine>,
    length_m: f64,
    stop_approach_m: f64,
    max_offtrack_m: f64,
}

impl ZoneLocator {
    pub fn new(
        turns: Vec<TurnSegment>,
        stops: Vec<StopLine>,
        length_m: f64,
        cfg: &TrackConfig,
    ) -> Self {
        Self {
            turns,
            stops,
            length_m,
            stop_approach_m: cfg.stop_approach_m,
            max_offtrack_m: cfg.max_offtrack_m,
        }
    }

    /// Assign a zone to a track position, or `None` when the vehicle is not
    /// on the mapped line (lateral offset beyond the configured corridor,
    /// e.g. in the paddock before the first lap marker).
    pub fn locate(&self, s_m: f64, d_m: f64) -> Option<ZoneAssignment> {
        if d_m.abs() > self.max_offtrack_m {
            debug!(s_m, d_m, "position outside track corridor, no zone");
            return None;
        }

        // Turns win over everything else.
        for (i, turn) in self.turns.iter().enumerate() {
            if self.in_turn(s_m, turn) {
                return Some(ZoneAssignment::new(format!("TURN_{}", i + 1), ZoneKind::Turn));
            }
        }

        // Nearest stop line strictly ahead within the approach window.
        let mut best: Option<(f64, u32)> = None;
        for stop in &self.stops {
            let d = self.forward_dist(s_m, stop.s_stop_m);
            if d > 0.0 && d <= self.stop_approach_m {
                match best {
                    Some((best_d, _)) if best_d <= d => {}
                    _ => best = Some((d, stop.stop_line)),
                }
            }
        }
        if let Some((_, stop_line)) = best {
            return Some(ZoneAssignment::new(
                format!("STOP_{stop_line}_APPROACH"),
                ZoneKind::StopApproach,
            ));
        }

        Some(ZoneAssignment::new("STRAIGHT", ZoneKind::Straight))
    }

    /// Half-open interval membership, wrap-safe across the lap boundary.
    fn in_turn(&self, s: f64, turn: &TurnSegment) -> bool {
        let (a, b) = (turn.s_start, turn.s_end);
        if a <= b {
            a <= s && s < b
        } else {
            s >= a || s < b
        }
    }

    /// Distance from `s_now` forward along the lap to `s_target`.
    fn forward_dist(&self, s_now: f64, s_target: f64) -> f64 {
        let d = s_target - s_now;
        if d < 0.0 {
            d + self.length_m
        } else {
            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 km lap: TURN_1 at [100, 200), TURN_2 wrapping [950, 50),
    /// stop line 1 at s=600 with an 80 m approach window.
    fn locator() -> ZoneLocator {
        ZoneLocator::new(
            vec![
                TurnSegment { s_start: 100.0, s_end: 200.0 },
                TurnSegment { s_start: 950.0, s_end: 50.0 },
            ],
            vec![StopLine { stop_line: 1, s_stop_m: 600.0 }],
            1000.0,
            &TrackConfig { stop_approach_m: 80.0, max_offtrack_m: 30.0 },
        )
    }

    fn zone_at(s: f64) -> ZoneAssignment {
        locator().locate(s, 0.0).unwrap()
    }

    #[test]
    fn turn_interval_is_half_open() {
        assert_eq!(zone_at(100.0).id, "TURN_1"); // start boundary belongs to the turn
        assert_eq!(zone_at(199.999).id, "TURN_1");
        // exactly at the end boundary belongs to the next zone
        assert_eq!(zone_at(200.0).kind, ZoneKind::Straight);
    }

    #[test]
    fn wrapping_turn_covers_both_sides_of_lap_boundary() {
        assert_eq!(zone_at(980.0).id, "TURN_2");
        assert_eq!(zone_at(0.0).id, "TURN_2");
        assert_eq!(zone_at(49.999).id, "TURN_2");
        assert_eq!(zone_at(50.0).kind, ZoneKind::Straight);
    }

    #[test]
    fn stop_approach_window_before_stop_line() {
        assert_eq!(zone_at(520.0).id, "STOP_1_APPROACH"); // 80 m out, inclusive
        assert_eq!(zone_at(599.0).id, "STOP_1_APPROACH");
        // exactly at the stop line the approach is over
        assert_eq!(zone_at(600.0).kind, ZoneKind::Straight);
        // too far out
        assert_eq!(zone_at(519.0).kind, ZoneKind::Straight);
    }

    #[test]
    fn turn_outranks_stop_approach() {
        let loc = ZoneLocator::new(
            vec![TurnSegment { s_start: 550.0, s_end: 590.0 }],
            vec![StopLine { stop_line: 1, s_stop_m: 600.0 }],
            1000.0,
            &TrackConfig { stop_approach_m: 80.0, max_offtrack_m: 30.0 },
        );
        assert_eq!(loc.locate(560.0, 0.0).unwrap().kind, ZoneKind::Turn);
        assert_eq!(loc.locate(595.0, 0.0).unwrap().kind, ZoneKind::StopApproach);
    }

    #[test]
    fn nearest_stop_ahead_wins() {
        let loc = ZoneLocator::new(
            vec![],
            vec![
                StopLine { stop_line: 1, s_stop_m: 600.0 },
                StopLine { stop_line: 2, s_stop_m: 560.0 },
            ],
            1000.0,
            &TrackConfig { stop_approach_m: 80.0, max_offtrack_m: 30.0 },
        );
        assert_eq!(loc.locate(540.0, 0.0).unwrap().id, "STOP_2_APPROACH");
    }

    #[test]
    fn off_track_positions_have_no_zone() {
        assert!(locator().locate(300.0, 45.0).is_none());
        assert!(locator().locate(300.0, -45.0).is_none());
        assert!(locator().locate(300.0, 29.0).is_some());
    }

    #[test]
    fn stop_approach_wraps_across_lap_boundary() {
        let loc = ZoneLocator::new(
            vec![],
            vec![StopLine { stop_line: 3, s_stop_m: 20.0 }],
            1000.0,
            &TrackConfig { stop_approach_m: 80.0, max_offtrack_m: 30.0 },
        );
        // 60 m before the stop line, across s = 0
        assert_eq!(loc.locate(960.0, 0.0).unwrap().id, "STOP_3_APPROACH");
    }
}
