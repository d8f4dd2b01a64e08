//! Comparison of a sanitized sample against its zone's optimal profile.
//!
//! Produces one [`EvaluationResult`] per sample: signed normalized deviations
//! for each coached channel, a scalar magnitude under the configured
//! reduction, and a raw green/red verdict. Pure and side-effect free; it
//! never consults or mutates stabilizer state.

use crate::config::{EvaluatorConfig, KindThresholds, Reduction};
use crate::track::ZoneProfile;
use crate::types::{DrivingState, EvaluationResult, SanitizedSample, ZoneAssignment};

pub struct StateEvaluator {
    cfg: EvaluatorConfig,
    thresholds: KindThresholds,
}

impl StateEvaluator {
    pub fn new(cfg: EvaluatorConfig, thresholds: KindThresholds) -> Self {
        Self { cfg, thresholds }
    }

    /// Evaluate one sample against one zone profile.
    pub fn evaluate(
        &self,
        sample: &SanitizedSample,
        zone: &ZoneAssignment,
        profile: &ZoneProfile,
    ) -> EvaluationResult {
        let speed_dev = profile.speed_mps.deviation(sample.speed_mps);
        let power_dev = profile.power_w.deviation(sample.power_w);

        let deviation = match self.cfg.reduction {
            Reduction::MaxAbs => speed_dev.abs().max(power_dev.abs()),
            Reduction::WeightedSum => {
                self.cfg.speed_weight * speed_dev.abs() + self.cfg.power_weight * power_dev.abs()
            }
        };

        // The raw verdict uses the same per-kind boundary the stabilizer
        // proposes RED at, so an evaluation never reads green while the
        // stabilizer is being pushed toward red.
        let red_enter = self.thresholds.for_kind(zone.kind).red_enter;
        let state = if deviation > red_enter { DrivingState::Red } else { DrivingState::Green };

        EvaluationResult {
            zone_id: zone.id.clone(),
            zone_kind: zone.kind,
            state,
            deviation,
            speed_dev,
            power_dev,
            timestamp: sample.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::ProfileBand;
    use crate::types::ZoneKind;

    fn sample(speed_mps: f64, power_w: f64) -> SanitizedSample {
        SanitizedSample {
            timestamp: 10.0,
            latitude: 40.0,
            longitude: -77.0,
            speed_mps,
            power_w,
            voltage_v: None,
            current_a: None,
        }
    }

    fn profile() -> ZoneProfile {
        ZoneProfile {
            zone_id: "TURN_1".to_string(),
            speed_mps: ProfileBand::Target { target: 15.0, tolerance: 2.0 },
            power_w: ProfileBand::Target { target: 100.0, tolerance: 50.0 },
            confidence: 1.0,
            samples: 100,
        }
    }

    fn evaluator(reduction: Reduction) -> StateEvaluator {
        let cfg = EvaluatorConfig { reduction, ..EvaluatorConfig::default() };
        StateEvaluator::new(cfg, KindThresholds::default())
    }

    #[test]
    fn on_target_sample_scores_zero_and_green() {
        let zone = ZoneAssignment::new("TURN_1", ZoneKind::Turn);
        let eval = evaluator(Reduction::MaxAbs).evaluate(&sample(15.0, 100.0), &zone, &profile());
        assert_eq!(eval.deviation, 0.0);
        assert_eq!(eval.state, DrivingState::Green);
        assert_eq!(eval.zone_id, "TURN_1");
    }

    #[test]
    fn max_abs_takes_the_dominant_channel() {
        let zone = ZoneAssignment::new("TURN_1", ZoneKind::Turn);
        // speed 2.0 tolerances over, power 0.5 over
        let eval = evaluator(Reduction::MaxAbs).evaluate(&sample(19.0, 125.0), &zone, &profile());
        assert_eq!(eval.speed_dev, 2.0);
        assert_eq!(eval.power_dev, 0.5);
        assert_eq!(eval.deviation, 2.0);
        assert_eq!(eval.state, DrivingState::Red); // turn red_enter = 1.5
    }

    #[test]
    fn weighted_sum_combines_channels() {
        let zone = ZoneAssignment::new("TURN_1", ZoneKind::Turn);
        let eval =
            evaluator(Reduction::WeightedSum).evaluate(&sample(19.0, 125.0), &zone, &profile());
        assert!((eval.deviation - 2.5).abs() < 1e-9);
    }

    #[test]
    fn below_target_deviation_is_negative_but_magnitude_counts() {
        let zone = ZoneAssignment::new("TURN_1", ZoneKind::Turn);
        let eval = evaluator(Reduction::MaxAbs).evaluate(&sample(11.0, 100.0), &zone, &profile());
        assert_eq!(eval.speed_dev, -2.0);
        assert_eq!(eval.deviation, 2.0);
        assert_eq!(eval.state, DrivingState::Red);
    }

    #[test]
    fn raw_state_respects_zone_kind_threshold() {
        // Same deviation magnitude, different zone kinds: the turn table
        // tolerates 1.5, the straight table only 1.0.
        let p = profile();
        let eval_turn = evaluator(Reduction::MaxAbs).evaluate(
            &sample(17.4, 100.0), // dev 1.2
            &ZoneAssignment::new("TURN_1", ZoneKind::Turn),
            &p,
        );
        assert_eq!(eval_turn.state, DrivingState::Green);

        let eval_straight = evaluator(Reduction::MaxAbs).evaluate(
            &sample(17.4, 100.0),
            &ZoneAssignment::new("STRAIGHT", ZoneKind::Straight),
            &p,
        );
        assert_eq!(eval_straight.state, DrivingState::Red);
    }
}
