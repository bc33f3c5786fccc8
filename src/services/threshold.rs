//! Speed and acceleration threshold classification
//!
//! Two bound tables are in play: a stricter one while the vehicle is inside
//! a turn zone and a looser one on the open corridor. All comparisons are
//! strict `>`, so a value sitting exactly on a bound is still NORMAL.

use crate::domain::types::{Severity, StatusLabel};
use crate::infra::config::{Config, ThresholdConfig};

/// Pure evaluator over the within-zone and outside-zone bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEvaluator {
    within_zone: ThresholdConfig,
    outside_zone: ThresholdConfig,
}

impl ThresholdEvaluator {
    pub fn new(within_zone: ThresholdConfig, outside_zone: ThresholdConfig) -> Self {
        Self { within_zone, outside_zone }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.within_zone_thresholds(), config.outside_zone_thresholds())
    }

    /// Classify a sample. NaN acceleration never exceeds a bound.
    pub fn evaluate(
        &self,
        speed_kmh: f64,
        acceleration: f64,
        within_zone: bool,
    ) -> (StatusLabel, Severity) {
        let bounds = if within_zone { &self.within_zone } else { &self.outside_zone };

        let speed_exceeded = speed_kmh > bounds.speed_kmh;
        let accel_exceeded = acceleration > bounds.accel_mps2;

        let label = match (speed_exceeded, accel_exceeded) {
            (true, true) => StatusLabel::SpeedAndAccelLimit,
            (true, false) => StatusLabel::SpeedLimit,
            (false, true) => StatusLabel::AccelLimit,
            (false, false) => StatusLabel::Normal,
        };

        (label, Severity::from_exceeded(speed_exceeded, accel_exceeded))
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
