//! Location fix processing: kinematics, direction and zone-set reconciliation
//!
//! Direction is the sign of the latitude delta between consecutive fixes
//! (south when negative, north otherwise, so a purely lateral move counts as
//! north). A reversal disarms and suppresses the fix; the next moving fix
//! arms the new direction. Stationary fixes are dropped without touching
//! state, so GPS jitter at rest never flips the zone set.

use crate::domain::geo::distance_m;
use crate::domain::types::{AlertEvent, Direction, LocationFix, StatusReport, Trajectory};
use crate::services::state::MonitoringState;
use crate::services::threshold::ThresholdEvaluator;
use crate::services::zone_transition::ZoneTransitionEngine;
use tracing::{debug, info};

/// Why a fix produced no status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// No previous fix to compare against
    FirstFix,
    /// Zero displacement since the previous fix
    Stationary,
    /// Direction flipped; zones disarmed, re-arm on the next fix
    Reversal,
}

impl SuppressReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressReason::FirstFix => "first_fix",
            SuppressReason::Stationary => "stationary",
            SuppressReason::Reversal => "reversal",
        }
    }
}

/// Result of processing one fix
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    Reported {
        report: StatusReport,
        turn_alert: Option<AlertEvent>,
    },
    Suppressed(SuppressReason),
}

/// Acceleration over consecutive fixes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acceleration {
    /// Speed delta per nominal one-second tick
    pub constant_time: f64,
    /// Speed delta over the actual timestamp delta; NaN when that delta is zero
    pub delta_time: f64,
}

impl Acceleration {
    pub fn between(previous: &LocationFix, current: &LocationFix) -> Self {
        let speed_delta = current.speed_mps - previous.speed_mps;
        let dt_ms = current.timestamp_ms as i64 - previous.timestamp_ms as i64;

        let delta_time = if dt_ms == 0 { f64::NAN } else { speed_delta / (dt_ms as f64 / 1000.0) };

        Self { constant_time: speed_delta / 1.0, delta_time }
    }
}

/// Direction implied by the latitude delta; ties resolve north
pub fn direction_between(previous: &LocationFix, current: &LocationFix) -> Direction {
    let lat_delta = current.latitude - previous.latitude;
    if lat_delta < 0.0 {
        Direction::South
    } else {
        Direction::North
    }
}

pub struct LocationStreamProcessor {
    evaluator: ThresholdEvaluator,
}

impl LocationStreamProcessor {
    pub fn new(evaluator: ThresholdEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn process(
        &self,
        state: &mut MonitoringState,
        zones: &mut ZoneTransitionEngine,
        fix: LocationFix,
    ) -> FixOutcome {
        let Some(previous) = state.previous_fix else {
            state.previous_fix = Some(fix);
            return FixOutcome::Suppressed(SuppressReason::FirstFix);
        };

        let distance_delta = distance_m(previous.position(), fix.position());
        if distance_delta == 0.0 {
            return FixOutcome::Suppressed(SuppressReason::Stationary);
        }

        let direction = direction_between(&previous, &fix);
        debug!(
            lat_delta = %(fix.latitude - previous.latitude),
            direction = %direction,
            "direction_sampled"
        );

        if state.geofences.armed().is_none() {
            state.geofences.arm(direction);
        } else if state.trajectory.direction() != Some(direction) {
            info!(
                from = %state.trajectory,
                to = %Trajectory::from(direction),
                "trajectory_reversal"
            );
            state.geofences.disarm();
            return FixOutcome::Suppressed(SuppressReason::Reversal);
        }
        state.trajectory = Trajectory::from(direction);

        let acceleration = Acceleration::between(&previous, &fix);
        let speed_kmh = fix.speed_kmh();
        let (status_label, severity) =
            self.evaluator.evaluate(speed_kmh, acceleration.constant_time, state.within_zone);

        let report = StatusReport {
            speed_kmh,
            latitude: fix.latitude,
            longitude: fix.longitude,
            acceleration_constant_time: acceleration.constant_time,
            acceleration_delta_time: acceleration.delta_time,
            trajectory: state.trajectory,
            current_zone_label: state.current_zone_label(),
            within_zone: state.within_zone,
            status_label,
            severity,
        };

        let turn_alert = zones.check_proximity(state, &fix);
        state.previous_fix = Some(fix);

        FixOutcome::Reported { report, turn_alert }
    }
}
