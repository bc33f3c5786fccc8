//! Monitoring state shared by the fix and transition handlers
//!
//! Owned by exactly one `Monitor`; every read and write happens inside its
//! dispatch loop, so no field is ever observed half-updated.

use crate::domain::types::{Direction, LocationFix, Trajectory, PLACEHOLDER};
use crate::services::geofence_manager::DirectionalGeofenceManager;
use crate::services::zone_transition::humanize_zone_id;

pub struct MonitoringState {
    pub(crate) trajectory: Trajectory,
    /// Last zone reported by ENTER/DWELL/EXIT; kept after exit for display
    pub(crate) current_zone_id: Option<String>,
    pub(crate) within_zone: bool,
    pub(crate) previous_fix: Option<LocationFix>,
    pub(crate) geofences: DirectionalGeofenceManager,
}

impl MonitoringState {
    pub fn new(geofences: DirectionalGeofenceManager) -> Self {
        Self {
            trajectory: Trajectory::Unknown,
            current_zone_id: None,
            within_zone: false,
            previous_fix: None,
            geofences,
        }
    }

    pub fn trajectory(&self) -> Trajectory {
        self.trajectory
    }

    pub fn armed_direction(&self) -> Option<Direction> {
        self.geofences.armed()
    }

    pub fn current_zone_id(&self) -> Option<&str> {
        self.current_zone_id.as_deref()
    }

    pub fn within_zone(&self) -> bool {
        self.within_zone
    }

    pub fn previous_fix(&self) -> Option<&LocationFix> {
        self.previous_fix.as_ref()
    }

    /// Humanized last-known zone, or the placeholder
    pub fn current_zone_label(&self) -> String {
        match self.current_zone_id.as_deref() {
            Some(id) if !id.is_empty() => humanize_zone_id(id),
            _ => PLACEHOLDER.to_string(),
        }
    }

    /// Disarm and forget everything learned from the streams
    pub fn reset(&mut self) {
        self.geofences.disarm();
        self.trajectory = Trajectory::Unknown;
        self.current_zone_id = None;
        self.within_zone = false;
        self.previous_fix = None;
    }
}
