//! Zone transition handling and turn proximity alerts
//!
//! Transitions arrive from the platform provider with no ordering relation
//! to the fix stream. ENTER and DWELL mark the vehicle as inside the zone,
//! EXIT clears the flag but keeps the zone as the last known one. While
//! inside, every processed fix is checked against the zone's turn waypoint.

use crate::domain::catalog::GeofenceCatalog;
use crate::domain::geo::distance_m;
use crate::domain::types::{
    AlertEvent, AlertKind, LocationFix, TransitionType, ZoneTransition, PLACEHOLDER,
};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::state::MonitoringState;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Title used for turn proximity alerts
const TURN_ALERT_TITLE: &str = "NEARING TURN";

/// Lifecycle of a single zone as seen through transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePresence {
    Outside,
    Inside,
}

/// Render `PREFIX_word1_word2` as `Word1 Word2`; anything else as `-`
pub fn humanize_zone_id(zone_id: &str) -> String {
    let tokens: Vec<&str> = zone_id.split('_').collect();
    if tokens.len() != 3 || tokens[1].is_empty() || tokens[2].is_empty() {
        return PLACEHOLDER.to_string();
    }
    format!("{} {}", capitalize(tokens[1]), capitalize(tokens[2]))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub struct ZoneTransitionEngine {
    catalog: Arc<GeofenceCatalog>,
    metrics: Arc<Metrics>,
    proximity_radius_m: f64,
    /// 0 disables de-duplication
    cooldown_ms: u64,
    presence: FxHashMap<String, ZonePresence>,
    /// Fix timestamp of the last turn alert per zone
    last_turn_alert_ms: FxHashMap<String, u64>,
}

impl ZoneTransitionEngine {
    pub fn new(config: &Config, catalog: Arc<GeofenceCatalog>, metrics: Arc<Metrics>) -> Self {
        Self {
            catalog,
            metrics,
            proximity_radius_m: config.proximity_radius_m(),
            cooldown_ms: config.proximity_cooldown_ms(),
            presence: FxHashMap::default(),
            last_turn_alert_ms: FxHashMap::default(),
        }
    }

    /// Apply a transition to the shared state and build its alert
    pub fn on_transition(
        &mut self,
        state: &mut MonitoringState,
        event: &ZoneTransition,
    ) -> AlertEvent {
        let zone_id = event.zone_id.as_str();
        let location = humanize_zone_id(zone_id);
        let previous = self.presence(zone_id);

        let (title, description) = match event.transition {
            TransitionType::Enter => ("Entering Location", format!("Entering on: {location}")),
            TransitionType::Dwell => ("Dwelling Location", format!("Dwelling on: {location}")),
            TransitionType::Exit => ("Exiting Location", format!("Exiting: {location}")),
        };

        state.current_zone_id = Some(zone_id.to_string());
        match event.transition {
            TransitionType::Enter | TransitionType::Dwell => {
                state.within_zone = true;
                self.presence.insert(zone_id.to_string(), ZonePresence::Inside);
            }
            TransitionType::Exit => {
                state.within_zone = false;
                self.presence.insert(zone_id.to_string(), ZonePresence::Outside);
                self.last_turn_alert_ms.remove(zone_id);
            }
        }

        if event.transition == TransitionType::Exit && previous == ZonePresence::Outside {
            debug!(zone_id = %zone_id, "zone_exit_without_entry");
        }

        info!(
            zone_id = %zone_id,
            transition = %event.transition.as_str(),
            within_zone = %state.within_zone,
            "zone_transition"
        );
        self.metrics.record_transition();

        AlertEvent {
            kind: AlertKind::from(event.transition),
            title: title.to_string(),
            description,
            zone_id: zone_id.to_string(),
        }
    }

    /// Turn alert when inside a zone and within range of its waypoint
    pub fn check_proximity(
        &mut self,
        state: &MonitoringState,
        fix: &LocationFix,
    ) -> Option<AlertEvent> {
        if !state.within_zone {
            return None;
        }
        let zone_id = state.current_zone_id.as_deref()?;

        let Some(zone) = self.catalog.get(zone_id) else {
            debug!(zone_id = %zone_id, "proximity_unknown_zone");
            return None;
        };

        let distance = distance_m(fix.position(), zone.turn_waypoint);
        if distance > self.proximity_radius_m {
            return None;
        }

        if self.cooldown_ms > 0 {
            if let Some(&last) = self.last_turn_alert_ms.get(zone_id) {
                let elapsed = fix.timestamp_ms.saturating_sub(last);
                if elapsed < self.cooldown_ms {
                    debug!(zone_id = %zone_id, elapsed_ms = %elapsed, "turn_alert_cooldown");
                    return None;
                }
            }
            self.last_turn_alert_ms.insert(zone_id.to_string(), fix.timestamp_ms);
        }

        info!(
            zone_id = %zone_id,
            distance_m = %format!("{distance:.1}"),
            "approaching_turn"
        );

        Some(AlertEvent {
            kind: AlertKind::ApproachingTurn,
            title: TURN_ALERT_TITLE.to_string(),
            description: format!("Nearing {} right turn", zone.turn_label),
            zone_id: zone_id.to_string(),
        })
    }

    pub fn presence(&self, zone_id: &str) -> ZonePresence {
        self.presence.get(zone_id).copied().unwrap_or(ZonePresence::Outside)
    }

    /// Forget per-zone lifecycle and cooldown history
    pub fn reset(&mut self) {
        self.presence.clear();
        self.last_turn_alert_ms.clear();
    }
}
