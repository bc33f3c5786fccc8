//! Directional geofence set management
//!
//! Exactly one direction's zone set is registered with the platform provider
//! at a time. Arming always clears first, so a swap is remove-all followed by
//! a single batched registration. Provider calls are fire-and-forget: the
//! provider logs completion and failure, the manager never waits or retries.

use crate::domain::catalog::GeofenceCatalog;
use crate::domain::types::{Direction, LatLng, TransitionMask};
use crate::infra::metrics::Metrics;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One zone in a registration request
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceRegistration {
    pub id: String,
    pub center: LatLng,
    pub radius_m: f64,
    pub transitions: TransitionMask,
}

/// Batched registration request for a zone set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeofencingRequest {
    pub registrations: SmallVec<[GeofenceRegistration; 8]>,
}

impl GeofencingRequest {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Platform geofencing seam
///
/// Both calls must return without waiting for the provider to finish.
pub trait GeofencingProvider: Send + Sync {
    fn add_geofences(&self, request: GeofencingRequest);
    fn remove_all(&self);
}

/// Owns the currently armed zone set
pub struct DirectionalGeofenceManager {
    catalog: Arc<GeofenceCatalog>,
    provider: Arc<dyn GeofencingProvider>,
    metrics: Arc<Metrics>,
    armed: Option<Direction>,
    registered: SmallVec<[String; 8]>,
}

impl DirectionalGeofenceManager {
    pub fn new(
        catalog: Arc<GeofenceCatalog>,
        provider: Arc<dyn GeofencingProvider>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { catalog, provider, metrics, armed: None, registered: SmallVec::new() }
    }

    /// Register every zone of `direction`, replacing whatever was armed
    pub fn arm(&mut self, direction: Direction) {
        self.disarm();

        let request = GeofencingRequest {
            registrations: self
                .catalog
                .zones_for(direction)
                .map(|zone| GeofenceRegistration {
                    id: zone.id.clone(),
                    center: zone.center,
                    radius_m: zone.radius_m,
                    transitions: TransitionMask::ALL,
                })
                .collect(),
        };

        self.armed = Some(direction);
        self.metrics.record_geofence_arm();

        if request.is_empty() {
            warn!(direction = %direction, "geofence_arm_empty_set");
            return;
        }

        self.registered = request.ids().map(str::to_string).collect();
        info!(
            direction = %direction,
            zones = %request.len(),
            "geofences_arming"
        );
        self.provider.add_geofences(request);
    }

    /// Remove the registered set; no-op when nothing is armed
    pub fn disarm(&mut self) {
        let Some(direction) = self.armed.take() else {
            debug!("geofence_disarm_noop");
            return;
        };

        info!(
            direction = %direction,
            zones = %self.registered.len(),
            "geofences_disarming"
        );
        self.registered.clear();
        self.metrics.record_geofence_disarm();
        self.provider.remove_all();
    }

    pub fn armed(&self) -> Option<Direction> {
        self.armed
    }

    /// Ids the manager believes are registered with the provider
    pub fn registered_ids(&self) -> &[String] {
        &self.registered
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{ProviderCall, RecordingProvider};
    use super::*;

    fn create_manager() -> (DirectionalGeofenceManager, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider::default());
        let manager = DirectionalGeofenceManager::new(
            Arc::new(GeofenceCatalog::commonwealth()),
            provider.clone(),
            Arc::new(Metrics::new()),
        );
        (manager, provider)
    }

    #[test]
    fn test_disarm_when_nothing_armed_is_noop() {
        let (mut manager, provider) = create_manager();
        manager.disarm();
        manager.disarm();
        assert!(provider.calls().is_empty());
        assert_eq!(manager.armed(), None);
    }

    #[test]
    fn test_arm_registers_one_batch_for_direction() {
        let (mut manager, provider) = create_manager();
        manager.arm(Direction::South);

        assert_eq!(manager.armed(), Some(Direction::South));
        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let ProviderCall::Add(ids) = &calls[0] else {
            panic!("expected add, got {:?}", calls[0]);
        };
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| id.starts_with("SB_")));
        assert_eq!(manager.registered_ids(), ids.as_slice());
    }

    #[test]
    fn test_rearm_clears_before_registering() {
        let (mut manager, provider) = create_manager();
        manager.arm(Direction::South);
        manager.arm(Direction::North);

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], ProviderCall::RemoveAll);
        let ProviderCall::Add(ids) = &calls[2] else {
            panic!("expected add");
        };
        assert!(ids.iter().all(|id| id.starts_with("NB_")));
        assert_eq!(manager.armed(), Some(Direction::North));
    }

    #[test]
    fn test_registration_requests_all_transitions() {
        let catalog = GeofenceCatalog::commonwealth();
        let request = GeofencingRequest {
            registrations: catalog
                .zones_for(Direction::North)
                .map(|z| GeofenceRegistration {
                    id: z.id.clone(),
                    center: z.center,
                    radius_m: z.radius_m,
                    transitions: TransitionMask::ALL,
                })
                .collect(),
        };
        assert_eq!(request.len(), 6);
        assert!(request.registrations.iter().all(|r| r.transitions == TransitionMask::ALL));
    }

    #[test]
    fn test_disarm_after_arm_clears_bookkeeping() {
        let (mut manager, provider) = create_manager();
        manager.arm(Direction::North);
        manager.disarm();
        assert_eq!(manager.armed(), None);
        assert!(manager.registered_ids().is_empty());
        assert_eq!(provider.calls().last(), Some(&ProviderCall::RemoveAll));
    }
}
