//! Simulated platform geofencing provider
//!
//! Stands in for the device's geofencing service. The monitor talks to it
//! through `GeofencingClient`, which only enqueues commands, so arming and
//! disarming never block the fix path. The worker applies registrations,
//! watches the same location feed as the monitor, and reports ENTER, DWELL
//! and EXIT transitions back on the monitor's inbound channel with no
//! ordering guarantee relative to fixes.

use crate::domain::geo::distance_m;
use crate::domain::types::{LocationFix, MonitorEvent, TransitionType, ZoneTransition};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::geofence_manager::{
    GeofenceRegistration, GeofencingProvider, GeofencingRequest,
};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Provider status code for registrations over the limit
pub const GEOFENCE_TOO_MANY_GEOFENCES: &str = "GEOFENCE_TOO_MANY_GEOFENCES";

/// Commands accepted by the provider worker
#[derive(Debug)]
pub enum GeofenceCmd {
    Add(GeofencingRequest),
    RemoveAll,
    /// Location sample seen by the provider's own location feed
    Observe(LocationFix),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Presence {
    Outside,
    Inside { since_ms: u64, dwell_sent: bool },
}

#[derive(Debug, Clone)]
struct RegisteredZone {
    registration: GeofenceRegistration,
    presence: Presence,
}

/// Zones currently registered with the provider
#[derive(Debug, Default)]
pub struct Registry {
    zones: Vec<RegisteredZone>,
}

impl Registry {
    /// Apply a batched registration; the whole batch fails over the limit
    pub fn add(&mut self, request: GeofencingRequest, max_geofences: usize) -> Result<usize, &'static str> {
        let new_ids = request
            .registrations
            .iter()
            .filter(|r| !self.zones.iter().any(|z| z.registration.id == r.id))
            .count();
        if self.zones.len() + new_ids > max_geofences {
            return Err(GEOFENCE_TOO_MANY_GEOFENCES);
        }

        for registration in request.registrations {
            let zone = RegisteredZone { registration, presence: Presence::Outside };
            match self.zones.iter_mut().find(|z| z.registration.id == zone.registration.id) {
                Some(existing) => *existing = zone,
                None => self.zones.push(zone),
            }
        }
        Ok(self.zones.len())
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.zones.len();
        self.zones.clear();
        removed
    }

    pub fn ids(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.registration.id.clone()).collect()
    }

    /// Advance every zone's presence with a new fix
    pub fn observe(
        &mut self,
        fix: &LocationFix,
        loitering_delay_ms: u64,
    ) -> SmallVec<[ZoneTransition; 2]> {
        let mut transitions = SmallVec::new();

        for zone in &mut self.zones {
            let reg = &zone.registration;
            let inside = distance_m(fix.position(), reg.center) <= reg.radius_m;

            let fired = match (zone.presence, inside) {
                (Presence::Outside, true) => {
                    zone.presence = Presence::Inside { since_ms: fix.timestamp_ms, dwell_sent: false };
                    Some(TransitionType::Enter)
                }
                (Presence::Inside { since_ms, dwell_sent: false }, true)
                    if fix.timestamp_ms.saturating_sub(since_ms) >= loitering_delay_ms =>
                {
                    zone.presence = Presence::Inside { since_ms, dwell_sent: true };
                    Some(TransitionType::Dwell)
                }
                (Presence::Inside { .. }, false) => {
                    zone.presence = Presence::Outside;
                    Some(TransitionType::Exit)
                }
                _ => None,
            };

            if let Some(transition) = fired {
                if reg.transitions.contains(transition) {
                    transitions.push(ZoneTransition { zone_id: reg.id.clone(), transition });
                }
            }
        }

        transitions
    }
}

/// Non-blocking handle used by the monitor and the location source
#[derive(Clone)]
pub struct GeofencingClient {
    cmd_tx: mpsc::Sender<GeofenceCmd>,
    registry: Arc<Mutex<Registry>>,
    metrics: Arc<Metrics>,
}

impl GeofencingClient {
    /// Forward a fix to the provider's location feed
    pub fn observe(&self, fix: LocationFix) {
        self.send(GeofenceCmd::Observe(fix));
    }

    /// Ids the provider has actually applied
    pub fn registered_ids(&self) -> Vec<String> {
        self.registry.lock().ids()
    }

    fn send(&self, cmd: GeofenceCmd) {
        match self.cmd_tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                self.metrics.record_geofence_cmd_dropped();
                warn!(cmd = ?cmd, "geofence_cmd_queue_full");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("geofence_cmd_channel_closed");
            }
        }
    }
}

impl GeofencingProvider for GeofencingClient {
    fn add_geofences(&self, request: GeofencingRequest) {
        self.send(GeofenceCmd::Add(request));
    }

    fn remove_all(&self) {
        self.send(GeofenceCmd::RemoveAll);
    }
}

/// Worker applying provider commands and emitting transitions
pub struct SimulatedGeofencer {
    cmd_rx: mpsc::Receiver<GeofenceCmd>,
    event_tx: mpsc::Sender<MonitorEvent>,
    registry: Arc<Mutex<Registry>>,
    metrics: Arc<Metrics>,
    loitering_delay_ms: u64,
    max_geofences: usize,
}

impl SimulatedGeofencer {
    /// Run until every client handle is dropped
    pub async fn run(mut self) {
        info!(
            loitering_delay_ms = %self.loitering_delay_ms,
            max_geofences = %self.max_geofences,
            "geofencer_started"
        );

        while let Some(cmd) = self.cmd_rx.recv().await {
            self.handle(cmd);
        }

        info!("geofencer_stopped");
    }

    fn handle(&mut self, cmd: GeofenceCmd) {
        match cmd {
            GeofenceCmd::Add(request) => {
                let ids: Vec<String> = request.ids().map(str::to_string).collect();
                match self.registry.lock().add(request, self.max_geofences) {
                    Ok(total) => info!(ids = ?ids, registered = %total, "geofences_added"),
                    Err(code) => error!(ids = ?ids, code = %code, "geofence_registration_failed"),
                }
            }
            GeofenceCmd::RemoveAll => {
                let removed = self.registry.lock().clear();
                info!(removed = %removed, "geofences_removed");
            }
            GeofenceCmd::Observe(fix) => {
                let transitions = self.registry.lock().observe(&fix, self.loitering_delay_ms);
                for transition in transitions {
                    debug!(
                        zone_id = %transition.zone_id,
                        transition = %transition.transition.as_str(),
                        "geofence_triggered"
                    );
                    match self.event_tx.try_send(MonitorEvent::Transition(transition)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            self.metrics.record_event_dropped();
                            warn!("geofence_transition_dropped");
                        }
                        Err(TrySendError::Closed(_)) => return,
                    }
                }
            }
        }
    }
}

/// Create the provider client and its worker (to be spawned)
pub fn create_geofencer(
    config: &Config,
    event_tx: mpsc::Sender<MonitorEvent>,
    metrics: Arc<Metrics>,
) -> (GeofencingClient, SimulatedGeofencer) {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.geofence_command_queue_size());
    let registry = Arc::new(Mutex::new(Registry::default()));
    let client = GeofencingClient { cmd_tx, registry: registry.clone(), metrics: metrics.clone() };
    let worker = SimulatedGeofencer {
        cmd_rx,
        event_tx,
        registry,
        metrics,
        loitering_delay_ms: config.loitering_delay_ms(),
        max_geofences: config.max_geofences(),
    };
    (client, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{LatLng, TransitionMask};
    use tokio::time::{timeout, Duration};

    fn registration(id: &str, lat: f64, lon: f64, radius_m: f64) -> GeofenceRegistration {
        GeofenceRegistration {
            id: id.to_string(),
            center: LatLng::new(lat, lon),
            radius_m,
            transitions: TransitionMask::ALL,
        }
    }

    fn request(regs: Vec<GeofenceRegistration>) -> GeofencingRequest {
        GeofencingRequest { registrations: regs.into_iter().collect() }
    }

    fn kinds(transitions: &[ZoneTransition]) -> Vec<TransitionType> {
        transitions.iter().map(|t| t.transition).collect()
    }

    #[test]
    fn test_enter_dwell_exit_sequence() {
        let mut registry = Registry::default();
        registry.add(request(vec![registration("SB_A_B", 14.70, 121.07, 100.0)]), 100).unwrap();

        let outside = LocationFix::new(14.702, 121.07, 10.0, 0);
        let inside = |ts| LocationFix::new(14.70, 121.07, 1.0, ts);

        assert!(registry.observe(&outside, 3000).is_empty());
        assert_eq!(kinds(&registry.observe(&inside(1000), 3000)), vec![TransitionType::Enter]);
        assert!(registry.observe(&inside(2000), 3000).is_empty());
        assert_eq!(kinds(&registry.observe(&inside(4000), 3000)), vec![TransitionType::Dwell]);
        // dwell is reported once per entry
        assert!(registry.observe(&inside(9000), 3000).is_empty());
        let exit = registry.observe(&LocationFix::new(14.702, 121.07, 10.0, 10_000), 3000);
        assert_eq!(kinds(&exit), vec![TransitionType::Exit]);
        assert_eq!(exit[0].zone_id, "SB_A_B");
    }

    #[test]
    fn test_cleared_zones_do_not_trigger() {
        let mut registry = Registry::default();
        registry.add(request(vec![registration("SB_A_B", 14.70, 121.07, 100.0)]), 100).unwrap();
        assert_eq!(registry.clear(), 1);
        assert!(registry.observe(&LocationFix::new(14.70, 121.07, 1.0, 0), 0).is_empty());
    }

    #[test]
    fn test_registration_limit_rejects_whole_batch() {
        let mut registry = Registry::default();
        let regs = vec![
            registration("SB_A_B", 14.70, 121.07, 100.0),
            registration("SB_C_D", 14.71, 121.07, 100.0),
        ];
        assert_eq!(registry.add(request(regs), 1), Err(GEOFENCE_TOO_MANY_GEOFENCES));
        assert!(registry.ids().is_empty());
    }

    #[test]
    fn test_re_adding_same_id_replaces() {
        let mut registry = Registry::default();
        registry.add(request(vec![registration("SB_A_B", 14.70, 121.07, 100.0)]), 1).unwrap();
        registry.add(request(vec![registration("SB_A_B", 14.70, 121.07, 200.0)]), 1).unwrap();
        assert_eq!(registry.ids(), vec!["SB_A_B".to_string()]);
    }

    #[test]
    fn test_mask_filters_transitions() {
        let mut registry = Registry::default();
        let mut reg = registration("SB_A_B", 14.70, 121.07, 100.0);
        reg.transitions = TransitionMask::EXIT;
        registry.add(request(vec![reg]), 10).unwrap();
        assert!(registry.observe(&LocationFix::new(14.70, 121.07, 1.0, 0), 0).is_empty());
        let exit = registry.observe(&LocationFix::new(14.71, 121.07, 1.0, 1000), 0);
        assert_eq!(kinds(&exit), vec![TransitionType::Exit]);
    }

    #[tokio::test]
    async fn test_worker_emits_transitions_on_event_channel() {
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let config = Config::default();
        let (client, worker) = create_geofencer(&config, event_tx, Arc::new(Metrics::new()));
        let handle = tokio::spawn(worker.run());

        client.add_geofences(request(vec![registration("SB_A_B", 14.70, 121.07, 100.0)]));
        client.observe(LocationFix::new(14.70, 121.07, 1.0, 0));

        let event = timeout(Duration::from_secs(1), event_rx.recv()).await.unwrap().unwrap();
        assert_eq!(
            event,
            MonitorEvent::Transition(ZoneTransition {
                zone_id: "SB_A_B".to_string(),
                transition: TransitionType::Enter,
            })
        );
        assert_eq!(client.registered_ids(), vec!["SB_A_B".to_string()]);

        client.remove_all();
        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_uses_configured_dwell_and_limit() {
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let config = Config::default().with_loitering_delay_ms(1000).with_max_geofences(1);
        let (client, worker) = create_geofencer(&config, event_tx, Arc::new(Metrics::new()));
        let handle = tokio::spawn(worker.run());

        client.add_geofences(request(vec![
            registration("SB_A_B", 14.70, 121.07, 100.0),
            registration("SB_C_D", 14.71, 121.07, 100.0),
        ]));
        client.add_geofences(request(vec![registration("SB_A_B", 14.70, 121.07, 100.0)]));
        client.observe(LocationFix::new(14.70, 121.07, 1.0, 0));
        client.observe(LocationFix::new(14.70, 121.07, 1.0, 1000));
        drop(client);
        handle.await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(MonitorEvent::Transition(t)) = event_rx.try_recv() {
            assert_eq!(t.zone_id, "SB_A_B");
            kinds.push(t.transition);
        }
        assert_eq!(kinds, vec![TransitionType::Enter, TransitionType::Dwell]);
    }
}
