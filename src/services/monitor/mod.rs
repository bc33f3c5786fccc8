//! Speed and zone monitoring orchestration
//!
//! The Monitor is the single owner of `MonitoringState`. Location fixes and
//! geofence transitions arrive from independent tasks on one channel and are
//! applied strictly one at a time:
//! - fixes go through the `LocationStreamProcessor` (direction, arming,
//!   thresholds, turn proximity)
//! - transitions go through the `ZoneTransitionEngine` (zone state, alerts)
//!
//! Results leave the loop without blocking: status reports on a watch
//! channel, alerts on a bounded queue.


use crate::domain::catalog::GeofenceCatalog;
use crate::domain::types::{LocationFix, MonitorEvent, StatusReport, ZoneTransition};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::notification::AlertSender;
use crate::services::geofence_manager::{DirectionalGeofenceManager, GeofencingProvider};
use crate::services::location_processor::{FixOutcome, LocationStreamProcessor};
use crate::services::state::MonitoringState;
use crate::services::threshold::ThresholdEvaluator;
use crate::services::zone_transition::ZoneTransitionEngine;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

pub struct Monitor {
    pub(crate) state: MonitoringState,
    pub(crate) zones: ZoneTransitionEngine,
    pub(crate) processor: LocationStreamProcessor,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) alerts: AlertSender,
    /// Latest status report for the display
    pub(crate) status_tx: watch::Sender<Option<StatusReport>>,
}

impl Monitor {
    pub fn new(
        config: &Config,
        catalog: Arc<GeofenceCatalog>,
        provider: Arc<dyn GeofencingProvider>,
        metrics: Arc<Metrics>,
        alerts: AlertSender,
        status_tx: watch::Sender<Option<StatusReport>>,
    ) -> Self {
        let geofences = DirectionalGeofenceManager::new(catalog.clone(), provider, metrics.clone());
        Self {
            state: MonitoringState::new(geofences),
            zones: ZoneTransitionEngine::new(config, catalog, metrics.clone()),
            processor: LocationStreamProcessor::new(ThresholdEvaluator::from_config(config)),
            metrics,
            alerts,
            status_tx,
        }
    }

    /// Consume events until the channel closes or shutdown is signalled.
    /// Events already queued at shutdown are still applied, then all zones
    /// are disarmed.
    pub async fn run(
        &mut self,
        mut event_rx: mpsc::Receiver<MonitorEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("monitor_started");

        // shutdown may already be set before this receiver was handed over
        if *shutdown.borrow_and_update() {
            self.drain(&mut event_rx);
            self.stop();
            return;
        }

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(e) => self.process_event(e),
                        None => break,
                    }
                }
                _ = shutdown.changed() => {
                    self.drain(&mut event_rx);
                    break;
                }
            }
        }

        self.stop();
    }

    fn drain(&mut self, event_rx: &mut mpsc::Receiver<MonitorEvent>) {
        let mut drained = 0usize;
        while let Ok(e) = event_rx.try_recv() {
            self.process_event(e);
            drained += 1;
        }
        info!(drained = %drained, "monitor_shutdown");
    }

    pub fn process_event(&mut self, event: MonitorEvent) {
        let process_start = Instant::now();

        match event {
            MonitorEvent::Fix(fix) => self.handle_fix(fix),
            MonitorEvent::Transition(transition) => self.handle_transition(&transition),
        }

        let latency_us = process_start.elapsed().as_micros() as u64;
        self.metrics.record_event_processed(latency_us);
    }

    fn handle_fix(&mut self, fix: LocationFix) {
        self.metrics.record_fix();

        match self.processor.process(&mut self.state, &mut self.zones, fix) {
            FixOutcome::Reported { report, turn_alert } => {
                self.metrics.record_report();
                debug!(
                    speed = %report.speed_display(),
                    status = %report.status_label,
                    trajectory = %report.trajectory,
                    "status_report"
                );
                self.status_tx.send_replace(Some(report));
                if let Some(alert) = turn_alert {
                    self.alerts.send(alert);
                }
            }
            FixOutcome::Suppressed(reason) => {
                self.metrics.record_suppressed(reason);
                debug!(reason = %reason.as_str(), ts = %fix.timestamp_ms, "fix_suppressed");
            }
        }
    }

    fn handle_transition(&mut self, transition: &ZoneTransition) {
        let alert = self.zones.on_transition(&mut self.state, transition);
        self.alerts.send(alert);
    }

    /// Disarm every zone and forget trip state
    pub fn stop(&mut self) {
        self.state.reset();
        self.zones.reset();
        info!("monitor_stopped");
    }

    pub fn state(&self) -> &MonitoringState {
        &self.state
    }
}
