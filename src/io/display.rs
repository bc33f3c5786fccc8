//! Log-backed status display
//!
//! Follows the monitor's latest `StatusReport` through a watch channel and
//! renders each one as a `status_updated` log line. Intermediate reports may
//! be skipped when the display falls behind; only the newest one is shown.

use crate::domain::types::{format_decimal, Highlight, StatusReport};
use tokio::sync::watch;
use tracing::{info, warn};

/// Display-ready fields of one status report
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub speed: String,
    pub acceleration: String,
    pub coordinates: String,
    pub trajectory: &'static str,
    pub zone: String,
    pub status: &'static str,
    pub speed_alert: bool,
    pub acceleration_alert: bool,
}

impl StatusLine {
    pub fn render(report: &StatusReport) -> Self {
        Self {
            speed: report.speed_display(),
            acceleration: report.acceleration_display(),
            coordinates: format!(
                "{}, {}",
                format_decimal(report.latitude),
                format_decimal(report.longitude)
            ),
            trajectory: report.trajectory.as_str(),
            zone: report.current_zone_label.clone(),
            status: report.status_label.as_str(),
            speed_alert: report.severity.speed == Highlight::Alert,
            acceleration_alert: report.severity.acceleration == Highlight::Alert,
        }
    }

    fn log(&self) {
        if self.speed_alert || self.acceleration_alert {
            warn!(
                speed = %self.speed,
                acceleration = %self.acceleration,
                trajectory = %self.trajectory,
                zone = %self.zone,
                status = %self.status,
                speed_alert = %self.speed_alert,
                acceleration_alert = %self.acceleration_alert,
                "status_updated"
            );
        } else {
            info!(
                speed = %self.speed,
                acceleration = %self.acceleration,
                coordinates = %self.coordinates,
                trajectory = %self.trajectory,
                zone = %self.zone,
                status = %self.status,
                "status_updated"
            );
        }
    }
}

/// Runs until the monitor drops its status sender
pub async fn run_display(mut status_rx: watch::Receiver<Option<StatusReport>>) {
    let mut shown = 0u64;

    while status_rx.changed().await.is_ok() {
        let line = status_rx.borrow_and_update().as_ref().map(StatusLine::render);
        if let Some(line) = line {
            line.log();
            shown += 1;
        }
    }

    info!(reports_shown = %shown, "display_stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Severity, StatusLabel, Trajectory};

    fn report(accel_delta: f64, severity: Severity) -> StatusReport {
        StatusReport {
            speed_kmh: 72.0,
            latitude: 14.7,
            longitude: 121.07,
            acceleration_constant_time: 0.5,
            acceleration_delta_time: accel_delta,
            trajectory: Trajectory::Southbound,
            current_zone_label: "San Simon".to_string(),
            within_zone: true,
            status_label: StatusLabel::SpeedLimit,
            severity,
        }
    }

    #[test]
    fn test_render_fields() {
        let line = StatusLine::render(&report(0.25, Severity::from_exceeded(true, false)));
        assert_eq!(line.speed, "72.00km/h");
        assert_eq!(line.acceleration, "0.50 m/s\u{00B2} || 0.25 m/s\u{00B2}");
        assert_eq!(line.coordinates, "14.70, 121.07");
        assert_eq!(line.trajectory, "SOUTHBOUND");
        assert_eq!(line.zone, "San Simon");
        assert_eq!(line.status, "SPEED_LIMIT");
        assert!(line.speed_alert);
        assert!(!line.acceleration_alert);
    }

    #[test]
    fn test_render_undefined_acceleration() {
        let line = StatusLine::render(&report(f64::NAN, Severity::from_exceeded(false, false)));
        assert_eq!(line.acceleration, "0.50 m/s\u{00B2} || - m/s\u{00B2}");
    }

    #[tokio::test]
    async fn test_display_stops_when_sender_dropped() {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(run_display(rx));
        tx.send_replace(Some(report(0.0, Severity::from_exceeded(false, false))));
        drop(tx);
        handle.await.unwrap();
    }
}
