//! Alert notifications
//!
//! The monitor hands alerts to `AlertSender`, which never blocks; a full
//! queue drops the alert and counts it. `NotificationWorker` posts each
//! alert to the log and, when configured, appends it to a JSONL file.

use crate::domain::types::AlertEvent;
use crate::infra::metrics::Metrics;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One posted notification, as written to the notifications file
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub id: String,
    pub notification_id: u32,
    pub kind: &'static str,
    pub title: String,
    pub description: String,
    pub zone_id: String,
    pub posted_at: String,
}

impl NotificationRecord {
    pub fn from_alert(alert: &AlertEvent) -> Self {
        let posted_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("-"));
        Self {
            id: Uuid::now_v7().to_string(),
            notification_id: alert.kind.notification_id(),
            kind: alert.kind.as_str(),
            title: alert.title.clone(),
            description: alert.description.clone(),
            zone_id: alert.zone_id.clone(),
            posted_at,
        }
    }
}

/// Non-blocking alert handle held by the monitor
#[derive(Clone)]
pub struct AlertSender {
    tx: mpsc::Sender<AlertEvent>,
    metrics: Arc<Metrics>,
}

impl AlertSender {
    pub fn new(tx: mpsc::Sender<AlertEvent>, metrics: Arc<Metrics>) -> Self {
        Self { tx, metrics }
    }

    pub fn send(&self, alert: AlertEvent) {
        match self.tx.try_send(alert) {
            Ok(()) => self.metrics.record_alert(),
            Err(TrySendError::Full(alert)) => {
                self.metrics.record_alert_dropped();
                warn!(kind = %alert.kind.as_str(), "alert_queue_full");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("alert_channel_closed");
            }
        }
    }
}

/// Create the alert channel
pub fn create_alert_channel(
    buffer_size: usize,
    metrics: Arc<Metrics>,
) -> (AlertSender, mpsc::Receiver<AlertEvent>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AlertSender::new(tx, metrics), rx)
}

/// Appends notification records to a JSONL file
pub struct NotificationLog {
    file_path: String,
}

impl NotificationLog {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "notification_log_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Returns true if the record was written
    pub fn write(&self, record: &NotificationRecord) -> bool {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "notification_serialize_failed");
                return false;
            }
        };

        match self.append_line(&line) {
            Ok(()) => true,
            Err(e) => {
                error!(file = %self.file_path, error = %e, "notification_write_failed");
                false
            }
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Posts alerts until every sender is dropped
pub struct NotificationWorker {
    rx: mpsc::Receiver<AlertEvent>,
    log: Option<NotificationLog>,
}

impl NotificationWorker {
    pub fn new(rx: mpsc::Receiver<AlertEvent>, file_path: Option<&str>) -> Self {
        Self { rx, log: file_path.map(NotificationLog::new) }
    }

    pub async fn run(mut self) {
        info!(file = %self.log.is_some(), "notification_worker_started");

        while let Some(alert) = self.rx.recv().await {
            self.post(&alert);
        }

        info!("notification_worker_stopped");
    }

    fn post(&self, alert: &AlertEvent) {
        let record = NotificationRecord::from_alert(alert);
        info!(
            notification_id = %record.notification_id,
            kind = %record.kind,
            title = %record.title,
            description = %record.description,
            "notification_posted"
        );
        if let Some(log) = &self.log {
            log.write(&record);
        }
    }
}
