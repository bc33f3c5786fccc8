//! Trace-replay location source
//!
//! Reads a JSONL trace of fixes (and optionally scripted geofence
//! transitions) and replays it into the monitor at the configured location
//! update interval. Each replayed fix is also handed to the geofencing
//! provider so it can raise its own transitions.

use crate::domain::types::{LocationFix, MonitorEvent, TransitionType, ZoneTransition};
use crate::io::geofencing::GeofencingClient;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// One line of a trace file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TraceRecord {
    Fix { lat: f64, lon: f64, speed: f64, ts: u64 },
    Transition { zone_id: String, transition: TransitionType },
}

impl TraceRecord {
    pub fn into_event(self) -> MonitorEvent {
        match self {
            TraceRecord::Fix { lat, lon, speed, ts } => {
                MonitorEvent::Fix(LocationFix::new(lat, lon, speed, ts))
            }
            TraceRecord::Transition { zone_id, transition } => {
                MonitorEvent::Transition(ZoneTransition { zone_id, transition })
            }
        }
    }
}

/// Parse trace content, skipping blank lines, `#` comments and bad lines
pub fn parse_trace(content: &str) -> Vec<TraceRecord> {
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<TraceRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(line = %(idx + 1), error = %e, "trace_line_skipped"),
        }
    }

    records
}

pub fn load_trace<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TraceRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file: {}", path.display()))?;
    let records = parse_trace(&content);
    info!(file = %path.display(), records = %records.len(), "trace_loaded");
    Ok(records)
}

/// Replays a trace into the monitor
pub struct TraceReplay {
    records: Vec<TraceRecord>,
    update_interval_ms: u64,
    event_tx: mpsc::Sender<MonitorEvent>,
    geofencer: Option<GeofencingClient>,
}

impl TraceReplay {
    pub fn new(
        records: Vec<TraceRecord>,
        update_interval_ms: u64,
        event_tx: mpsc::Sender<MonitorEvent>,
        geofencer: Option<GeofencingClient>,
    ) -> Self {
        Self { records, update_interval_ms, event_tx, geofencer }
    }

    /// Replay every record, pacing fixes; returns the number of fixes sent.
    /// Stops early on shutdown or when the monitor goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> usize {
        let total = self.records.len();
        let mut ticker = (self.update_interval_ms > 0).then(|| {
            let mut ticker = interval(Duration::from_millis(self.update_interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut fixes_sent = 0usize;

        info!(records = %total, interval_ms = %self.update_interval_ms, "trace_replay_started");

        for record in self.records {
            let event = record.into_event();

            if let MonitorEvent::Fix(_) = event {
                if let Some(ticker) = ticker.as_mut() {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = shutdown.changed() => {
                            info!(fixes_sent = %fixes_sent, "trace_replay_interrupted");
                            return fixes_sent;
                        }
                    }
                }
            }

            if *shutdown.borrow() {
                info!(fixes_sent = %fixes_sent, "trace_replay_interrupted");
                return fixes_sent;
            }

            let observed = match &event {
                MonitorEvent::Fix(fix) => Some(*fix),
                MonitorEvent::Transition(t) => {
                    debug!(zone_id = %t.zone_id, transition = %t.transition.as_str(), "trace_transition");
                    None
                }
            };

            if self.event_tx.send(event).await.is_err() {
                warn!("trace_replay_monitor_gone");
                return fixes_sent;
            }

            if let Some(fix) = observed {
                fixes_sent += 1;
                if let Some(geofencer) = &self.geofencer {
                    geofencer.observe(fix);
                }
            }
        }

        info!(fixes_sent = %fixes_sent, "trace_replay_completed");
        fixes_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRACE: &str = r#"
# southbound through San Simon
{"type":"fix","lat":14.7300,"lon":121.0720,"speed":16.0,"ts":0}
{"type":"fix","lat":14.7290,"lon":121.0721,"speed":17.0,"ts":1000}

{"type":"transition","zone_id":"SB_SAN_SIMON","transition":"enter"}
{"type":"fix","lat":"oops"}
not json at all
{"type":"teleport","lat":1.0}
"#;

    #[test]
    fn test_parse_skips_comments_blank_and_malformed() {
        let records = parse_trace(TRACE);
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            TraceRecord::Fix { lat: 14.7300, lon: 121.0720, speed: 16.0, ts: 0 }
        );
        assert_eq!(
            records[2],
            TraceRecord::Transition {
                zone_id: "SB_SAN_SIMON".to_string(),
                transition: TransitionType::Enter,
            }
        );
    }

    #[test]
    fn test_load_trace_missing_file() {
        let err = load_trace("/nonexistent/trace.jsonl").unwrap_err();
        assert!(err.to_string().contains("Failed to read trace file"));
    }

    #[test]
    fn test_load_trace_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TRACE.as_bytes()).unwrap();
        assert_eq!(load_trace(file.path()).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_replay_forwards_events_in_order() {
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let replay = TraceReplay::new(parse_trace(TRACE), 0, event_tx, None);
        assert_eq!(replay.run(shutdown_rx).await, 2);

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], MonitorEvent::Fix(f) if f.timestamp_ms == 0));
        assert!(matches!(events[1], MonitorEvent::Fix(f) if f.timestamp_ms == 1000));
        assert!(matches!(&events[2], MonitorEvent::Transition(t) if t.zone_id == "SB_SAN_SIMON"));
    }

    #[tokio::test]
    async fn test_replay_stops_on_shutdown() {
        let (event_tx, _event_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let replay = TraceReplay::new(parse_trace(TRACE), 0, event_tx, None);
        assert_eq!(replay.run(shutdown_rx).await, 0);
    }
}
