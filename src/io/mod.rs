//! IO modules - stand-ins for the device collaborators
//!
//! - `trace` - replays a JSONL location trace into the monitor
//! - `geofencing` - simulated platform geofencing provider
//! - `notification` - alert delivery to the log and an optional JSONL file
//! - `display` - renders the latest status report to the log

pub mod display;
pub mod geofencing;
pub mod notification;
pub mod trace;

pub use display::run_display;
pub use geofencing::{create_geofencer, GeofencingClient, SimulatedGeofencer};
pub use notification::{create_alert_channel, AlertSender, NotificationWorker};
pub use trace::{load_trace, TraceRecord, TraceReplay};
