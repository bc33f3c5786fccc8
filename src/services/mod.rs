//! Services - monitoring logic and state
//!
//! - `monitor` - Event loop owning the monitoring state
//! - `location_processor` - Per-fix direction, acceleration and status
//! - `geofence_manager` - Arms and disarms the directional zone sets
//! - `zone_transition` - Zone enter/dwell/exit handling and turn alerts
//! - `threshold` - Speed and acceleration limit evaluation
//! - `state` - Shared monitoring state

pub mod geofence_manager;
pub mod location_processor;
pub mod monitor;
pub mod state;
pub mod threshold;
pub mod zone_transition;

pub use geofence_manager::{DirectionalGeofenceManager, GeofencingProvider};
pub use location_processor::LocationStreamProcessor;
pub use monitor::Monitor;
pub use state::MonitoringState;
pub use threshold::ThresholdEvaluator;
pub use zone_transition::ZoneTransitionEngine;
