//! Domain models - zones, fixes and monitoring outputs
//!
//! - `types` - fixes, directions, transitions, alerts and status reports
//! - `catalog` - the static geofence zone directory
//! - `geo` - great-circle distance

pub mod catalog;
pub mod geo;
pub mod types;

pub use catalog::{GeofenceCatalog, GeofenceZone};
