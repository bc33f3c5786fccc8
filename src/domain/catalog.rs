//! Static directory of directional geofence zones
//!
//! Each zone sits ahead of a right turn along the corridor and belongs to
//! exactly one travel direction. The built-in catalog covers Commonwealth
//! Avenue, Quezon City; deployments can replace it through `[[zones]]`
//! entries in the config file.

use crate::domain::types::{Direction, LatLng};
use crate::infra::config::Config;
use anyhow::{bail, Context};
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// A named circular region tied to one direction and a downstream turn
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeofenceZone {
    pub id: String,
    pub center: LatLng,
    pub radius_m: f64,
    pub direction: Direction,
    pub turn_waypoint: LatLng,
    /// Location name used in turn alerts ("Nearing <label> right turn")
    pub turn_label: String,
}

impl GeofenceZone {
    fn new(
        id: &str,
        center: (f64, f64),
        radius_m: f64,
        direction: Direction,
        turn_waypoint: (f64, f64),
        turn_label: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            center: LatLng::new(center.0, center.1),
            radius_m,
            direction,
            turn_waypoint: LatLng::new(turn_waypoint.0, turn_waypoint.1),
            turn_label: turn_label.to_string(),
        }
    }
}

/// Immutable zone directory with lookup by id
#[derive(Debug, Clone)]
pub struct GeofenceCatalog {
    zones: Vec<GeofenceZone>,
    by_id: FxHashMap<String, usize>,
}

impl GeofenceCatalog {
    /// Build a catalog, rejecting duplicate ids and non-positive radii
    pub fn from_zones(zones: Vec<GeofenceZone>) -> anyhow::Result<Self> {
        let mut by_id = FxHashMap::default();
        for (idx, zone) in zones.iter().enumerate() {
            if zone.radius_m.is_nan() || zone.radius_m <= 0.0 {
                bail!("zone {} has non-positive radius {}", zone.id, zone.radius_m);
            }
            if by_id.insert(zone.id.clone(), idx).is_some() {
                bail!("duplicate zone id {}", zone.id);
            }
        }
        Ok(Self { zones, by_id })
    }

    /// Built-in Commonwealth Avenue corridor
    pub fn commonwealth() -> Self {
        use Direction::{North, South};

        let zones = vec![
            // Southbound
            GeofenceZone::new("SB_SAN_SIMON", (14.7185, 121.0735), 200.0, South, (14.7170, 121.0738), "San Simon"),
            GeofenceZone::new("SB_DON_ANTONIO", (14.6845, 121.0845), 200.0, South, (14.6832, 121.0850), "Don Antonio"),
            GeofenceZone::new("SB_LUZON_AVE", (14.6695, 121.0790), 200.0, South, (14.6684, 121.0782), "Luzon Ave"),
            GeofenceZone::new("SB_TANDANG_SORA", (14.6605, 121.0705), 150.0, South, (14.6596, 121.0697), "Tandang Sora"),
            GeofenceZone::new("SB_CENTRAL_AVE", (14.6560, 121.0640), 150.0, South, (14.6552, 121.0633), "Central Ave"),
            // Northbound
            GeofenceZone::new("NB_UNIVERSITY_AVE", (14.6540, 121.0618), 150.0, North, (14.6549, 121.0626), "University Ave"),
            GeofenceZone::new("NB_TANDANG_SORA", (14.6588, 121.0690), 150.0, North, (14.6597, 121.0698), "Tandang Sora"),
            GeofenceZone::new("NB_ZUZUARREGUI_ST", (14.6712, 121.0806), 200.0, North, (14.6722, 121.0813), "Zuzuarregui St"),
            GeofenceZone::new("NB_AMSTERDAM_AVE", (14.6868, 121.0858), 200.0, North, (14.6879, 121.0860), "Amsterdam Ave"),
            GeofenceZone::new("NB_BATASAN_RD", (14.6935, 121.0875), 200.0, North, (14.6946, 121.0878), "Batasan"),
            GeofenceZone::new("NB_IBP_RD", (14.6990, 121.0890), 200.0, North, (14.7001, 121.0893), "IBP Road"),
        ];

        let mut by_id = FxHashMap::default();
        for (idx, zone) in zones.iter().enumerate() {
            by_id.insert(zone.id.clone(), idx);
        }
        Self { zones, by_id }
    }

    /// Configured `[[zones]]` if any, otherwise the built-in corridor
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if config.zones().is_empty() {
            return Ok(Self::commonwealth());
        }
        Self::from_zones(config.zones().to_vec())
            .with_context(|| format!("Invalid [[zones]] in {}", config.config_file()))
    }

    pub fn get(&self, id: &str) -> Option<&GeofenceZone> {
        self.by_id.get(id).map(|&idx| &self.zones[idx])
    }

    /// Zones belonging to a travel direction, in catalog order
    pub fn zones_for(&self, direction: Direction) -> impl Iterator<Item = &GeofenceZone> {
        self.zones.iter().filter(move |z| z.direction == direction)
    }

    pub fn zones(&self) -> &[GeofenceZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl Default for GeofenceCatalog {
    fn default() -> Self {
        Self::commonwealth()
    }
}
