//! Configuration loading from TOML files
//!
//! The file is selected with `--config` (default `config/dev.toml`).
//! Every section is optional; missing values fall back to the defaults the
//! monitor was tuned with (1 s fixes, 50 m turn radius, 40/60 km/h bounds).

use crate::domain::catalog::GeofenceZone;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Speed and acceleration bounds for one context
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ThresholdConfig {
    pub speed_kmh: f64,
    pub accel_mps2: f64,
}

fn default_within_zone_thresholds() -> ThresholdConfig {
    ThresholdConfig { speed_kmh: 40.0, accel_mps2: 1.96 }
}

fn default_outside_zone_thresholds() -> ThresholdConfig {
    ThresholdConfig { speed_kmh: 60.0, accel_mps2: 1.47 }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    /// Nominal fix interval (0 replays as fast as possible)
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// JSONL trace replayed as the location source
    #[serde(default)]
    pub trace_file: Option<String>,
    /// Capacity of the inbound fix/transition channel
    #[serde(default = "default_event_queue_size")]
    pub event_queue_size: usize,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            trace_file: None,
            event_queue_size: default_event_queue_size(),
        }
    }
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_event_queue_size() -> usize {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_within_zone_thresholds")]
    pub within_zone: ThresholdConfig,
    #[serde(default = "default_outside_zone_thresholds")]
    pub outside_zone: ThresholdConfig,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            within_zone: default_within_zone_thresholds(),
            outside_zone: default_outside_zone_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProximityConfig {
    /// Distance to the turn waypoint that triggers a turn alert
    #[serde(default = "default_proximity_radius_m")]
    pub radius_m: f64,
    /// Minimum gap between turn alerts for one zone (0 = alert on every fix)
    #[serde(default)]
    pub cooldown_ms: u64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self { radius_m: default_proximity_radius_m(), cooldown_ms: 0 }
    }
}

fn default_proximity_radius_m() -> f64 {
    50.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeofencingConfig {
    /// Time inside a zone before the provider reports DWELL
    #[serde(default = "default_loitering_delay_ms")]
    pub loitering_delay_ms: u64,
    /// Provider-side registration limit
    #[serde(default = "default_max_geofences")]
    pub max_geofences: usize,
    #[serde(default = "default_command_queue_size")]
    pub command_queue_size: usize,
}

impl Default for GeofencingConfig {
    fn default() -> Self {
        Self {
            loitering_delay_ms: default_loitering_delay_ms(),
            max_geofences: default_max_geofences(),
            command_queue_size: default_command_queue_size(),
        }
    }
}

fn default_loitering_delay_ms() -> u64 {
    5000
}

fn default_max_geofences() -> usize {
    100
}

fn default_command_queue_size() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Optional JSONL file receiving every alert
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_notification_queue_size")]
    pub queue_size: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { file: None, queue_size: default_notification_queue_size() }
    }
}

fn default_notification_queue_size() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

fn default_metrics_interval_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub proximity: ProximityConfig,
    #[serde(default)]
    pub geofencing: GeofencingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Replaces the built-in catalog when non-empty
    #[serde(default)]
    pub zones: Vec<GeofenceZone>,
}

impl TomlConfig {
    /// Channel capacities and the metrics period must be non-zero
    fn validate(&self) -> anyhow::Result<()> {
        if self.location.event_queue_size == 0 {
            bail!("location.event_queue_size must be at least 1");
        }
        if self.geofencing.command_queue_size == 0 {
            bail!("geofencing.command_queue_size must be at least 1");
        }
        if self.notifications.queue_size == 0 {
            bail!("notifications.queue_size must be at least 1");
        }
        if self.metrics.interval_secs == 0 {
            bail!("metrics.interval_secs must be at least 1");
        }
        Ok(())
    }
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    config_file: String,
    location_update_interval_ms: u64,
    trace_file: Option<String>,
    event_queue_size: usize,
    within_zone_thresholds: ThresholdConfig,
    outside_zone_thresholds: ThresholdConfig,
    proximity_radius_m: f64,
    proximity_cooldown_ms: u64,
    loitering_delay_ms: u64,
    max_geofences: usize,
    geofence_command_queue_size: usize,
    notifications_file: Option<String>,
    notification_queue_size: usize,
    metrics_interval_secs: u64,
    zones: Vec<GeofenceZone>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            config_file,
            location_update_interval_ms: toml_config.location.update_interval_ms,
            trace_file: toml_config.location.trace_file,
            event_queue_size: toml_config.location.event_queue_size,
            within_zone_thresholds: toml_config.thresholds.within_zone,
            outside_zone_thresholds: toml_config.thresholds.outside_zone,
            proximity_radius_m: toml_config.proximity.radius_m,
            proximity_cooldown_ms: toml_config.proximity.cooldown_ms,
            loitering_delay_ms: toml_config.geofencing.loitering_delay_ms,
            max_geofences: toml_config.geofencing.max_geofences,
            geofence_command_queue_size: toml_config.geofencing.command_queue_size,
            notifications_file: toml_config.notifications.file,
            notification_queue_size: toml_config.notifications.queue_size,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            zones: toml_config.zones,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content, path.display().to_string())
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str, config_file: String) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        toml_config.validate()?;
        Ok(Self::from_toml(toml_config, config_file))
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn location_update_interval_ms(&self) -> u64 {
        self.location_update_interval_ms
    }

    pub fn trace_file(&self) -> Option<&str> {
        self.trace_file.as_deref()
    }

    pub fn event_queue_size(&self) -> usize {
        self.event_queue_size
    }

    pub fn within_zone_thresholds(&self) -> ThresholdConfig {
        self.within_zone_thresholds
    }

    pub fn outside_zone_thresholds(&self) -> ThresholdConfig {
        self.outside_zone_thresholds
    }

    pub fn proximity_radius_m(&self) -> f64 {
        self.proximity_radius_m
    }

    pub fn proximity_cooldown_ms(&self) -> u64 {
        self.proximity_cooldown_ms
    }

    pub fn loitering_delay_ms(&self) -> u64 {
        self.loitering_delay_ms
    }

    pub fn max_geofences(&self) -> usize {
        self.max_geofences
    }

    pub fn geofence_command_queue_size(&self) -> usize {
        self.geofence_command_queue_size
    }

    pub fn notifications_file(&self) -> Option<&str> {
        self.notifications_file.as_deref()
    }

    pub fn notification_queue_size(&self) -> usize {
        self.notification_queue_size
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    /// Catalog override; empty means use the built-in corridor
    pub fn zones(&self) -> &[GeofenceZone] {
        &self.zones
    }

    /// Override the trace file (command line takes precedence over TOML)
    pub fn with_trace_file(mut self, path: impl Into<String>) -> Self {
        self.trace_file = Some(path.into());
        self
    }

    /// Builder method for tests to set the turn alert cooldown
    #[cfg(test)]
    pub fn with_proximity_cooldown_ms(mut self, ms: u64) -> Self {
        self.proximity_cooldown_ms = ms;
        self
    }

    /// Builder method for tests to set the dwell delay
    #[cfg(test)]
    pub fn with_loitering_delay_ms(mut self, ms: u64) -> Self {
        self.loitering_delay_ms = ms;
        self
    }

    /// Builder method for tests to set the provider registration limit
    #[cfg(test)]
    pub fn with_max_geofences(mut self, max: usize) -> Self {
        self.max_geofences = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Direction;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.location_update_interval_ms(), 1000);
        assert_eq!(config.within_zone_thresholds().speed_kmh, 40.0);
        assert_eq!(config.within_zone_thresholds().accel_mps2, 1.96);
        assert_eq!(config.outside_zone_thresholds().speed_kmh, 60.0);
        assert_eq!(config.outside_zone_thresholds().accel_mps2, 1.47);
        assert_eq!(config.proximity_radius_m(), 50.0);
        assert_eq!(config.proximity_cooldown_ms(), 0);
        assert_eq!(config.max_geofences(), 100);
        assert!(config.zones().is_empty());
        assert!(config.trace_file().is_none());
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config = Config::from_toml_str("", "inline".to_string()).unwrap();
        assert_eq!(config.config_file(), "inline");
        assert_eq!(config.metrics_interval_secs(), 10);
        assert_eq!(config.loitering_delay_ms(), 5000);
    }

    #[test]
    fn test_partial_thresholds_section() {
        let toml = r#"
[thresholds.within_zone]
speed_kmh = 30.0
accel_mps2 = 1.5
"#;
        let config = Config::from_toml_str(toml, "inline".to_string()).unwrap();
        assert_eq!(config.within_zone_thresholds().speed_kmh, 30.0);
        assert_eq!(config.outside_zone_thresholds().speed_kmh, 60.0);
    }

    #[test]
    fn test_zone_override() {
        let toml = r#"
[[zones]]
id = "SB_TEST_ZONE"
center = { lat = 14.70, lon = 121.07 }
radius_m = 120.0
direction = "south"
turn_waypoint = { lat = 14.699, lon = 121.07 }
turn_label = "Test"
"#;
        let config = Config::from_toml_str(toml, "inline".to_string()).unwrap();
        assert_eq!(config.zones().len(), 1);
        assert_eq!(config.zones()[0].direction, Direction::South);
        assert_eq!(config.zones()[0].radius_m, 120.0);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml_str("[location\nupdate", "x".to_string()).is_err());
    }

    #[test]
    fn test_zero_queue_sizes_are_rejected() {
        for toml in [
            "[location]\nevent_queue_size = 0\n",
            "[geofencing]\ncommand_queue_size = 0\n",
            "[notifications]\nqueue_size = 0\n",
            "[metrics]\ninterval_secs = 0\n",
        ] {
            let err = Config::from_toml_str(toml, "inline".to_string()).unwrap_err();
            assert!(err.to_string().contains("must be at least 1"), "{toml}: {err}");
        }
    }

    #[test]
    fn test_trace_override() {
        let config = Config::default().with_trace_file("traces/a.jsonl");
        assert_eq!(config.trace_file(), Some("traces/a.jsonl"));
    }
}
