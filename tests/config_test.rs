//! Integration tests for configuration loading

use geofence_monitor::domain::types::Direction;
use geofence_monitor::domain::GeofenceCatalog;
use geofence_monitor::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[location]
update_interval_ms = 500
trace_file = "traces/test.jsonl"
event_queue_size = 32

[thresholds.within_zone]
speed_kmh = 30.0
accel_mps2 = 1.5

[thresholds.outside_zone]
speed_kmh = 80.0
accel_mps2 = 2.0

[proximity]
radius_m = 75.0
cooldown_ms = 10000

[geofencing]
loitering_delay_ms = 3000
max_geofences = 20
command_queue_size = 16

[notifications]
file = "out/alerts.jsonl"
queue_size = 8

[metrics]
interval_secs = 30
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.location_update_interval_ms(), 500);
    assert_eq!(config.trace_file(), Some("traces/test.jsonl"));
    assert_eq!(config.event_queue_size(), 32);
    assert_eq!(config.within_zone_thresholds().speed_kmh, 30.0);
    assert_eq!(config.outside_zone_thresholds().accel_mps2, 2.0);
    assert_eq!(config.proximity_radius_m(), 75.0);
    assert_eq!(config.proximity_cooldown_ms(), 10000);
    assert_eq!(config.loitering_delay_ms(), 3000);
    assert_eq!(config.max_geofences(), 20);
    assert_eq!(config.geofence_command_queue_size(), 16);
    assert_eq!(config.notifications_file(), Some("out/alerts.jsonl"));
    assert_eq!(config.notification_queue_size(), 8);
    assert_eq!(config.metrics_interval_secs(), 30);
    assert!(config.zones().is_empty());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.within_zone_thresholds().speed_kmh, 40.0);
    assert_eq!(config.within_zone_thresholds().accel_mps2, 1.96);
    assert_eq!(config.outside_zone_thresholds().speed_kmh, 60.0);
    assert_eq!(config.outside_zone_thresholds().accel_mps2, 1.47);
    assert_eq!(config.proximity_radius_m(), 50.0);
    assert_eq!(config.proximity_cooldown_ms(), 0);
    assert_eq!(config.trace_file(), None);
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[location\nupdate_interval_ms = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
    let config = Config::load_from_path(temp_file.path().to_str().unwrap());
    assert_eq!(config.location_update_interval_ms(), 1000);
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[proximity]\ncooldown_ms = 4000\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.proximity_cooldown_ms(), 4000);
    assert_eq!(config.proximity_radius_m(), 50.0);
    assert_eq!(config.max_geofences(), 100);
}

#[test]
fn test_zones_override_builtin_catalog() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[[zones]]
id = "SB_MAIN_ST"
center = { lat = 10.0, lon = 120.0 }
radius_m = 120.0
direction = "south"
turn_waypoint = { lat = 9.9995, lon = 120.0 }
turn_label = "Main St"

[[zones]]
id = "NB_OAK_AVE"
center = { lat = 10.01, lon = 120.0 }
radius_m = 120.0
direction = "north"
turn_waypoint = { lat = 10.0105, lon = 120.0 }
turn_label = "Oak Ave"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    let catalog = GeofenceCatalog::from_config(&config).unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.zones_for(Direction::South).count(), 1);
    assert_eq!(catalog.get("NB_OAK_AVE").unwrap().turn_label, "Oak Ave");
}

#[test]
fn test_duplicate_configured_zones_are_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let zone = r#"
[[zones]]
id = "SB_MAIN_ST"
center = { lat = 10.0, lon = 120.0 }
radius_m = 120.0
direction = "south"
turn_waypoint = { lat = 9.9995, lon = 120.0 }
turn_label = "Main St"
"#;

    temp_file.write_all(format!("{zone}{zone}").as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    let err = GeofenceCatalog::from_config(&config).unwrap_err();
    assert!(format!("{err:#}").contains("duplicate zone id SB_MAIN_ST"));
}

#[test]
fn test_zero_queue_size_falls_back_to_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[geofencing]\ncommand_queue_size = 0\nmax_geofences = 20\n")
        .unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("geofencing.command_queue_size must be at least 1"));

    let config = Config::load_from_path(temp_file.path().to_str().unwrap());
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.geofence_command_queue_size(), 64);
    assert_eq!(config.max_geofences(), 100);
}
