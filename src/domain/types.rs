//! Shared types for the geofence monitor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display placeholder for values that are unknown or not yet available
pub const PLACEHOLDER: &str = "-";

/// A WGS84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One reported location sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_mps: f64,
    pub timestamp_ms: u64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, speed_mps: f64, timestamp_ms: u64) -> Self {
        Self { latitude, longitude, speed_mps, timestamp_ms }
    }

    #[inline]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Speed converted from m/s to km/h
    #[inline]
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps * 18.0 / 5.0
    }
}

/// Travel direction a zone belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    South,
    North,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::South => "south",
            Direction::North => "north",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's current belief about the direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trajectory {
    #[default]
    Unknown,
    Northbound,
    Southbound,
}

impl Trajectory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trajectory::Unknown => "UNKNOWN",
            Trajectory::Northbound => "NORTHBOUND",
            Trajectory::Southbound => "SOUTHBOUND",
        }
    }

    /// Zone set that matches this trajectory, if one is known
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Trajectory::Unknown => None,
            Trajectory::Northbound => Some(Direction::North),
            Trajectory::Southbound => Some(Direction::South),
        }
    }
}

impl From<Direction> for Trajectory {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::South => Trajectory::Southbound,
            Direction::North => Trajectory::Northbound,
        }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geofence boundary transition reported by the platform provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    Enter,
    Dwell,
    Exit,
}

impl TransitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionType::Enter => "enter",
            TransitionType::Dwell => "dwell",
            TransitionType::Exit => "exit",
        }
    }
}

/// Bitmask of transitions requested for a registered zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMask(u8);

impl TransitionMask {
    pub const ENTER: Self = Self(1);
    pub const EXIT: Self = Self(2);
    pub const DWELL: Self = Self(4);
    pub const ALL: Self = Self(1 | 2 | 4);

    pub fn contains(&self, transition: TransitionType) -> bool {
        let bit = match transition {
            TransitionType::Enter => Self::ENTER.0,
            TransitionType::Exit => Self::EXIT.0,
            TransitionType::Dwell => Self::DWELL.0,
        };
        self.0 & bit != 0
    }
}

/// A geofence transition as delivered to the monitor
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTransition {
    pub zone_id: String,
    pub transition: TransitionType,
}

/// Inbound events consumed by the monitor loop
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Fix(LocationFix),
    Transition(ZoneTransition),
}

/// Alert classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    ZoneEnter,
    ZoneDwell,
    ZoneExit,
    ApproachingTurn,
}

/// Notification id used for zone transition alerts
pub const NOTIFICATION_ID_GEOFENCE_TRANSITION: u32 = 2001;
/// Notification id used for turn proximity alerts
pub const NOTIFICATION_ID_RIGHT_TURN: u32 = 2002;

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ZoneEnter => "zone_enter",
            AlertKind::ZoneDwell => "zone_dwell",
            AlertKind::ZoneExit => "zone_exit",
            AlertKind::ApproachingTurn => "approaching_turn",
        }
    }

    pub fn notification_id(&self) -> u32 {
        match self {
            AlertKind::ZoneEnter | AlertKind::ZoneDwell | AlertKind::ZoneExit => {
                NOTIFICATION_ID_GEOFENCE_TRANSITION
            }
            AlertKind::ApproachingTurn => NOTIFICATION_ID_RIGHT_TURN,
        }
    }
}

impl From<TransitionType> for AlertKind {
    fn from(transition: TransitionType) -> Self {
        match transition {
            TransitionType::Enter => AlertKind::ZoneEnter,
            TransitionType::Dwell => AlertKind::ZoneDwell,
            TransitionType::Exit => AlertKind::ZoneExit,
        }
    }
}

/// Alert handed to the notification collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    pub zone_id: String,
}

/// Speed/acceleration status classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusLabel {
    SpeedAndAccelLimit,
    SpeedLimit,
    AccelLimit,
    Normal,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::SpeedAndAccelLimit => "SPEED_AND_ACCEL_LIMIT",
            StatusLabel::SpeedLimit => "SPEED_LIMIT",
            StatusLabel::AccelLimit => "ACCEL_LIMIT",
            StatusLabel::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highlight for a single displayed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Highlight {
    Normal,
    Alert,
}

/// Which displayed values should be highlighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Severity {
    pub speed: Highlight,
    pub acceleration: Highlight,
}

impl Severity {
    pub fn from_exceeded(speed_exceeded: bool, accel_exceeded: bool) -> Self {
        let pick = |exceeded| if exceeded { Highlight::Alert } else { Highlight::Normal };
        Self { speed: pick(speed_exceeded), acceleration: pick(accel_exceeded) }
    }

    pub fn is_normal(&self) -> bool {
        self.speed == Highlight::Normal && self.acceleration == Highlight::Normal
    }
}

/// One status update per processed fix, consumed by the display
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub speed_kmh: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub acceleration_constant_time: f64,
    /// NaN when the fixes share a timestamp
    pub acceleration_delta_time: f64,
    pub trajectory: Trajectory,
    pub current_zone_label: String,
    pub within_zone: bool,
    pub status_label: StatusLabel,
    pub severity: Severity,
}

impl StatusReport {
    pub fn speed_display(&self) -> String {
        format!("{:.2}km/h", self.speed_kmh)
    }

    pub fn acceleration_display(&self) -> String {
        format!(
            "{} m/s\u{00B2} || {} m/s\u{00B2}",
            format_decimal(self.acceleration_constant_time),
            format_decimal(self.acceleration_delta_time)
        )
    }
}

/// Two-decimal rendering with a placeholder for undefined values
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        PLACEHOLDER.to_string()
    }
}
