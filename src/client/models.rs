use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `location_name` the backend reports when it has no usable weather.
pub const OFFLINE_LOCATION: &str = "Offline";

/// `temp` the backend reports when the reading is missing.
pub const MISSING_TEMP: &str = "--";

// ---------------------------------------------------------------------------
// Status: GET /api/status
// ---------------------------------------------------------------------------

/// One poll of the probe rack. Superseded wholesale by the next poll.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct StatusSnapshot {
    /// Wall-clock time as formatted by the backend, e.g. `"14:05"`.
    pub time: String,
    /// Long date, e.g. `"Monday, January 05"`.
    pub date: String,
    #[serde(default)]
    pub sensors: Vec<Sensor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    pub temp: f64,
    pub status: SensorStatus,
}

/// Classification computed server-side from the active thresholds.
///
/// `Error` and `Missing` mark probe slots the backend could not read or that
/// have no probe attached. Any other value lands in `Unknown`, which renders
/// like `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Normal,
    Warning,
    Critical,
    Error,
    Missing,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensorStatus::Normal => "normal",
            SensorStatus::Warning => "warning",
            SensorStatus::Critical => "critical",
            SensorStatus::Error => "error",
            SensorStatus::Missing => "missing",
            SensorStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Weather: GET /api/weather
//
// Healthy:     { "temp": 71.3, "unit": "°F", "code": 2, "location_name": "Oslo" }
// Degraded:    { "temp": "--", "unit": "", "code": null, "location_name": "Offline" }
// No reading:  { "status": "unavailable" }   (or a bare `null`)
// ---------------------------------------------------------------------------

/// A temperature that is either numeric or a display string such as `"--"`.
///
/// Number must come before Text so that `71.3` never lands in the string arm.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(untagged)]
pub enum WeatherTemp {
    Value(f64),
    Text(String),
}

impl fmt::Display for WeatherTemp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherTemp::Value(v) => write!(f, "{v}"),
            WeatherTemp::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub temp: Option<WeatherTemp>,
    #[serde(default)]
    pub unit: String,
    /// Open-Meteo weather code.
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub location_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl WeatherSnapshot {
    /// True when the backend used one of its sentinel values instead of a
    /// real reading. Such a snapshot is still rendered, just as offline.
    pub fn is_degraded(&self) -> bool {
        self.location_name == OFFLINE_LOCATION
            || matches!(&self.temp, Some(WeatherTemp::Text(t)) if t == MISSING_TEMP)
    }
}

/// Body of `GET /api/weather` before it is narrowed to `Option<WeatherSnapshot>`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WeatherPayload {
    Unavailable {
        #[serde(rename = "status")]
        _status: serde::de::IgnoredAny,
    },
    Reading(WeatherSnapshot),
}

impl WeatherPayload {
    pub(crate) fn into_snapshot(self) -> Option<WeatherSnapshot> {
        match self {
            WeatherPayload::Reading(w) => Some(w),
            WeatherPayload::Unavailable { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings: GET /api/settings, POST /api/settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for Thresholds {
    /// Used by the settings form when the backend has no global entry.
    fn default() -> Self {
        Self { warning: 26.0, critical: 30.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct TempThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<Thresholds>,
    /// Per-sensor overrides keyed by sensor id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<BTreeMap<String, Thresholds>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct LocationConfig {
    #[serde(default)]
    pub auto: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The appliance configuration as owned by the backend.
///
/// The dashboard only ever holds a copy: it is reloaded in full whenever the
/// settings surface opens and patched locally after a successful save.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct RemoteConfig {
    #[serde(default)]
    pub ntp_server: String,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub mock_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_brightness: Option<u8>,
    /// Set by the backend when the probe hardware could not be initialised.
    #[serde(default)]
    pub hw_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_unit: Option<String>,
    #[serde(default)]
    pub temp_thresholds: TempThresholds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_names: Option<BTreeMap<String, String>>,
}

/// Request body for `POST /api/settings`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct SettingsUpdate {
    pub ntp_server: String,
    pub location_auto: bool,
    pub threshold_warning: f64,
    pub threshold_critical: f64,
    /// `"global"` or a concrete sensor id.
    pub sensor_id: String,
    /// Only sent for a per-sensor scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_name: Option<String>,
    pub mock_mode: bool,
    pub led_brightness: u8,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
