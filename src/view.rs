//! Render-ready view models.
//!
//! Pure functions of the poller and settings state. A renderer only has to map
//! these to pixels; all text defaults and classification happen here.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    client::{
        models::{Sensor, SensorStatus, StatusSnapshot, WeatherSnapshot},
        DashboardApi,
    },
    history::HistoryPoint,
    settings::{FormValues, Notice, SettingsPhase, SettingsSync, GLOBAL_SCOPE},
    status::StatusFeed,
};

/// Sensor slots the grid reserves before the first snapshot arrives.
pub const PLACEHOLDER_SLOTS: usize = 5;

/// Series names used when fewer than three sensors are known.
pub const DEFAULT_SERIES_NAMES: [&str; 3] = ["Probe 1", "Probe 2", "Probe 3"];

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardView {
    pub clock: ClockView,
    /// `None` until the first weather reading, and when the backend had none.
    pub weather: Option<WeatherView>,
    pub sensors: Vec<SensorCardView>,
    /// Empty grid slots to draw while no snapshot has arrived.
    pub placeholders: usize,
    pub graph: GraphView,
    /// RFC 3339 time of the last successful status poll.
    pub last_updated: Option<String>,
}

impl DashboardView {
    pub fn build(status: &StatusFeed, weather: Option<&WeatherSnapshot>) -> Self {
        let snapshot = status.snapshot.as_ref();
        Self {
            clock: ClockView::from_snapshot(snapshot),
            weather: weather.map(WeatherView::from_snapshot),
            sensors: snapshot
                .map(|s| s.sensors.iter().map(SensorCardView::from_sensor).collect())
                .unwrap_or_default(),
            placeholders: if snapshot.is_some() { 0 } else { PLACEHOLDER_SLOTS },
            graph: GraphView::build(snapshot, status.history.to_vec()),
            last_updated: status.last_updated.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ClockView {
    pub time: String,
    pub weekday: String,
    pub day: String,
}

impl ClockView {
    pub fn from_snapshot(snapshot: Option<&StatusSnapshot>) -> Self {
        let Some(s) = snapshot else {
            return Self {
                time: "--:--".into(),
                weekday: "...".into(),
                day: "Loading...".into(),
            };
        };

        // "Monday, January 05" → "Monday" / "January 05"
        let (weekday, day) = match s.date.split_once(',') {
            Some((w, d)) => (w.trim(), d.trim()),
            None => (s.date.trim(), ""),
        };
        let time = if s.time.is_empty() { "--:--" } else { s.time.as_str() };

        Self {
            time: time.to_owned(),
            weekday: weekday.to_owned(),
            day: day.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Icon family for an Open-Meteo weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Unknown,
    Clear,
    Cloudy,
    Rain,
    Snow,
    Thunderstorm,
}

impl WeatherCondition {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            None => WeatherCondition::Unknown,
            Some(c) if c <= 1 => WeatherCondition::Clear,
            // Overcast and fog share the cloud icon.
            Some(c) if c <= 48 => WeatherCondition::Cloudy,
            Some(c) if c <= 67 => WeatherCondition::Rain,
            Some(c) if c <= 77 => WeatherCondition::Snow,
            Some(c) if c <= 82 => WeatherCondition::Rain,
            Some(c) if c <= 86 => WeatherCondition::Snow,
            Some(c) if c <= 99 => WeatherCondition::Thunderstorm,
            Some(_) => WeatherCondition::Clear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WeatherView {
    pub condition: WeatherCondition,
    /// e.g. `"71.3°F"`, or `"--"` for a missing reading.
    pub temperature: String,
    pub location_name: String,
    /// The backend reported a sentinel instead of a reading.
    pub offline: bool,
}

impl WeatherView {
    pub fn from_snapshot(w: &WeatherSnapshot) -> Self {
        let temp = w.temp.as_ref().map(ToString::to_string).unwrap_or_default();
        Self {
            condition: WeatherCondition::from_code(w.code),
            temperature: format!("{temp}{}", w.unit),
            location_name: w.location_name.clone(),
            offline: w.is_degraded(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SensorCardView {
    pub id: String,
    pub name: String,
    pub temperature: String,
    pub status: SensorStatus,
    /// Critical probes get the pulsing banner.
    pub alert: bool,
}

impl SensorCardView {
    pub fn from_sensor(s: &Sensor) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            temperature: format!("{}°F", s.temp),
            status: s.status,
            alert: s.status == SensorStatus::Critical,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GraphView {
    /// Legend names for `s1`, `s2`, `s3`.
    pub series: Vec<String>,
    pub average_label: String,
    pub points: Vec<HistoryPoint>,
}

impl GraphView {
    pub fn build(snapshot: Option<&StatusSnapshot>, points: Vec<HistoryPoint>) -> Self {
        let name = |i: usize| {
            snapshot
                .and_then(|s| s.sensors.get(i))
                .map(|s| s.name.clone())
                .unwrap_or_else(|| DEFAULT_SERIES_NAMES[i].to_owned())
        };
        Self {
            series: (0..3).map(name).collect(),
            average_label: "Average".into(),
            points,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScopeOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NoticeView {
    /// `"saved"` or `"save_failed"`.
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SettingsView {
    pub phase: SettingsPhase,
    pub scopes: Vec<ScopeOption>,
    pub form: FormValues,
    /// The name field only exists for a sensor scope.
    pub show_sensor_name: bool,
    pub mock_toggle_enabled: bool,
    pub notice: Option<NoticeView>,
}

impl SettingsView {
    pub fn build<A: DashboardApi>(sync: &SettingsSync<A>) -> Self {
        let scopes = std::iter::once(ScopeOption {
            value: GLOBAL_SCOPE.into(),
            label: "Global Defaults".into(),
        })
        .chain(sync.sensors().iter().map(|s| ScopeOption {
            value: s.id.clone(),
            label: format!("{} ({})", s.name, s.id),
        }))
        .collect();

        Self {
            phase: sync.phase(),
            scopes,
            form: sync.form().clone(),
            show_sensor_name: !sync.form().scope.is_global(),
            mock_toggle_enabled: sync.mock_toggle_enabled(),
            notice: sync.notice().map(|n| NoticeView {
                kind: match n {
                    Notice::Saved(_) => "saved".into(),
                    Notice::SaveFailed => "save_failed".into(),
                },
                message: n.message(),
            }),
        }
    }
}
