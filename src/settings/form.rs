use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::client::models::{RemoteConfig, SettingsUpdate, Thresholds};

/// Wire identifier of the global scope.
pub const GLOBAL_SCOPE: &str = "global";

/// Default LED brightness when the backend does not report one.
pub const DEFAULT_LED_BRIGHTNESS: u8 = 255;

/// Which slice of the config the threshold and name fields edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FormScope {
    #[default]
    Global,
    Sensor(String),
}

impl FormScope {
    /// `"global"` maps to [`FormScope::Global`]; anything else is a sensor id.
    pub fn parse(raw: &str) -> Self {
        if raw == GLOBAL_SCOPE {
            FormScope::Global
        } else {
            FormScope::Sensor(raw.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FormScope::Global => GLOBAL_SCOPE,
            FormScope::Sensor(id) => id,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, FormScope::Global)
    }
}

impl fmt::Display for FormScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FormScope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormScope {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FormScope::parse(&raw))
    }
}

/// The scope-dependent part of the form.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScopedFields {
    pub warning: f64,
    pub critical: f64,
    /// Always empty for the global scope.
    pub sensor_name: String,
}

/// Project the config onto the fields shown for `scope`.
///
/// A sensor without an override displays the global thresholds; this does
/// not create an override. Its name falls back to empty, never to anything
/// global. Called on every scope change, so unsaved edits to the previous
/// scope are dropped.
pub fn project(config: &RemoteConfig, scope: &FormScope) -> ScopedFields {
    let global = config.temp_thresholds.global.unwrap_or_default();

    match scope {
        FormScope::Global => ScopedFields {
            warning: global.warning,
            critical: global.critical,
            sensor_name: String::new(),
        },
        FormScope::Sensor(id) => {
            let thresholds = config
                .temp_thresholds
                .sensors
                .as_ref()
                .and_then(|m| m.get(id))
                .copied()
                .unwrap_or(global);
            let sensor_name = config
                .sensor_names
                .as_ref()
                .and_then(|m| m.get(id))
                .cloned()
                .unwrap_or_default();
            ScopedFields {
                warning: thresholds.warning,
                critical: thresholds.critical,
                sensor_name,
            }
        }
    }
}

/// Editable copy of the settings surface.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FormValues {
    pub ntp_server: String,
    pub location_auto: bool,
    pub mock_mode: bool,
    pub led_brightness: u8,
    #[schema(value_type = String)]
    pub scope: FormScope,
    #[serde(flatten)]
    pub fields: ScopedFields,
}

impl Default for FormValues {
    fn default() -> Self {
        let Thresholds { warning, critical } = Thresholds::default();
        Self {
            ntp_server: String::new(),
            location_auto: true,
            mock_mode: false,
            led_brightness: DEFAULT_LED_BRIGHTNESS,
            scope: FormScope::Global,
            fields: ScopedFields {
                warning,
                critical,
                sensor_name: String::new(),
            },
        }
    }
}

impl FormValues {
    /// Initial form for a freshly loaded config: global scope selected.
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            ntp_server: config.ntp_server.clone(),
            location_auto: config.location.auto,
            mock_mode: config.mock_mode,
            led_brightness: config.led_brightness.unwrap_or(DEFAULT_LED_BRIGHTNESS),
            scope: FormScope::Global,
            fields: project(config, &FormScope::Global),
        }
    }

    /// The `POST /api/settings` body for the current form.
    pub fn to_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            ntp_server: self.ntp_server.clone(),
            location_auto: self.location_auto,
            threshold_warning: self.fields.warning,
            threshold_critical: self.fields.critical,
            sensor_id: self.scope.as_str().to_owned(),
            sensor_name: match self.scope {
                FormScope::Global => None,
                FormScope::Sensor(_) => Some(self.fields.sensor_name.clone()),
            },
            mock_mode: self.mock_mode,
            led_brightness: self.led_brightness,
        }
    }
}

/// Apply a successful save to the local config copy.
///
/// Only the saved scope's entry changes. `sensors` and `sensor_names` are
/// created when the backend config had none.
pub fn merge_saved(config: &mut RemoteConfig, update: &SettingsUpdate) {
    let thresholds = Thresholds {
        warning: update.threshold_warning,
        critical: update.threshold_critical,
    };

    match FormScope::parse(&update.sensor_id) {
        FormScope::Global => config.temp_thresholds.global = Some(thresholds),
        FormScope::Sensor(id) => {
            config
                .temp_thresholds
                .sensors
                .get_or_insert_with(Default::default)
                .insert(id.clone(), thresholds);
            config
                .sensor_names
                .get_or_insert_with(Default::default)
                .insert(id, update.sensor_name.clone().unwrap_or_default());
        }
    }

    config.ntp_server = update.ntp_server.clone();
    config.location.auto = update.location_auto;
    config.mock_mode = update.mock_mode;
    config.led_brightness = Some(update.led_brightness);
}
