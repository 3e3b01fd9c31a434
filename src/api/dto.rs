use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::view::SettingsView;

/// Partial edit of the settings form. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FormEdit {
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    /// Ignored unless a sensor scope is selected.
    pub sensor_name: Option<String>,
    pub ntp_server: Option<String>,
    pub location_auto: Option<bool>,
    pub led_brightness: Option<u8>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScopeRequest {
    /// `"global"` or a sensor id.
    pub scope: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MockToggleResponse {
    /// False when the switch is locked.
    pub toggled: bool,
    pub settings: SettingsView,
}

/// What happened to the settings surface after a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// The global scope was saved and the surface closed.
    Closed,
    /// A sensor scope was saved and the surface stays open.
    KeptOpen,
    /// The save went through, but the surface was closed or reopened while
    /// it was in flight. The current surface, if any, was not touched.
    SurfaceGone,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveResponse {
    pub status: SaveStatus,
    /// Scope that was saved: `"global"` or a sensor id.
    pub sensor_id: String,
    /// The surface after a per-sensor save, otherwise `None`.
    pub settings: Option<SettingsView>,
}
