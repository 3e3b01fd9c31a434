use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, warn};
use utoipa::OpenApi;

use super::{
    dto::{FormEdit, MockToggleResponse, SaveResponse, SaveStatus, ScopeRequest},
    errors::AppError,
    AppState,
};
use crate::{
    client::DashboardApi,
    dashboard,
    history::HistoryPoint,
    settings::{FormScope, SaveOutcome, SettingsSync},
    view::{DashboardView, SettingsView},
};

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Render the live dashboard from the latest poller state.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Current dashboard", body = DashboardView),
    ),
    tag = "dashboard"
)]
pub async fn get_dashboard<A>(State(state): State<AppState<A>>) -> Json<DashboardView>
where
    A: DashboardApi + Clone + 'static,
{
    Json(dashboard::render(&state.status, &state.weather))
}

/// Chart points, oldest first.
#[utoipa::path(
    get,
    path = "/dashboard/history",
    responses(
        (status = 200, description = "Temperature history", body = Vec<HistoryPoint>),
    ),
    tag = "dashboard"
)]
pub async fn get_history<A>(State(state): State<AppState<A>>) -> Json<Vec<HistoryPoint>>
where
    A: DashboardApi + Clone + 'static,
{
    let points = state.status.borrow().history.to_vec();
    Json(points)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Open the settings surface and load it from the backend. Any surface that
/// was already open is replaced.
#[utoipa::path(
    post,
    path = "/settings/open",
    responses(
        (status = 200, description = "Loaded settings surface", body = SettingsView),
        (status = 404, description = "Surface was closed while loading"),
    ),
    tag = "settings"
)]
pub async fn open_settings<A>(State(state): State<AppState<A>>) -> Result<Json<SettingsView>, AppError>
where
    A: DashboardApi + Clone + 'static,
{
    let generation = {
        let mut slot = state.settings.lock().await;
        slot.generation += 1;
        slot.sync = Some(SettingsSync::new(state.api.clone()));
        slot.generation
    };

    let result = SettingsSync::<A>::fetch_remote(&state.api).await;

    let mut slot = state.settings.lock().await;
    if slot.generation != generation {
        return Err(AppError::SettingsClosed);
    }
    let sync = slot.sync.as_mut().ok_or(AppError::SettingsClosed)?;
    sync.apply_load(result);
    info!(phase = ?sync.phase(), sensors = sync.sensors().len(), "Settings opened");
    Ok(Json(SettingsView::build(sync)))
}

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Settings surface", body = SettingsView),
        (status = 404, description = "Settings surface is closed"),
    ),
    tag = "settings"
)]
pub async fn get_settings<A>(State(state): State<AppState<A>>) -> Result<Json<SettingsView>, AppError>
where
    A: DashboardApi + Clone + 'static,
{
    let slot = state.settings.lock().await;
    let sync = slot.sync.as_ref().ok_or(AppError::SettingsClosed)?;
    Ok(Json(SettingsView::build(sync)))
}

/// Apply a partial edit to the form.
#[utoipa::path(
    put,
    path = "/settings/form",
    request_body = FormEdit,
    responses(
        (status = 200, description = "Updated settings surface", body = SettingsView),
        (status = 404, description = "Settings surface is closed"),
    ),
    tag = "settings"
)]
pub async fn edit_form<A>(
    State(state): State<AppState<A>>,
    Json(edit): Json<FormEdit>,
) -> Result<Json<SettingsView>, AppError>
where
    A: DashboardApi + Clone + 'static,
{
    let mut slot = state.settings.lock().await;
    let sync = slot.sync.as_mut().ok_or(AppError::SettingsClosed)?;

    if let Some(warning) = edit.warning {
        sync.set_warning(warning);
    }
    if let Some(critical) = edit.critical {
        sync.set_critical(critical);
    }
    if let Some(name) = edit.sensor_name {
        if !sync.form().scope.is_global() {
            sync.set_sensor_name(name);
        }
    }
    if let Some(server) = edit.ntp_server {
        sync.set_ntp_server(server);
    }
    if let Some(auto) = edit.location_auto {
        sync.set_location_auto(auto);
    }
    if let Some(brightness) = edit.led_brightness {
        sync.set_led_brightness(brightness);
    }

    Ok(Json(SettingsView::build(sync)))
}

/// Switch the scope the threshold fields edit. Unsaved scoped edits are dropped.
#[utoipa::path(
    post,
    path = "/settings/scope",
    request_body = ScopeRequest,
    responses(
        (status = 200, description = "Updated settings surface", body = SettingsView),
        (status = 404, description = "Settings surface is closed"),
    ),
    tag = "settings"
)]
pub async fn select_scope<A>(
    State(state): State<AppState<A>>,
    Json(req): Json<ScopeRequest>,
) -> Result<Json<SettingsView>, AppError>
where
    A: DashboardApi + Clone + 'static,
{
    let mut slot = state.settings.lock().await;
    let sync = slot.sync.as_mut().ok_or(AppError::SettingsClosed)?;
    sync.select_scope(FormScope::parse(&req.scope));
    Ok(Json(SettingsView::build(sync)))
}

#[utoipa::path(
    post,
    path = "/settings/mock-mode/toggle",
    responses(
        (status = 200, description = "Toggle result", body = MockToggleResponse),
        (status = 404, description = "Settings surface is closed"),
    ),
    tag = "settings"
)]
pub async fn toggle_mock_mode<A>(
    State(state): State<AppState<A>>,
) -> Result<Json<MockToggleResponse>, AppError>
where
    A: DashboardApi + Clone + 'static,
{
    let mut slot = state.settings.lock().await;
    let sync = slot.sync.as_mut().ok_or(AppError::SettingsClosed)?;
    let toggled = sync.toggle_mock_mode();
    if !toggled {
        warn!("Mock mode switch is locked while hardware is failed");
    }
    Ok(Json(MockToggleResponse {
        toggled,
        settings: SettingsView::build(sync),
    }))
}

/// Submit the form. Saving the global scope closes the surface; saving a
/// sensor scope keeps it open with a confirmation notice.
#[utoipa::path(
    post,
    path = "/settings/save",
    responses(
        (status = 200, description = "Saved", body = SaveResponse),
        (status = 404, description = "Settings surface is closed"),
        (status = 409, description = "Not loaded, or a save is already running"),
        (status = 502, description = "Backend rejected the save"),
    ),
    tag = "settings"
)]
pub async fn save_settings<A>(State(state): State<AppState<A>>) -> Result<Json<SaveResponse>, AppError>
where
    A: DashboardApi + Clone + 'static,
{
    let (generation, update) = {
        let mut slot = state.settings.lock().await;
        let generation = slot.generation;
        let sync = slot.sync.as_mut().ok_or(AppError::SettingsClosed)?;
        (generation, sync.begin_save()?)
    };

    let result = state.api.save_settings(&update).await;

    let mut slot = state.settings.lock().await;
    if slot.generation != generation {
        warn!(sensor_id = %update.sensor_id, "Settings surface went away during save");
        result?;
        return Ok(Json(SaveResponse {
            status: SaveStatus::SurfaceGone,
            sensor_id: update.sensor_id,
            settings: None,
        }));
    }

    let sync = slot.sync.as_mut().ok_or(AppError::SettingsClosed)?;
    match sync.finish_save(&update, result)? {
        SaveOutcome::Close => {
            slot.sync = None;
            slot.generation += 1;
            Ok(Json(SaveResponse {
                status: SaveStatus::Closed,
                sensor_id: update.sensor_id,
                settings: None,
            }))
        }
        SaveOutcome::KeepOpen(_) => Ok(Json(SaveResponse {
            status: SaveStatus::KeptOpen,
            sensor_id: update.sensor_id,
            settings: Some(SettingsView::build(sync)),
        })),
    }
}

#[utoipa::path(
    post,
    path = "/settings/close",
    responses(
        (status = 204, description = "Settings surface closed"),
    ),
    tag = "settings"
)]
pub async fn close_settings<A>(State(state): State<AppState<A>>) -> StatusCode
where
    A: DashboardApi + Clone + 'static,
{
    let mut slot = state.settings.lock().await;
    slot.sync = None;
    slot.generation += 1;
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_dashboard,
        get_history,
        open_settings,
        get_settings,
        edit_form,
        select_scope,
        toggle_mock_mode,
        save_settings,
        close_settings,
        health,
    ),
    components(schemas(
        DashboardView,
        HistoryPoint,
        SettingsView,
        FormEdit,
        ScopeRequest,
        MockToggleResponse,
        SaveResponse,
        SaveStatus,
    )),
    tags(
        (name = "dashboard", description = "Live rack temperature view"),
        (name = "settings", description = "Appliance settings surface"),
        (name = "system", description = "System endpoints"),
    ),
    info(
        title = "Rack Dashboard API",
        version = "0.1.0",
        description = "View API for the rack temperature dashboard"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
