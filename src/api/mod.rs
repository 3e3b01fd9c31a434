pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::sync::{watch, Mutex};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    client::{models::WeatherSnapshot, DashboardApi},
    dashboard::Dashboard,
    settings::SettingsSync,
    status::StatusFeed,
};
use handlers::ApiDoc;

/// The settings surface, when open. `generation` changes every time the
/// surface is opened or closed so that a load or save that finishes after
/// that can tell its session is gone.
pub struct SettingsSlot<A> {
    pub generation: u64,
    pub sync: Option<SettingsSync<A>>,
}

impl<A> Default for SettingsSlot<A> {
    fn default() -> Self {
        Self { generation: 0, sync: None }
    }
}

pub struct AppState<A> {
    pub status: watch::Receiver<StatusFeed>,
    pub weather: watch::Receiver<Option<WeatherSnapshot>>,
    pub settings: Arc<Mutex<SettingsSlot<A>>>,
    pub api: A,
}

impl<A: Clone> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            status: self.status.clone(),
            weather: self.weather.clone(),
            settings: Arc::clone(&self.settings),
            api: self.api.clone(),
        }
    }
}

impl<A> AppState<A> {
    pub fn new(
        status: watch::Receiver<StatusFeed>,
        weather: watch::Receiver<Option<WeatherSnapshot>>,
        api: A,
    ) -> Self {
        Self {
            status,
            weather,
            settings: Arc::new(Mutex::new(SettingsSlot::default())),
            api,
        }
    }

    pub fn from_dashboard(dashboard: &Dashboard, api: A) -> Self {
        Self::new(dashboard.subscribe_status(), dashboard.subscribe_weather(), api)
    }
}

pub fn router<A>(state: AppState<A>) -> Router
where
    A: DashboardApi + Clone + 'static,
{
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/health", get(handlers::health))
        .route("/dashboard", get(handlers::get_dashboard::<A>))
        .route("/dashboard/history", get(handlers::get_history::<A>))
        .route("/settings", get(handlers::get_settings::<A>))
        .route("/settings/open", post(handlers::open_settings::<A>))
        .route("/settings/form", put(handlers::edit_form::<A>))
        .route("/settings/scope", post(handlers::select_scope::<A>))
        .route("/settings/mock-mode/toggle", post(handlers::toggle_mock_mode::<A>))
        .route("/settings/save", post(handlers::save_settings::<A>))
        .route("/settings/close", post(handlers::close_settings::<A>))
        .with_state(state)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
