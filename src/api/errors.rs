use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{client::ApiError, settings::SettingsError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("settings surface is not open")]
    SettingsClosed,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Backend(#[from] ApiError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SettingsClosed => StatusCode::NOT_FOUND,
            AppError::Settings(SettingsError::NotLoaded | SettingsError::SaveInProgress) => {
                StatusCode::CONFLICT
            }
            AppError::Settings(SettingsError::Api(_)) | AppError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
