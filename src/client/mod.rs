pub mod errors;
pub mod models;

use std::{future::Future, sync::Arc, time::Duration};

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

pub use self::errors::ApiError;
use self::models::{RemoteConfig, SettingsUpdate, StatusSnapshot, WeatherPayload, WeatherSnapshot};

/// The backend endpoints the dashboard consumes.
///
/// Pollers and the settings sync are generic over this trait so they can be
/// driven by scripted fakes in tests.
pub trait DashboardApi: Send + Sync {
    /// `GET /api/status`
    fn status(&self) -> impl Future<Output = Result<StatusSnapshot, ApiError>> + Send;

    /// `GET /api/weather`. `Ok(None)` means the backend had nothing to report.
    fn weather(&self) -> impl Future<Output = Result<Option<WeatherSnapshot>, ApiError>> + Send;

    /// `GET /api/settings`
    fn settings(&self) -> impl Future<Output = Result<RemoteConfig, ApiError>> + Send;

    /// `POST /api/settings`
    fn save_settings(
        &self,
        update: &SettingsUpdate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// reqwest-backed client for the appliance backend.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    base_url: String,
}

impl DashboardClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.to_owned(),
                source,
            })?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.trim_end_matches('/').to_owned(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");

        let resp = self
            .inner
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Transport { url: url.clone(), source })?;

        decode(url, resp).await
    }
}

/// Reject non-2xx responses, then parse the body as JSON.
async fn decode<T: DeserializeOwned>(url: String, resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|source| ApiError::Transport { url: url.clone(), source })?;

    if !status.is_success() {
        return Err(ApiError::Status {
            url,
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
}

impl DashboardApi for DashboardClient {
    async fn status(&self) -> Result<StatusSnapshot, ApiError> {
        self.get_json("/api/status").await
    }

    async fn weather(&self) -> Result<Option<WeatherSnapshot>, ApiError> {
        let payload: Option<WeatherPayload> = self.get_json("/api/weather").await?;
        Ok(payload.and_then(WeatherPayload::into_snapshot))
    }

    async fn settings(&self) -> Result<RemoteConfig, ApiError> {
        self.get_json("/api/settings").await
    }

    async fn save_settings(&self, update: &SettingsUpdate) -> Result<(), ApiError> {
        let url = self.url("/api/settings");
        debug!(url = %url, sensor_id = %update.sensor_id, "POST");

        let resp = self
            .inner
            .http
            .post(&url)
            .json(update)
            .send()
            .await
            .map_err(|source| ApiError::Transport { url: url.clone(), source })?;

        // The backend echoes the stored config; the dashboard merges its own
        // copy instead, so the body only has to be valid JSON.
        let _: serde_json::Value = decode(url, resp).await?;
        Ok(())
    }
}
