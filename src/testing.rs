//! Scripted in-memory backend shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::{self, Instant};

use crate::client::{
    models::{RemoteConfig, Sensor, SensorStatus, SettingsUpdate, StatusSnapshot, WeatherSnapshot},
    ApiError, DashboardApi,
};

struct Scripted<T> {
    delay: Duration,
    result: Option<T>,
}

#[derive(Default)]
struct State {
    status: VecDeque<Scripted<StatusSnapshot>>,
    weather: VecDeque<Scripted<Option<WeatherSnapshot>>>,
    settings: Option<RemoteConfig>,
    fail_saves: bool,
    save_delay: Duration,
    saves: Vec<SettingsUpdate>,
    status_calls: Vec<Instant>,
    weather_calls: Vec<Instant>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeApi {
    state: Arc<Mutex<State>>,
}

fn unavailable(path: &str) -> ApiError {
    ApiError::Status {
        url: format!("http://fake{path}"),
        status: 503,
        body: "scripted failure".into(),
    }
}

impl FakeApi {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn push_status(&self, snapshot: StatusSnapshot) {
        self.push_status_after(Duration::ZERO, snapshot);
    }

    pub fn push_status_after(&self, delay: Duration, snapshot: StatusSnapshot) {
        self.with(|s| s.status.push_back(Scripted { delay, result: Some(snapshot) }));
    }

    pub fn push_status_error(&self) {
        self.with(|s| s.status.push_back(Scripted { delay: Duration::ZERO, result: None }));
    }

    pub fn push_weather(&self, weather: Option<WeatherSnapshot>) {
        self.push_weather_after(Duration::ZERO, weather);
    }

    pub fn push_weather_after(&self, delay: Duration, weather: Option<WeatherSnapshot>) {
        self.with(|s| s.weather.push_back(Scripted { delay, result: Some(weather) }));
    }

    pub fn push_weather_error(&self) {
        self.with(|s| s.weather.push_back(Scripted { delay: Duration::ZERO, result: None }));
    }

    pub fn set_settings(&self, config: RemoteConfig) {
        self.with(|s| s.settings = Some(config));
    }

    pub fn fail_saves(&self, fail: bool) {
        self.with(|s| s.fail_saves = fail);
    }

    pub fn delay_saves(&self, delay: Duration) {
        self.with(|s| s.save_delay = delay);
    }

    pub fn saves(&self) -> Vec<SettingsUpdate> {
        self.with(|s| s.saves.clone())
    }

    pub fn status_calls(&self) -> Vec<Instant> {
        self.with(|s| s.status_calls.clone())
    }

    pub fn weather_calls(&self) -> Vec<Instant> {
        self.with(|s| s.weather_calls.clone())
    }
}

impl DashboardApi for FakeApi {
    async fn status(&self) -> Result<StatusSnapshot, ApiError> {
        let next = self.with(|s| {
            s.status_calls.push(Instant::now());
            s.status.pop_front()
        });
        let Some(next) = next else {
            return Err(unavailable("/api/status"));
        };
        if !next.delay.is_zero() {
            time::sleep(next.delay).await;
        }
        next.result.ok_or_else(|| unavailable("/api/status"))
    }

    async fn weather(&self) -> Result<Option<WeatherSnapshot>, ApiError> {
        let next = self.with(|s| {
            s.weather_calls.push(Instant::now());
            s.weather.pop_front()
        });
        let Some(next) = next else {
            return Err(unavailable("/api/weather"));
        };
        if !next.delay.is_zero() {
            time::sleep(next.delay).await;
        }
        next.result.ok_or_else(|| unavailable("/api/weather"))
    }

    async fn settings(&self) -> Result<RemoteConfig, ApiError> {
        self.with(|s| s.settings.clone())
            .ok_or_else(|| unavailable("/api/settings"))
    }

    async fn save_settings(&self, update: &SettingsUpdate) -> Result<(), ApiError> {
        let delay = self.with(|s| s.save_delay);
        if !delay.is_zero() {
            time::sleep(delay).await;
        }
        self.with(|s| {
            if s.fail_saves {
                Err(unavailable("/api/settings"))
            } else {
                s.saves.push(update.clone());
                Ok(())
            }
        })
    }
}

/// A snapshot whose probes read `temps` in order, ids `mock-1..`.
pub(crate) fn snapshot(time: &str, temps: &[f64]) -> StatusSnapshot {
    StatusSnapshot {
        time: time.to_owned(),
        date: "Monday, January 05".to_owned(),
        sensors: temps
            .iter()
            .enumerate()
            .map(|(i, t)| Sensor {
                id: format!("mock-{}", i + 1),
                name: format!("Probe {}", i + 1),
                temp: *t,
                status: SensorStatus::Normal,
            })
            .collect(),
    }
}
