use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    client::{models::WeatherSnapshot, DashboardApi},
    history::DEFAULT_HISTORY_CAPACITY,
    status::{StatusFeed, StatusPoller},
    view::DashboardView,
    weather::{WeatherPoller, WeatherSchedule},
};

/// Timing knobs for both pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub status_interval: Duration,
    pub history_capacity: usize,
    pub weather: WeatherSchedule,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(10),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            weather: WeatherSchedule::default(),
        }
    }
}

/// Owns the live dashboard state and the tasks that write it.
///
/// Each poller is the single writer of its own watch channel; everything
/// else holds receivers. All tasks share one cancellation token, which is
/// cancelled by [`Dashboard::shutdown`] or when the dashboard is dropped.
pub struct Dashboard {
    status: watch::Receiver<StatusFeed>,
    weather: watch::Receiver<Option<WeatherSnapshot>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Dashboard {
    /// Spawn both pollers on the current tokio runtime.
    pub fn start<A>(api: A, schedule: PollSchedule) -> Self
    where
        A: DashboardApi + Clone + 'static,
    {
        let cancel = CancellationToken::new();

        let (status_poller, status) =
            StatusPoller::new(api.clone(), schedule.status_interval, schedule.history_capacity);
        let (weather_poller, weather) = WeatherPoller::new(api, schedule.weather);

        let tasks = vec![
            tokio::spawn(status_poller.run(cancel.child_token())),
            tokio::spawn(weather_poller.run(cancel.child_token())),
        ];

        info!("Dashboard started");
        Self { status, weather, cancel, tasks }
    }

    /// A receiver that is notified whenever the status feed changes.
    pub fn subscribe_status(&self) -> watch::Receiver<StatusFeed> {
        self.status.clone()
    }

    /// A receiver that is notified whenever the weather slot changes.
    pub fn subscribe_weather(&self) -> watch::Receiver<Option<WeatherSnapshot>> {
        self.weather.clone()
    }

    /// Render the current state.
    pub fn view(&self) -> DashboardView {
        render(&self.status, &self.weather)
    }

    /// A token that fires when the dashboard shuts down, for tasks that
    /// observe the dashboard and should stop with it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Cancel every timer and wait for the pollers to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Dashboard task ended abnormally");
            }
        }
        info!("Dashboard stopped");
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Build a [`DashboardView`] from a pair of receivers.
pub fn render(
    status: &watch::Receiver<StatusFeed>,
    weather: &watch::Receiver<Option<WeatherSnapshot>>,
) -> DashboardView {
    let status = status.borrow();
    let weather = weather.borrow();
    DashboardView::build(&status, weather.as_ref())
}
