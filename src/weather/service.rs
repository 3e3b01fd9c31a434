use std::time::Duration;

use tokio::{sync::watch, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::client::{models::WeatherSnapshot, ApiError, DashboardApi};

/// Delays between weather fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherSchedule {
    /// After a healthy reading.
    pub refresh: Duration,
    /// After a failure, an absent reading or a sentinel reading.
    pub retry: Duration,
}

impl Default for WeatherSchedule {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(15 * 60),
            retry: Duration::from_secs(10),
        }
    }
}

impl WeatherSchedule {
    /// How long to wait before the next attempt, given how this one went.
    pub fn next_delay(&self, outcome: &Result<Option<WeatherSnapshot>, ApiError>) -> Duration {
        match outcome {
            Ok(Some(w)) if !w.is_degraded() => self.refresh,
            _ => self.retry,
        }
    }
}

/// Self-rescheduling weather fetch loop; the only writer of the weather slot.
///
/// Unlike status polling there is never more than one request in flight: the
/// next attempt is scheduled only once the previous one has finished, with a
/// delay chosen by [`WeatherSchedule::next_delay`].
pub struct WeatherPoller<A> {
    api: A,
    schedule: WeatherSchedule,
    latest: watch::Sender<Option<WeatherSnapshot>>,
}

impl<A: DashboardApi> WeatherPoller<A> {
    pub fn new(api: A, schedule: WeatherSchedule) -> (Self, watch::Receiver<Option<WeatherSnapshot>>) {
        let (latest, rx) = watch::channel(None);
        (Self { api, schedule, latest }, rx)
    }

    /// Runs until `cancel` fires. Both the in-flight fetch and the pending
    /// delay are abandoned on cancellation, so nothing is scheduled after it.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            refresh_secs = self.schedule.refresh.as_secs(),
            retry_secs = self.schedule.retry.as_secs(),
            "Weather polling loop started"
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.api.weather() => outcome,
            };

            let delay = self.apply(outcome);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = time::sleep(delay) => {}
            }
        }

        info!("Weather polling loop stopped");
    }

    /// Publish a completed fetch and return the delay before the next one.
    pub(crate) fn apply(&self, outcome: Result<Option<WeatherSnapshot>, ApiError>) -> Duration {
        let delay = self.schedule.next_delay(&outcome);

        match outcome {
            Ok(weather) => {
                match &weather {
                    Some(w) if !w.is_degraded() => {}
                    Some(w) => warn!(
                        location = %w.location_name,
                        retry_secs = delay.as_secs(),
                        "Weather offline, retrying soon"
                    ),
                    None => warn!(retry_secs = delay.as_secs(), "Weather unavailable, retrying soon"),
                }
                // Degraded readings replace the old one too; the view shows
                // them as offline rather than showing stale data.
                self.latest.send_replace(weather);
            }
            Err(e) => {
                error!(error = %e, retry_secs = delay.as_secs(), "Weather fetch failed");
            }
        }

        delay
    }
}
