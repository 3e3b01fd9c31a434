use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{
    sync::watch,
    task::JoinSet,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    client::{models::StatusSnapshot, ApiError, DashboardApi},
    history::{HistoryBuffer, HistoryPoint},
};

/// Everything the views derive from status polling.
#[derive(Debug, Clone, Default)]
pub struct StatusFeed {
    /// Latest snapshot to arrive. Kept as-is when a poll fails.
    pub snapshot: Option<StatusSnapshot>,
    pub history: HistoryBuffer,
    /// When `snapshot` was last replaced.
    pub last_updated: Option<DateTime<Utc>>,
    /// Failed polls since the last success.
    pub consecutive_failures: u32,
}

impl StatusFeed {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::with_capacity(capacity),
            ..Self::default()
        }
    }
}

/// Fetches `/api/status` on a fixed period and is the only writer of the
/// [`StatusFeed`].
///
/// Each tick spawns its fetch, so a backend slower than the period leads to
/// overlapping requests rather than a stalled timer. Results are applied in
/// the order they complete.
pub struct StatusPoller<A> {
    api: A,
    interval: Duration,
    feed: watch::Sender<StatusFeed>,
}

impl<A> StatusPoller<A>
where
    A: DashboardApi + Clone + 'static,
{
    pub fn new(api: A, interval: Duration, history_capacity: usize) -> (Self, watch::Receiver<StatusFeed>) {
        let (feed, rx) = watch::channel(StatusFeed::with_capacity(history_capacity));
        (Self { api, interval, feed }, rx)
    }

    /// Runs until `cancel` fires. In-flight fetches are aborted on exit.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Status polling loop started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: JoinSet<Result<StatusSnapshot, ApiError>> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(joined) = in_flight.join_next() => match joined {
                    Ok(result) => self.apply(result),
                    Err(e) => warn!(error = %e, "Status fetch task did not complete"),
                },
                _ = ticker.tick() => {
                    let api = self.api.clone();
                    in_flight.spawn(async move { api.status().await });
                }
            }
        }

        in_flight.abort_all();
        info!("Status polling loop stopped");
    }

    /// Fold one completed fetch into the feed.
    pub(crate) fn apply(&self, result: Result<StatusSnapshot, ApiError>) {
        match result {
            Ok(snapshot) => {
                let point = HistoryPoint::from_snapshot(&snapshot);
                debug!(
                    sensors = snapshot.sensors.len(),
                    time = %snapshot.time,
                    charted = point.is_some(),
                    "Status snapshot received"
                );
                self.feed.send_modify(|feed| {
                    if let Some(point) = point {
                        feed.history.append(point);
                    }
                    feed.snapshot = Some(snapshot);
                    feed.last_updated = Some(Utc::now());
                    feed.consecutive_failures = 0;
                });
            }
            Err(e) => {
                error!(error = %e, "Status fetch failed; keeping previous snapshot");
                self.feed.send_modify(|feed| feed.consecutive_failures += 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::models::SensorStatus,
        testing::{snapshot, FakeApi},
    };

    const PERIOD: Duration = Duration::from_secs(10);

    fn poller(api: &FakeApi) -> (StatusPoller<FakeApi>, watch::Receiver<StatusFeed>) {
        StatusPoller::new(api.clone(), PERIOD, 360)
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let api = FakeApi::default();
        let (p, rx) = poller(&api);

        p.apply(Ok(snapshot("14:05", &[70.0, 72.0, 71.0])));
        p.apply(Err(ApiError::Status {
            url: "http://fake/api/status".into(),
            status: 500,
            body: String::new(),
        }));

        let feed = rx.borrow();
        assert_eq!(feed.snapshot.as_ref().unwrap().time, "14:05");
        assert_eq!(feed.history.len(), 1);
        assert_eq!(feed.consecutive_failures, 1);
    }

    #[test]
    fn snapshot_with_two_sensors_is_shown_but_not_charted() {
        let api = FakeApi::default();
        let (p, rx) = poller(&api);

        p.apply(Ok(snapshot("14:05", &[70.0, 72.0])));

        let feed = rx.borrow();
        assert!(feed.snapshot.is_some());
        assert!(feed.history.is_empty());
    }

    #[test]
    fn history_is_bounded_across_many_polls() {
        let api = FakeApi::default();
        let (p, rx) = poller(&api);

        for n in 1..=361 {
            p.apply(Ok(snapshot(&format!("t{n}"), &[n as f64, 1.0, 2.0])));
        }

        let feed = rx.borrow();
        assert_eq!(feed.history.len(), 360);
        assert!(!feed.history.iter().any(|pt| pt.time == "t1"));
        assert!(feed.history.iter().any(|pt| pt.time == "t361"));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_every_period() {
        let api = FakeApi::default();
        for n in 0..4 {
            api.push_status(snapshot(&format!("14:0{n}"), &[70.0, 72.0, 71.0]));
        }
        let (p, mut rx) = poller(&api);
        let cancel = CancellationToken::new();
        let start = time::Instant::now();
        let task = tokio::spawn(p.run(cancel.clone()));

        time::sleep(Duration::from_secs(35)).await;
        cancel.cancel();
        task.await.unwrap();

        let calls = api.status_calls();
        assert_eq!(calls.len(), 4);
        for (i, at) in calls.iter().enumerate() {
            assert_eq!(*at - start, PERIOD * i as u32);
        }
        assert_eq!(rx.borrow_and_update().history.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_keeps_snapshot_and_next_tick_still_fires() {
        let api = FakeApi::default();
        let mut first = snapshot("14:00", &[70.0, 72.0, 71.0]);
        first.sensors[1].status = SensorStatus::Unknown;
        api.push_status(first);
        api.push_status_error();
        api.push_status(snapshot("14:20", &[73.0, 73.0, 73.0]));

        let (p, rx) = poller(&api);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(p.run(cancel.clone()));

        time::sleep(Duration::from_secs(15)).await;
        {
            let feed = rx.borrow();
            assert_eq!(feed.snapshot.as_ref().unwrap().time, "14:00");
            assert_eq!(feed.snapshot.as_ref().unwrap().sensors[1].status, SensorStatus::Unknown);
            assert_eq!(feed.history.len(), 1);
            assert_eq!(feed.consecutive_failures, 1);
        }

        time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(api.status_calls().len(), 3);
        let feed = rx.borrow();
        assert_eq!(feed.snapshot.as_ref().unwrap().time, "14:20");
        assert_eq!(feed.history.len(), 2);
        assert_eq!(feed.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_response_does_not_block_next_tick_and_latest_arrival_wins() {
        let api = FakeApi::default();
        // First request takes 15 s, second answers immediately.
        api.push_status_after(Duration::from_secs(15), snapshot("slow", &[1.0, 1.0, 1.0]));
        api.push_status(snapshot("fast", &[2.0, 2.0, 2.0]));

        let (p, rx) = poller(&api);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(p.run(cancel.clone()));

        time::sleep(Duration::from_secs(11)).await;
        assert_eq!(api.status_calls().len(), 2);
        assert_eq!(rx.borrow().snapshot.as_ref().unwrap().time, "fast");

        // The slow one lands at t=15 and, arriving last, replaces the snapshot.
        time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        task.await.unwrap();

        let feed = rx.borrow();
        assert_eq!(feed.snapshot.as_ref().unwrap().time, "slow");
        let times: Vec<_> = feed.history.iter().map(|pt| pt.time.as_str()).collect();
        assert_eq!(times, ["fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling_and_drops_in_flight_results() {
        let api = FakeApi::default();
        api.push_status_after(Duration::from_secs(5), snapshot("late", &[1.0, 1.0, 1.0]));

        let (p, rx) = poller(&api);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(p.run(cancel.clone()));

        time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        task.await.unwrap();

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.status_calls().len(), 1);
        assert!(rx.borrow().snapshot.is_none());
    }
}
