use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::client::models::StatusSnapshot;

/// One hour of points at the default 10 s status period.
pub const DEFAULT_HISTORY_CAPACITY: usize = 360;

/// A chart sample derived from the first three probes of a status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryPoint {
    /// Clock portion of the snapshot's time, e.g. `"14:05"`.
    pub time: String,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
    /// Mean of `s1..s3`, rounded to one decimal place.
    pub avg: f64,
}

impl HistoryPoint {
    /// Returns `None` when the snapshot has fewer than three sensors.
    /// Sensors past the third are ignored.
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Option<Self> {
        let [a, b, c] = match snapshot.sensors.get(..3) {
            Some([a, b, c]) => [a.temp, b.temp, c.temp],
            _ => return None,
        };

        Some(Self {
            time: clock_time(&snapshot.time).to_owned(),
            s1: a,
            s2: b,
            s3: c,
            avg: round_one_decimal((a + b + c) / 3.0),
        })
    }
}

/// The first whitespace-delimited token, dropping any trailing qualifier
/// such as `"PM"` or a timezone.
fn clock_time(time: &str) -> &str {
    time.split_whitespace().next().unwrap_or("")
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Bounded FIFO of chart samples. `append` is the only mutator; once the
/// buffer is full the oldest point is evicted.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryBuffer {
    /// `capacity` is clamped to at least one point.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, point: HistoryPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Oldest first, in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
