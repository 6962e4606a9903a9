//! Bounded time series of displayed snapshots, oldest first.

use std::collections::VecDeque;

use crate::shared::types::{MetricsSnapshot, RidePoint};

#[derive(Debug, Clone, PartialEq)]
pub struct RideHistory {
    points: VecDeque<RidePoint>,
    capacity: usize,
}

impl RideHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a point for `snapshot`, evicting the oldest at capacity.
    /// A snapshot with the same `observed_at` as the newest point replaces it.
    pub fn record(&mut self, snapshot: &MetricsSnapshot) {
        let point = RidePoint {
            observed_at: snapshot.observed_at.clone(),
            active_rides: snapshot.active_rides,
        };
        if let Some(last) = self.points.back_mut() {
            if last.observed_at == point.observed_at {
                *last = point;
                return;
            }
        }
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn points(&self) -> Vec<RidePoint> {
        self.points.iter().cloned().collect()
    }
}
