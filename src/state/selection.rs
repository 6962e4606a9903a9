//! Which acquirer's snapshot the dashboard shows.
//!
//! While the push channel is `Connected`, pushed snapshots are authoritative
//! and polled ones are remembered but not shown. In any other state the last
//! polled snapshot is shown. Every change of the shown snapshot lands in the
//! ride history.

use crate::shared::types::{ConnectionState, MetricsSnapshot, RidePoint};
use crate::state::history::RideHistory;

pub const PUSH_BANNER: &str = "Live connection unavailable. Switching to polling mode.";
pub const POLL_BANNER: &str = "Failed to fetch metrics";

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSelector {
    status: ConnectionState,
    polled: Option<MetricsSnapshot>,
    displayed: Option<MetricsSnapshot>,
    history: RideHistory,
}

impl SourceSelector {
    pub fn new(history_len: usize) -> Self {
        Self {
            status: ConnectionState::default(),
            polled: None,
            displayed: None,
            history: RideHistory::new(history_len),
        }
    }

    pub fn status(&self) -> ConnectionState {
        self.status
    }

    /// Push channel changed state. Leaving `Connected` falls back to the last
    /// polled snapshot, if any; entering it keeps what is shown until the
    /// first push arrives.
    pub fn on_state(&mut self, status: ConnectionState) -> bool {
        self.status = status;
        if status == ConnectionState::Connected {
            return false;
        }
        match self.polled.clone() {
            Some(polled) => self.show(polled),
            None => false,
        }
    }

    /// A snapshot arrived on the push channel. Ignored unless connected.
    pub fn on_push(&mut self, snapshot: MetricsSnapshot) -> bool {
        if self.status != ConnectionState::Connected {
            return false;
        }
        self.show(snapshot)
    }

    /// The polling acquirer's latest snapshot. `None` (nothing fetched yet)
    /// never clears what is shown.
    pub fn on_poll(&mut self, snapshot: Option<MetricsSnapshot>) -> bool {
        let Some(snapshot) = snapshot else {
            return false;
        };
        if self.polled.as_ref() == Some(&snapshot) {
            return false;
        }
        self.polled = Some(snapshot.clone());
        if self.status == ConnectionState::Connected {
            return false;
        }
        self.show(snapshot)
    }

    fn show(&mut self, snapshot: MetricsSnapshot) -> bool {
        if self.displayed.as_ref() == Some(&snapshot) {
            return false;
        }
        self.history.record(&snapshot);
        self.displayed = Some(snapshot);
        true
    }

    pub fn displayed(&self) -> Option<&MetricsSnapshot> {
        self.displayed.as_ref()
    }

    pub fn history(&self) -> Vec<RidePoint> {
        self.history.points()
    }

    pub fn label(&self) -> &'static str {
        match self.status {
            ConnectionState::Connecting => "Connecting…",
            ConnectionState::Connected => "Live",
            ConnectionState::Disconnected => "Polling",
        }
    }

    /// Tailwind background class for the status dot.
    pub fn status_color(&self) -> &'static str {
        match self.status {
            ConnectionState::Connecting => "bg-blue-500",
            ConnectionState::Connected => "bg-green-500",
            ConnectionState::Disconnected => "bg-orange-500",
        }
    }

    pub fn banners(&self, push_error: Option<&str>, poll_error: Option<&str>) -> Vec<&'static str> {
        let mut banners = Vec::new();
        if self.status == ConnectionState::Disconnected || push_error.is_some() {
            banners.push(PUSH_BANNER);
        }
        if self.status != ConnectionState::Connected && poll_error.is_some() {
            banners.push(POLL_BANNER);
        }
        banners
    }
}
