use std::ops::ControlFlow;
use std::time::Duration;

use dioxus::logger::tracing::{debug, warn};
use dioxus::prelude::*;

use crate::acquire::fetch::fetch_current_metrics;
use crate::config::DashboardConfig;
use crate::error::AcquireError;
use crate::shared::types::MetricsSnapshot;
use crate::utils::timer::sleep;

/// What the polling acquirer exposes. Failed fetches never clear `metrics`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingState {
    pub metrics: Option<MetricsSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
    torn_down: bool,
}

impl Default for PollingState {
    fn default() -> Self {
        Self {
            metrics: None,
            loading: true,
            error: None,
            torn_down: false,
        }
    }
}

impl PollingState {
    /// Folds one fetch outcome in. Returns false when the outcome arrived
    /// after teardown and was dropped.
    pub fn apply(&mut self, result: Result<MetricsSnapshot, AcquireError>) -> bool {
        if self.torn_down {
            return false;
        }
        match result {
            Ok(snapshot) => {
                self.metrics = Some(snapshot);
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e.to_string());
            }
        }
        self.loading = false;
        true
    }

    pub fn teardown(&mut self) {
        self.torn_down = true;
    }
}

/// Calls `tick` right away and then once per `interval` until it breaks.
/// The outcome of whatever `tick` starts has no effect on the schedule.
pub async fn run_ticker<F>(interval: Duration, mut tick: F)
where
    F: FnMut() -> ControlFlow<()>,
{
    loop {
        if tick().is_break() {
            return;
        }
        sleep(interval).await;
    }
}

/// Handle returned by [`use_metrics`].
#[derive(Clone, Copy)]
pub struct UseMetrics {
    state: Signal<PollingState>,
    fetch: Callback<()>,
}

impl UseMetrics {
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.state.read().metrics.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// One extra fetch, independent of the ticker.
    pub fn refetch(&self) {
        self.fetch.call(());
    }
}

/// Fetches immediately, then every `poll_interval` until the calling
/// component unmounts. Each tick is its own request; a slow response does not
/// hold back the next tick.
pub fn use_metrics(config: &DashboardConfig) -> UseMetrics {
    let mut state = use_signal(PollingState::default);
    let url = config.metrics_url();
    let interval = config.poll_interval;

    let fetch = use_callback(move |()| {
        let url = url.clone();
        spawn(async move {
            let result = fetch_current_metrics(&url).await;
            if let Err(e) = &result {
                warn!("[polling] {e}");
            }
            // A write can fail once the owning scope is gone; the response is stale then.
            if let Ok(mut s) = state.try_write() {
                if !s.apply(result) {
                    debug!("[polling] dropped response that arrived after teardown");
                }
            }
        });
    });

    let ticker = use_hook(|| {
        spawn(run_ticker(interval, move || {
            fetch.call(());
            ControlFlow::Continue(())
        }))
    });

    use_drop(move || {
        ticker.cancel();
        if let Ok(mut s) = state.try_write() {
            s.teardown();
        }
    });

    UseMetrics { state, fetch }
}
