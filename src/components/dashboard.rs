use dioxus::logger::tracing::debug;
use dioxus::prelude::*;

use crate::acquire::use_metrics;
use crate::components::{ActiveRidesChart, CardModel, MetricsCard, TopCitiesChart};
use crate::config::DashboardConfig;
use crate::push::{use_push_channel, PushSource};
use crate::shared::types::MetricsSnapshot;
use crate::state::SourceSelector;
use crate::utils::format::{format_minutes, format_rides, format_time_of_day};

/// One line of the city ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRow {
    pub rank: String,
    pub city: String,
    pub rides: String,
}

/// What the dashboard renders for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub cards: Vec<CardModel>,
    pub rankings: Vec<CityRow>,
}

impl DashboardView {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let cards = vec![
            CardModel {
                title: "Active Rides",
                value: snapshot.active_rides.to_string(),
                subtitle: None,
                icon: Some("🚙"),
            },
            CardModel {
                title: "Average Duration",
                value: format_minutes(snapshot.average_duration_minutes),
                subtitle: Some("minutes"),
                icon: Some("⏱️"),
            },
            CardModel {
                title: "Last Updated",
                value: format_time_of_day(&snapshot.observed_at),
                subtitle: None,
                icon: Some("🕐"),
            },
        ];
        let rankings = snapshot
            .top_cities
            .iter()
            .enumerate()
            .map(|(i, c)| CityRow {
                rank: format!("#{}", i + 1),
                city: c.city.clone(),
                rides: format_rides(c.active_rides),
            })
            .collect();
        DashboardView { cards, rankings }
    }
}

/// Composes both acquirers and shows whichever one is authoritative for the
/// current connection state.
#[allow(non_snake_case)]
#[component]
pub fn Dashboard() -> Element {
    let config = use_context::<DashboardConfig>();
    let polling = use_metrics(&config);
    let push = use_push_channel(&config);
    let mut selector = use_signal(|| SourceSelector::new(config.history_len));

    // One subscription for the lifetime of the dashboard
    let topic = config.topic.clone();
    let subscription = use_hook(move || {
        push.subscribe(&topic, move |snapshot: MetricsSnapshot| {
            if let Ok(mut s) = selector.try_write() {
                if !s.on_push(snapshot) {
                    debug!("[dashboard] push ignored while {:?}", s.status());
                }
            }
        })
    });
    use_drop(move || push.unsubscribe(subscription));

    use_effect(move || {
        let status = push.status();
        selector.write().on_state(status);
    });

    use_effect(move || {
        let polled = polling.metrics();
        selector.write().on_poll(polled);
    });

    let push_error = push.error();
    let poll_error = polling.error();
    let fetching = polling.loading();
    let sel = selector.read();
    let label = sel.label();
    let dot = sel.status_color();
    let banners = sel.banners(push_error.as_deref(), poll_error.as_deref());
    let view = sel.displayed().map(DashboardView::from_snapshot);
    let cities = sel.displayed().map(|s| s.top_cities.clone()).unwrap_or_default();
    let history = sel.history();
    drop(sel);

    rsx! {
        div { class: "w-full max-w-5xl mx-auto space-y-6",
            header { class: "flex items-center justify-between",
                h1 { class: "text-2xl font-semibold tracking-tight text-slate-200", "🚗 StreamRide Analytics Dashboard" }
                div { class: "flex items-center gap-4",
                    div { class: "flex items-center gap-2",
                        span { class: "inline-block h-3 w-3 rounded-full {dot}" }
                        span { class: "text-sm text-slate-300", "{label}" }
                    }
                    button {
                        class: "rounded-lg border border-slate-700 px-3 py-1 text-sm text-slate-300 hover:bg-slate-800",
                        onclick: move |_| polling.refetch(),
                        "Refresh"
                    }
                }
            }

            for banner in banners {
                div { key: "{banner}", class: "rounded-lg border border-red-900 bg-red-950/60 px-4 py-2 text-sm text-red-300", "{banner}" }
            }

            if let Some(view) = view {
                section { class: "grid grid-cols-1 gap-6 md:grid-cols-3",
                    for card in view.cards {
                        MetricsCard { key: "{card.title}", card }
                    }
                }
                ActiveRidesChart { data: history }
                if !cities.is_empty() {
                    TopCitiesChart { data: cities }
                    section { class: "rounded-2xl border border-slate-800 bg-slate-900/60 shadow-xl p-6 space-y-3",
                        h2 { class: "text-lg font-medium text-slate-200", "City Rankings" }
                        div { class: "divide-y divide-slate-800",
                            for row in view.rankings {
                                div { key: "{row.city}", class: "flex items-center gap-4 py-2",
                                    span { class: "w-8 text-slate-500 tabular-nums", "{row.rank}" }
                                    span { class: "flex-1 text-slate-200", "{row.city}" }
                                    span { class: "text-slate-400 tabular-nums", "{row.rides}" }
                                }
                            }
                        }
                    }
                }
            } else {
                div {
                    class: "text-center text-slate-400 py-12",
                    class: if fetching { "animate-pulse" },
                    "Loading metrics..."
                }
            }
        }
    }
}
