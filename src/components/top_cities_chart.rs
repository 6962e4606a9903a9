use dioxus::prelude::*;

use crate::components::chart::{BarChart, ChartSlot};
use crate::shared::types::CityMetric;

#[allow(non_snake_case)]
#[component]
pub fn TopCitiesChart(data: ReadOnlySignal<Vec<CityMetric>>) -> Element {
    let mut slot = use_signal(ChartSlot::<BarChart>::default);

    use_effect(move || {
        let cities = data.read();
        slot.write().sync(cities.as_slice(), BarChart::build);
    });

    use_drop(move || {
        if let Ok(mut s) = slot.try_write() {
            s.release();
        }
    });

    let Some(chart) = slot.read().instance().cloned() else {
        return rsx! { Fragment {} };
    };
    let view_box = format!("0 0 {} {}", chart.width, chart.height);

    rsx! {
        div { class: "rounded-2xl border border-slate-800 bg-slate-900/60 backdrop-blur-sm shadow-xl p-6 space-y-3",
            h2 { class: "text-lg font-medium text-slate-200", "Top 5 Active Cities" }
            svg { class: "block w-full", view_box: "{view_box}", width: "100%",
                for bar in chart.bars.iter() {
                    g { key: "{bar.city}",
                        text {
                            x: "{chart.label_width - 8.0}",
                            y: "{bar.y + chart.bar_height / 2.0 + 4.0}",
                            text_anchor: "end",
                            class: "text-slate-300 fill-current text-[12px]",
                            "{bar.city}"
                        }
                        rect { x: "{chart.label_width}", y: "{bar.y}", width: "{bar.width}", height: "{chart.bar_height}", rx: "3", fill: "{bar.color}" }
                        text {
                            x: "{chart.label_width + bar.width + 6.0}",
                            y: "{bar.y + chart.bar_height / 2.0 + 4.0}",
                            class: "text-slate-400 fill-current text-[11px] tabular-nums",
                            "{bar.value}"
                        }
                    }
                }
            }
        }
    }
}
