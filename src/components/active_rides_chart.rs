use dioxus::prelude::*;

use crate::components::chart::{ChartSlot, LineChart};
use crate::shared::types::RidePoint;

#[allow(non_snake_case)]
#[component]
pub fn ActiveRidesChart(data: ReadOnlySignal<Vec<RidePoint>>) -> Element {
    let mut slot = use_signal(ChartSlot::<LineChart>::default);

    // Rebuild whenever the series changes
    use_effect(move || {
        let points = data.read();
        slot.write().sync(points.as_slice(), LineChart::build);
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
    let label_y = chart.height - chart.padding + 16.0;
    let last_x = chart.width - chart.padding;

    rsx! {
        div { class: "rounded-2xl border border-slate-800 bg-slate-900/60 backdrop-blur-sm shadow-xl p-6 space-y-3",
            div { class: "flex items-end justify-between",
                h2 { class: "text-lg font-medium text-slate-200", "Active Rides Over Time" }
                div { class: "text-xs text-slate-400", "Peak: {chart.max_value}" }
            }
            svg { class: "block w-full", view_box: "{view_box}", width: "100%",
                line { x1: "{chart.padding}", y1: "{chart.height - chart.padding}", x2: "{last_x}", y2: "{chart.height - chart.padding}", stroke: "#1f2937", stroke_width: "1" }
                path { d: "{chart.area_path}", fill: "rgba(54,162,235,0.2)", stroke: "none" }
                path { d: "{chart.line_path}", fill: "none", stroke: "#36A2EB", stroke_width: "2", stroke_linejoin: "round" }
                for (i, (x, y)) in chart.points.iter().enumerate() {
                    circle { key: "{i}", cx: "{x}", cy: "{y}", r: "3", fill: "#36A2EB" }
                }
                text { x: "{chart.padding}", y: "{label_y}", class: "text-slate-400 fill-current text-[10px]", "{chart.first_label}" }
                if chart.points.len() > 1 {
                    text { x: "{last_x}", y: "{label_y}", text_anchor: "end", class: "text-slate-400 fill-current text-[10px]", "{chart.last_label}" }
                }
            }
        }
    }
}
