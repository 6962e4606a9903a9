use dioxus::prelude::*;

/// Display data for one [`MetricsCard`].
#[derive(Debug, Clone, PartialEq)]
pub struct CardModel {
    pub title: &'static str,
    pub value: String,
    pub subtitle: Option<&'static str>,
    pub icon: Option<&'static str>,
}

#[allow(non_snake_case)]
#[component]
pub fn MetricsCard(card: CardModel) -> Element {
    rsx! {
        div { class: "rounded-2xl border border-slate-800 bg-slate-900/60 backdrop-blur-sm shadow-xl p-6 space-y-2",
            div { class: "flex items-center gap-2 text-slate-400",
                if let Some(icon) = card.icon { span { class: "text-xl", "{icon}" } }
                h3 { class: "text-sm font-medium uppercase tracking-wide", "{card.title}" }
            }
            div { class: "text-4xl font-bold text-emerald-400 tabular-nums", "{card.value}" }
            if let Some(subtitle) = card.subtitle { div { class: "text-xs text-slate-400", "{subtitle}" } }
        }
    }
}
