use dioxus::prelude::*;

use crate::components::Dashboard;
use crate::config::DashboardConfig;
use crate::TAILWIND_CSS;

#[allow(non_snake_case)]
#[component]
pub fn App() -> Element {
    use_context_provider(DashboardConfig::load);

    rsx! {
        document::Stylesheet { href: TAILWIND_CSS }
        document::Title { "StreamRide Analytics" }
        document::Meta { name: "theme-color", content: "#020618" } // slate-950
        document::Meta { name: "color-scheme", content: "dark" }
        div { class: "min-h-screen bg-slate-950 text-slate-100 p-6",
            Dashboard {}
        }
    }
}
