use dioxus::prelude::*;

mod acquire;
mod app;
mod components;
mod config;
mod error;
mod push;
mod shared;
mod state;
mod utils;

pub const TAILWIND_CSS: Asset = asset!("/assets/tailwind.css");

#[cfg(not(target_arch = "wasm32"))]
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tungstenite=warn,tokio_tungstenite=warn"));
    // Dioxus may have installed its own subscriber already
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        dotenvy::dotenv().ok();
        init_tracing();
    }
    dioxus::launch(app::App);
}
