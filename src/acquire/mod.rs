pub mod fetch;
pub mod polling;

pub use polling::use_metrics;
