pub mod active_rides_chart;
pub mod chart;
pub mod dashboard;
pub mod metrics_card;
pub mod top_cities_chart;

pub use active_rides_chart::ActiveRidesChart;
pub use dashboard::Dashboard;
pub use metrics_card::{CardModel, MetricsCard};
pub use top_cities_chart::TopCitiesChart;
