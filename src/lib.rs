// Snackonomics - Core Library
// Pricing/elasticity engine plus the observation store and trend reports,
// shared by the CLI, the dashboard, and the API server

pub mod db;
pub mod pricing;
pub mod report;

// Re-export commonly used types
pub use db::{
    export_csv, import_csv, insert_observation, latest_observation, observation_count,
    observations_since, setup_database, update_latest_elasticity, Observation,
};
pub use pricing::{
    classify, elasticity, final_price, monthly_volume, projected_profit, unit_cost, Category,
    Classification, PricingError, DAYS_PER_MONTH, WEEKS_PER_MONTH,
};
pub use report::{filter_by_period, Period, TrendReport, TrendSummary, WeeklySales};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
