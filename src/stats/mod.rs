//! Stats module - grouped aggregations and descriptive statistics

pub mod aggregate;
pub mod calculator;

pub use aggregate::{AggregationError, Aggregator, AreaLevel, CategoryMetric, StatePreference};
pub use calculator::{GroupStats, StatsCalculator};
