//! CNPq scholarship payments ETL.
//!
//! Reads the three yearly payment exports, harmonizes them onto one canonical
//! table and serves grouped aggregations for dashboards.

pub mod config;
pub mod data;
pub mod logging;
pub mod pipeline;
pub mod stats;

pub use config::{AppConfig, ConfigError};
pub use pipeline::{build_preprocessed, BuildOptions, BuildOutput, PipelineError};
