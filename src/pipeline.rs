//! Build pipeline: discover -> load (cached) -> unify -> persist.

use crate::config::{AppConfig, ConfigError};
use crate::data::{
    save_preprocessed, DataLoader, DataProcessor, LoaderError, OutputPaths, YearlyCache,
};
use log::info;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Overrides the configured CSV toggle when set.
    pub write_csv: Option<bool>,
    /// Reuse per-year snapshots; when false they are rebuilt and overwritten.
    pub use_cache: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            write_csv: None,
            use_cache: true,
        }
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub unified: DataFrame,
    pub outputs: OutputPaths,
}

pub fn build_preprocessed(
    config: &AppConfig,
    options: BuildOptions,
) -> Result<BuildOutput, PipelineError> {
    config.ensure_dirs()?;
    let paths = &config.paths;

    let loader = DataLoader::new(YearlyCache::new(&paths.data_yearly_cache))
        .with_cache_reads(options.use_cache);
    let frames = loader.load_all(&paths.data_raw)?;

    let unified = DataProcessor::unify(&frames)?;
    let write_csv = options.write_csv.or(config.write_csv);
    let outputs = save_preprocessed(&unified, &paths.data_preprocessed, write_csv)?;
    info!(
        "Build finished: {} rows x {} cols",
        unified.height(),
        unified.width()
    );

    Ok(BuildOutput { unified, outputs })
}
