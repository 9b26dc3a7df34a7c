//! Configuration Module
//! Loads `config.json` from the project root and resolves the data directories.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Logical directory names used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_raw: PathBuf,
    pub data_preprocessed: PathBuf,
    pub data_yearly_cache: PathBuf,
    pub logs: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_raw: PathBuf::from("data/raw"),
            data_preprocessed: PathBuf::from("data/preprocessed"),
            data_yearly_cache: PathBuf::from("data/preprocessed/yearly"),
            logs: PathBuf::from("logs"),
        }
    }
}

impl PathsConfig {
    fn resolve(self, root: &Path) -> Self {
        let join = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };
        Self {
            data_raw: join(self.data_raw),
            data_preprocessed: join(self.data_preprocessed),
            data_yearly_cache: join(self.data_yearly_cache),
            logs: join(self.logs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    /// `None` defers to the `WRITE_CSV` environment toggle.
    pub write_csv: Option<bool>,
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            write_csv: None,
            log_to_file: true,
        }
    }
}

impl AppConfig {
    pub const FILE_NAME: &'static str = "config.json";

    /// Read `<root>/config.json` (defaults when absent) with every path made
    /// absolute against `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(Self::FILE_NAME);
        let config = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<AppConfig>(&text)
                .map_err(|source| ConfigError::Json { path, source })?
        } else {
            AppConfig::default()
        };
        Ok(config.resolved(root))
    }

    pub fn resolved(self, root: &Path) -> Self {
        Self {
            paths: self.paths.resolve(root),
            ..self
        }
    }

    /// Create every output directory that does not exist yet.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.paths.data_preprocessed,
            &self.paths.data_yearly_cache,
            &self.paths.logs,
        ] {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
