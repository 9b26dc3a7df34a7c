//! Per-year Parquet cache of coerced canonical frames.

use super::loader::LoaderError;
use super::mapping::SourceYear;
use super::schema::canonical_names;
use log::{info, warn};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::PathBuf;

/// Directory of `cnpq_pagamentos_<year>.parquet` snapshots.
#[derive(Debug, Clone)]
pub struct YearlyCache {
    dir: PathBuf,
}

impl YearlyCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, year: SourceYear) -> PathBuf {
        self.dir.join(format!("cnpq_pagamentos_{}.parquet", year.year()))
    }

    /// Load the cached frame for `year`, or `None` on a cache miss.
    ///
    /// A snapshot whose columns are not the canonical layout is treated as a miss.
    pub fn load(&self, year: SourceYear) -> Result<Option<DataFrame>, LoaderError> {
        let path = self.path_for(year);
        if !path.exists() {
            return Ok(None);
        }

        let df = ParquetReader::new(File::open(&path)?).finish()?;
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        if names != canonical_names() {
            warn!(
                "Ignoring stale cache {} for {year}: unexpected columns",
                path.display()
            );
            return Ok(None);
        }

        info!(
            "Loaded {year} from cache {} ({} rows x {} cols)",
            path.display(),
            df.height(),
            df.width()
        );
        Ok(Some(df))
    }

    /// Write the coerced frame for `year`, creating the directory if needed.
    pub fn save(&self, year: SourceYear, df: &mut DataFrame) -> Result<PathBuf, LoaderError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(year);
        let mut file = File::create(&path)?;
        ParquetWriter::new(&mut file).finish(df)?;
        info!(
            "Saved {year} cache {} ({} rows x {} cols)",
            path.display(),
            df.height(),
            df.width()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::coerce::coerce_types;
    use crate::data::mapping::map_columns;

    fn canonical_frame() -> DataFrame {
        let raw = df!(
            "ANO_REFERENCIA" => ["2023"],
            "PROCESSO" => ["1"],
            "VALOR_PAGO" => ["600,00"]
        )
        .unwrap();
        let mapped = map_columns(&raw, SourceYear::Y2023.rename_table()).unwrap();
        coerce_types(&mapped).unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = YearlyCache::new(dir.path().join("yearly"));
        assert!(cache.load(SourceYear::Y2023).unwrap().is_none());

        let mut df = canonical_frame();
        let path = cache.save(SourceYear::Y2023, &mut df).unwrap();
        assert!(path.ends_with("cnpq_pagamentos_2023.parquet"));

        let loaded = cache.load(SourceYear::Y2023).unwrap().unwrap();
        assert!(loaded.equals_missing(&df));
        assert!(cache.load(SourceYear::Y2024).unwrap().is_none());
    }

    #[test]
    fn test_stale_layout_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = YearlyCache::new(dir.path());
        let mut stale = df!("PROCESSO" => ["1"]).unwrap();
        cache.save(SourceYear::Y2022, &mut stale).unwrap();
        assert!(cache.load(SourceYear::Y2022).unwrap().is_none());
    }
}
