//! Unified artifact persistence: the Parquet (and optional CSV) snapshot of
//! the canonical table that every report reads back.

use super::loader::LoaderError;
use super::schema::{CanonicalColumn, PROCESS_COL, YEAR_COL};
use log::{info, warn};
use polars::prelude::*;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// File stem of the unified artifact inside the preprocessed directory.
pub const UNIFIED_BASENAME: &str = "cnpq_pagamentos_2022_2024";

/// Where a build wrote its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub parquet: PathBuf,
    pub csv: Option<PathBuf>,
}

pub fn parquet_path(dir: &Path) -> PathBuf {
    dir.join(format!("{UNIFIED_BASENAME}.parquet"))
}

pub fn csv_path(dir: &Path) -> PathBuf {
    dir.join(format!("{UNIFIED_BASENAME}.csv"))
}

/// Resolve the CSV toggle: an explicit choice wins, otherwise `WRITE_CSV=1`.
pub fn should_write_csv(explicit: Option<bool>) -> bool {
    explicit.unwrap_or_else(|| {
        env::var("WRITE_CSV")
            .map(|v| v.trim() == "1")
            .unwrap_or(false)
    })
}

/// Reorder so the reference year is the first column.
pub fn year_first(df: &DataFrame) -> PolarsResult<DataFrame> {
    if df.column(YEAR_COL).is_err() {
        return Ok(df.clone());
    }
    let mut order = vec![YEAR_COL];
    order.extend(
        df.get_column_names()
            .into_iter()
            .map(|n| n.as_str())
            .filter(|n| *n != YEAR_COL),
    );
    df.select(order)
}

/// Write the unified table to `dir`, Parquet always and CSV when requested.
pub fn save_preprocessed(
    df: &DataFrame,
    dir: &Path,
    write_csv: Option<bool>,
) -> Result<OutputPaths, LoaderError> {
    fs::create_dir_all(dir)?;
    let mut out = year_first(df)?;
    out.as_single_chunk();

    let parquet = parquet_path(dir);
    let mut file = File::create(&parquet)?;
    ParquetWriter::new(&mut file).finish(&mut out)?;
    info!(
        "Saved unified parquet {} ({} rows x {} cols)",
        parquet.display(),
        out.height(),
        out.width()
    );

    let csv = if should_write_csv(write_csv) {
        let path = csv_path(dir);
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut out)?;
        info!("Saved unified csv {}", path.display());
        Some(path)
    } else {
        None
    };

    Ok(OutputPaths { parquet, csv })
}

/// Read the unified table back, Parquet first and CSV as a fallback.
pub fn load_preprocessed_dataset(dir: &Path) -> Result<DataFrame, LoaderError> {
    let parquet = parquet_path(dir);
    if parquet.exists() {
        let df = ParquetReader::new(File::open(&parquet)?).finish()?;
        info!(
            "Loaded unified parquet {} ({} rows)",
            parquet.display(),
            df.height()
        );
        return Ok(df);
    }

    let csv = csv_path(dir);
    if csv.exists() {
        warn!("Parquet artifact missing, falling back to {}", csv.display());
        let schema = Schema::from_iter([
            Field::new(YEAR_COL.into(), DataType::Int32),
            Field::new(PROCESS_COL.into(), DataType::String),
            Field::new(CanonicalColumn::CpfHash.name().into(), DataType::String),
        ]);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_schema_overwrite(Some(Arc::new(schema)))
            .try_into_reader_with_file_path(Some(csv.clone()))?
            .finish()?;
        return Ok(df);
    }

    Err(LoaderError::DatasetNotFound { parquet, csv })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unified() -> DataFrame {
        df!(
            "PROCESSO" => ["A", "B"],
            "ANO_REFERENCIA" => [2022i32, 2023],
            "CPF_HASH" => ["001", "002"],
            "VALOR_PAGO" => [10.0, 20.5]
        )
        .unwrap()
    }

    #[test]
    fn test_year_first() {
        let reordered = year_first(&unified()).unwrap();
        assert_eq!(reordered.get_column_names()[0].as_str(), "ANO_REFERENCIA");
        assert_eq!(reordered.width(), 4);
    }

    #[test]
    fn test_save_and_load_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = save_preprocessed(&unified(), dir.path(), Some(false)).unwrap();
        assert!(outputs.parquet.ends_with("cnpq_pagamentos_2022_2024.parquet"));
        assert!(outputs.csv.is_none());

        let loaded = load_preprocessed_dataset(dir.path()).unwrap();
        assert_eq!(loaded.get_column_names()[0].as_str(), "ANO_REFERENCIA");
        assert_eq!(loaded.height(), 2);
    }

    #[test]
    fn test_csv_fallback_keeps_key_types() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = save_preprocessed(&unified(), dir.path(), Some(true)).unwrap();
        let csv = outputs.csv.unwrap();
        assert!(csv.exists());
        fs::remove_file(&outputs.parquet).unwrap();

        let loaded = load_preprocessed_dataset(dir.path()).unwrap();
        assert_eq!(loaded.column("ANO_REFERENCIA").unwrap().dtype(), &DataType::Int32);
        assert_eq!(loaded.column("CPF_HASH").unwrap().dtype(), &DataType::String);
        assert_eq!(
            loaded.column("CPF_HASH").unwrap().str().unwrap().get(0),
            Some("001")
        );
    }

    #[test]
    fn test_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_preprocessed_dataset(dir.path()).unwrap_err();
        assert!(matches!(err, LoaderError::DatasetNotFound { .. }));
        assert!(err.to_string().contains("cnpq-payments build"));
    }

    #[test]
    fn test_explicit_csv_choice_wins() {
        assert!(should_write_csv(Some(true)));
        assert!(!should_write_csv(Some(false)));
    }
}
