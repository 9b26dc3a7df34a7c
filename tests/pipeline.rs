mod common;

use cnpq_payments::data::schema::canonical_names;
use cnpq_payments::data::{load_preprocessed_dataset, Encoding, LoaderError};
use cnpq_payments::{build_preprocessed, BuildOptions, PipelineError};
use polars::prelude::*;
use std::fs;

fn parquet_only() -> BuildOptions {
    BuildOptions {
        write_csv: Some(false),
        use_cache: true,
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect()
}

#[test]
fn test_build_unifies_three_layouts() {
    let root = tempfile::tempdir().unwrap();
    common::write_raw_exports(root.path());
    let config = common::config_for(root.path());

    let output = build_preprocessed(&config, parquet_only()).unwrap();
    let df = &output.unified;

    assert_eq!(column_names(df), canonical_names());
    assert_eq!(df.width(), 29);
    // 4 + 2 + 1 data rows, one of them with no year, process or amount
    assert_eq!(df.height(), 6);

    let years: Vec<Option<i32>> = df
        .column("ANO_REFERENCIA")
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        years,
        vec![Some(2022), Some(2022), Some(2023), Some(2023), Some(2024), None]
    );

    let processes: Vec<Option<&str>> = df
        .column("PROCESSO")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        processes,
        vec![
            Some("100/2022"),
            Some("200/2022"),
            Some("050/2023"),
            Some("300/2023"),
            Some("400/2024"),
            None
        ]
    );

    let amounts: Vec<Option<f64>> = df
        .column("VALOR_PAGO")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        amounts,
        vec![
            Some(300.0),
            Some(1200.5),
            Some(600.0),
            Some(8100.0),
            Some(300.0),
            Some(10.0)
        ]
    );
}

#[test]
fn test_build_normalizes_values_per_year() {
    let root = tempfile::tempdir().unwrap();
    common::write_raw_exports(root.path());
    let config = common::config_for(root.path());
    let df = build_preprocessed(&config, parquet_only()).unwrap().unified;

    let names = df.column("BENEFICIARIO").unwrap().str().unwrap();
    // Latin-1 accents survive decoding and names keep their case
    assert_eq!(names.get(0), Some("João Lima"));

    let uf = df.column("SIGLA_UF_DESTINO").unwrap().str().unwrap();
    assert_eq!(uf.get(0), Some("RJ"));
    assert_eq!(uf.get(1), Some("SP"));

    let category = df.column("MODALIDADE").unwrap().str().unwrap();
    assert_eq!(category.get(1), Some("GD"));

    // Legacy-only column is filled for 2022 and null afterwards
    let uo = df.column("UO").unwrap().str().unwrap();
    assert_eq!(uo.get(0), Some("20501"));
    assert_eq!(uo.get(2), None);

    let cpf = df.column("CPF_HASH").unwrap().str().unwrap();
    assert_eq!(cpf.get(0), None);
    assert_eq!(cpf.get(2), Some("***456***"));
    assert_eq!(cpf.get(4), Some("***789***"));

    let region = df.column("REGIAO_DESTINO").unwrap().str().unwrap();
    assert_eq!(region.get(2), Some("NORDESTE"));

    let start = df
        .column("DATA_INICIO_PROCESSO")
        .unwrap()
        .cast(&DataType::String)
        .unwrap();
    let start = start.str().unwrap();
    assert_eq!(start.get(4), Some("2024-03-01"));
    assert_eq!(start.get(0), None);
}

#[test]
fn test_build_writes_artifacts_and_cache() {
    let root = tempfile::tempdir().unwrap();
    common::write_raw_exports(root.path());
    let config = common::config_for(root.path());

    let output = build_preprocessed(
        &config,
        BuildOptions {
            write_csv: Some(true),
            use_cache: true,
        },
    )
    .unwrap();

    assert!(output.outputs.parquet.exists());
    let csv = output.outputs.csv.clone().unwrap();
    assert!(csv.exists());
    let header = fs::read_to_string(&csv).unwrap();
    assert!(header.starts_with("ANO_REFERENCIA,"));

    for year in [2022, 2023, 2024] {
        let cached = config
            .paths
            .data_yearly_cache
            .join(format!("cnpq_pagamentos_{year}.parquet"));
        assert!(cached.exists(), "missing cache for {year}");
    }

    let loaded = load_preprocessed_dataset(&config.paths.data_preprocessed).unwrap();
    assert!(loaded.equals_missing(&output.unified));
}

#[test]
fn test_cached_rebuild_is_byte_identical() {
    let root = tempfile::tempdir().unwrap();
    common::write_raw_exports(root.path());
    let config = common::config_for(root.path());

    let fresh = build_preprocessed(
        &config,
        BuildOptions {
            write_csv: Some(false),
            use_cache: false,
        },
    )
    .unwrap();
    let fresh_bytes = fs::read(&fresh.outputs.parquet).unwrap();

    // Raw files are gone, so only the cache can serve the second and third runs
    fs::write(root.path().join("data/raw").join(common::FILE_2022), b"").unwrap();
    fs::write(root.path().join("data/raw").join(common::FILE_2023), b"").unwrap();
    fs::write(root.path().join("data/raw").join(common::FILE_2024), b"").unwrap();

    for _ in 0..2 {
        let cached = build_preprocessed(&config, parquet_only()).unwrap();
        assert!(cached.unified.equals_missing(&fresh.unified));
        assert_eq!(fs::read(&cached.outputs.parquet).unwrap(), fresh_bytes);
    }
}

#[test]
fn test_missing_year_files_fail_fast() {
    let root = tempfile::tempdir().unwrap();
    common::write_raw_exports(root.path());
    let raw = root.path().join("data/raw");
    fs::remove_file(raw.join(common::FILE_2023)).unwrap();
    fs::remove_file(raw.join(common::FILE_2024)).unwrap();
    let config = common::config_for(root.path());

    let err = build_preprocessed(&config, parquet_only()).unwrap_err();
    match err {
        PipelineError::Loader(LoaderError::MissingFiles { years, .. }) => {
            assert_eq!(years, vec![2023, 2024]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unreadable_file_reports_every_encoding() {
    let root = tempfile::tempdir().unwrap();
    common::write_raw_exports(root.path());
    fs::write(root.path().join("data/raw").join(common::FILE_2024), b"").unwrap();
    let config = common::config_for(root.path());

    let err = build_preprocessed(&config, parquet_only()).unwrap_err();
    match err {
        PipelineError::Loader(LoaderError::UnreadableEncoding { attempts, .. }) => {
            let tried: Vec<Encoding> = attempts.iter().map(|(enc, _)| *enc).collect();
            assert_eq!(tried, Encoding::FALLBACK_ORDER.to_vec());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_report_without_build_is_dataset_not_found() {
    let root = tempfile::tempdir().unwrap();
    let config = common::config_for(root.path());
    let err = load_preprocessed_dataset(&config.paths.data_preprocessed).unwrap_err();
    assert!(matches!(err, LoaderError::DatasetNotFound { .. }));
}
