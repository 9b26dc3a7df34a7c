//! Type Coercer Module
//! Applies canonical typing to a column-mapped frame.
//!
//! Every per-value failure degrades to null; only structural polars errors
//! (wrong physical type on a column) are returned.

use super::currency::parse_currency_column;
use super::schema::{CanonicalColumn, FieldKind, AMOUNT_COL, YEAR_COL};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{info, warn};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;

/// Days from 0001-01-01 (CE) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Datetime layouts tried before bare dates; day-first wins over month-first.
///
/// `%Y` accepts a year of one to four digits, so each two-digit `%y` layout
/// must come before its `%Y` twin. `%y` never consumes more than two digits.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d/%m/%Y",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%d.%m.%y",
    "%d.%m.%Y",
    "%Y-%m-%d",
];

static YEAR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{4}").expect("year pattern is valid"));
static NON_ALPHA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z]").expect("state code pattern is valid"));

/// Parse a day-first date, with or without a time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

/// First run of four digits in the text, e.g. `"Ano 2023 (parcial)"` -> 2023.
pub fn extract_year(raw: &str) -> Option<i32> {
    YEAR_RUN.find(raw).and_then(|m| m.as_str().parse().ok())
}

/// Upper-case, keep only A-Z, truncate to 3 characters.
pub fn normalize_state_code(raw: &str) -> String {
    let upper = raw.to_uppercase();
    NON_ALPHA.replace_all(&upper, "").chars().take(3).collect()
}

fn coerce_dates(column: &Column) -> PolarsResult<Column> {
    let text = column.cast(&DataType::String)?;
    let days: Int32Chunked = text
        .str()?
        .into_iter()
        .map(|v| {
            v.and_then(parse_date)
                .map(|d| d.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
        })
        .collect();
    Ok(days
        .with_name(column.name().clone())
        .into_date()
        .into_series()
        .into_column())
}

fn coerce_text(column: &Column, upper: bool) -> PolarsResult<Column> {
    let text = column.cast(&DataType::String)?;
    let out: StringChunked = text
        .str()?
        .into_iter()
        .map(|v| {
            v.map(|s| {
                let trimmed = s.trim();
                if upper {
                    trimmed.to_uppercase()
                } else {
                    trimmed.to_string()
                }
            })
        })
        .collect();
    Ok(out.with_name(column.name().clone()).into_column())
}

fn coerce_state_codes(column: &Column) -> PolarsResult<Column> {
    let text = column.cast(&DataType::String)?;
    let out: StringChunked = text
        .str()?
        .into_iter()
        .map(|v| v.map(normalize_state_code))
        .collect();
    Ok(out.with_name(column.name().clone()).into_column())
}

fn coerce_year(column: &Column) -> PolarsResult<Column> {
    let text = column.cast(&DataType::String)?;
    let years: Int32Chunked = text
        .str()?
        .into_iter()
        .map(|v| v.and_then(extract_year))
        .collect();
    Ok(years.with_name(column.name().clone()).into_column())
}

fn coerce_amount(column: &Column) -> PolarsResult<Column> {
    let before = column.len() - column.null_count();
    let parsed = parse_currency_column(column)?;
    let after = parsed.len() - parsed.null_count();
    info!("Parsed {AMOUNT_COL}: {before} non-null before, {after} after");
    if after < before {
        warn!(
            "{} {AMOUNT_COL} values could not be parsed and became null",
            before - after
        );
    }
    Ok(parsed)
}

/// Coerce one column according to its canonical kind.
pub fn coerce_column(column: &Column, kind: FieldKind) -> PolarsResult<Column> {
    match kind {
        FieldKind::Year => coerce_year(column),
        FieldKind::Date => coerce_dates(column),
        FieldKind::Amount => coerce_amount(column),
        FieldKind::StateCode => coerce_state_codes(column),
        FieldKind::UpperText => coerce_text(column, true),
        FieldKind::Text => coerce_text(column, false),
    }
}

/// Apply canonical typing to a column-mapped frame, returning a new frame.
///
/// Columns outside the canonical schema pass through untouched.
pub fn coerce_types(df: &DataFrame) -> PolarsResult<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| match CanonicalColumn::from_name(column.name().as_str()) {
            Some(canonical) => coerce_column(column, canonical.kind()),
            None => Ok(column.clone()),
        })
        .collect::<PolarsResult<Vec<_>>>()?;

    let out = DataFrame::new(columns)?;

    if out.column(AMOUNT_COL).is_err() {
        warn!("Column {AMOUNT_COL} missing, nothing to parse");
    }
    match out.column(YEAR_COL) {
        Ok(years) => {
            let distinct: BTreeSet<i32> = years.i32()?.into_iter().flatten().collect();
            info!("Parsed {YEAR_COL}: distinct years {distinct:?}");
        }
        Err(_) => warn!("Column {YEAR_COL} missing, no years extracted"),
    }

    Ok(out)
}
