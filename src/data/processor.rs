//! Data Processor Module
//! Unifies the per-year canonical frames and offers the row filters used by
//! the aggregation layer.

use super::mapping::SourceYear;
use super::schema::{canonical_names, AMOUNT_COL, PROCESS_COL, YEAR_COL};
use log::info;
use polars::prelude::*;

/// Handles unification and filtering of canonical frames.
pub struct DataProcessor;

impl DataProcessor {
    /// Stack the yearly frames in the given order, drop key-less rows and sort.
    ///
    /// A row is dropped only when year, process and paid amount are all null.
    /// Rows are ordered by (year, process), nulls last, ties keeping input order.
    pub fn unify(frames: &[(SourceYear, DataFrame)]) -> PolarsResult<DataFrame> {
        let years: Vec<String> = frames.iter().map(|(y, _)| y.to_string()).collect();
        info!("Unifying yearly frames {years:?}");

        let columns = canonical_names();
        let mut aligned = frames.iter().map(|(_, df)| df.select(columns.iter().copied()));
        let mut out = match aligned.next() {
            Some(first) => first?,
            None => return DataFrame::new(Vec::new()),
        };
        for next in aligned {
            out.vstack_mut(&next?)?;
        }
        out.as_single_chunk();
        info!("Concatenated: {} rows x {} cols", out.height(), out.width());

        let out = Self::drop_keyless_rows(&out)?;
        info!("After dropping key-less rows: {} rows", out.height());

        let sorted = out.sort(
            [YEAR_COL, PROCESS_COL],
            SortMultipleOptions::default()
                .with_nulls_last(true)
                .with_maintain_order(true),
        )?;
        info!("Sorted by {YEAR_COL}, {PROCESS_COL}: {} rows", sorted.height());
        Ok(sorted)
    }

    /// Remove rows where year, process id and paid amount are simultaneously null.
    pub fn drop_keyless_rows(df: &DataFrame) -> PolarsResult<DataFrame> {
        let year_null = df.column(YEAR_COL)?.is_null();
        let process_null = df.column(PROCESS_COL)?.is_null();
        let amount_null = df.column(AMOUNT_COL)?.is_null();
        let keyless = &(&year_null & &process_null) & &amount_null;
        df.filter(&!keyless)
    }

    /// Keep rows of a single reference year; `None` keeps everything.
    pub fn filter_by_year(df: &DataFrame, year: Option<i32>) -> PolarsResult<DataFrame> {
        let Some(year) = year else {
            return Ok(df.clone());
        };
        df.clone()
            .lazy()
            .filter(col(YEAR_COL).cast(DataType::Int32).eq(lit(year)))
            .collect()
    }

    /// Keep rows whose `column` equals `value`.
    pub fn filter_by_value(df: &DataFrame, column: &str, value: &str) -> PolarsResult<DataFrame> {
        df.clone()
            .lazy()
            .filter(col(column).eq(lit(value)))
            .collect()
    }
}
