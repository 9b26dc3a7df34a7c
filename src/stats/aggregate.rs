//! Aggregation Module
//! Grouped totals and means over the unified payments table, shaped for the
//! dashboard charts.
//!
//! Every query takes the table by reference and builds a fresh frame. Group
//! keys are accumulated in ascending order and the final stable sort by value
//! keeps that order among ties.

use crate::data::coerce::normalize_state_code;
use crate::data::schema::{
    AMOUNT_COL, BENEFICIARY_COL, CATEGORY_COL, PROCESS_COL, REGION_COL, UF_DEST_COL,
    UF_ORIGIN_COL, YEAR_COL,
};
use crate::data::DataProcessor;
use log::info;
use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Legacy region column name found in some exports.
const LEGACY_REGION_COL: &str = "REGIAO";

/// Placeholder names used by the source for withheld beneficiaries.
const CENSORED_NAMES: [&str; 2] = ["XXXX", "XXX XXX XXX"];

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("column '{0}' missing from dataset")]
    MissingColumn(String),
    #[error("no state code column (SIGLA_UF_DESTINO / SIGLA_UF_ORIGEM) in dataset")]
    NoStateColumn,
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type AggResult<T> = Result<T, AggregationError>;

/// Which state-code column drives per-state views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatePreference {
    Destination,
    Origin,
    #[default]
    Auto,
}

/// Granularity of the knowledge-area hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaLevel {
    GrandeArea,
    #[default]
    Area,
    Subarea,
}

impl AreaLevel {
    pub fn column(self) -> &'static str {
        match self {
            AreaLevel::GrandeArea => "GRANDE_AREA",
            AreaLevel::Area => "AREA",
            AreaLevel::Subarea => "SUBAREA",
        }
    }
}

/// How investment per category is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryMetric {
    #[default]
    Sum,
    /// Mean over beneficiaries of each beneficiary's total.
    PerBeneficiaryMean,
    /// Mean over processes of each process's total.
    PerProcessMean,
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    rows: u32,
    valued: u32,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value {
            self.sum += v;
            self.valued += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.valued > 0).then(|| self.sum / self.valued as f64)
    }
}

/// Descending by value, nulls last.
fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn require<'a>(df: &'a DataFrame, name: &str) -> AggResult<&'a Column> {
    df.column(name)
        .map_err(|_| AggregationError::MissingColumn(name.to_string()))
}

fn text(df: &DataFrame, name: &str) -> AggResult<StringChunked> {
    let column = require(df, name)?.cast(&DataType::String)?;
    Ok(column.str()?.clone())
}

/// Paid amounts as Float64; non-numeric values become null.
fn amounts(df: &DataFrame) -> AggResult<Float64Chunked> {
    let column = require(df, AMOUNT_COL)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.clone())
}

fn for_year(df: &DataFrame, year: Option<i32>) -> AggResult<DataFrame> {
    if year.is_some() {
        require(df, YEAR_COL)?;
    }
    Ok(DataProcessor::filter_by_year(df, year)?)
}

fn accumulate(keys: &StringChunked, values: &Float64Chunked) -> BTreeMap<String, Accumulator> {
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for (key, value) in keys.into_iter().zip(values) {
        if let Some(key) = key {
            groups.entry(key.to_string()).or_default().push(value);
        }
    }
    groups
}

fn keyed_frame(
    key_name: &str,
    value_name: &str,
    count_name: &str,
    mut rows: Vec<(String, Option<f64>, u32)>,
) -> PolarsResult<DataFrame> {
    rows.sort_by(|a, b| descending(a.1, b.1));
    let mut keys = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len());
    let mut counts = Vec::with_capacity(rows.len());
    for (key, value, count) in rows {
        keys.push(key);
        values.push(value);
        counts.push(count);
    }
    DataFrame::new(vec![
        Column::new(key_name.into(), keys),
        Column::new(value_name.into(), values),
        Column::new(count_name.into(), counts),
    ])
}

/// Sum of paid amounts per group with row counts, largest first.
fn totals_by(df: &DataFrame, group_col: &str, key_name: &str) -> AggResult<DataFrame> {
    let keys = text(df, group_col)?;
    let values = amounts(df)?;
    let rows = accumulate(&keys, &values)
        .into_iter()
        .map(|(key, acc)| (key, Some(acc.sum), acc.rows))
        .collect();
    Ok(keyed_frame(key_name, "valor_total", "n_linhas", rows)?)
}

/// Grouped queries over the unified table.
pub struct Aggregator;

impl Aggregator {
    /// Distinct reference years, ascending.
    pub fn list_available_years(df: &DataFrame) -> Vec<i32> {
        let Ok(column) = df.column(YEAR_COL) else {
            return Vec::new();
        };
        let years: BTreeSet<i32> = column
            .cast(&DataType::Int32)
            .ok()
            .and_then(|c| c.i32().ok().map(|ca| ca.into_iter().flatten().collect()))
            .unwrap_or_default();
        let years: Vec<i32> = years.into_iter().collect();
        info!("Years available: {years:?}");
        years
    }

    /// Human-readable warnings about gaps in the dataset.
    pub fn dataset_notes(df: &DataFrame) -> Vec<String> {
        let mut notes = Vec::new();

        match df.column(AMOUNT_COL) {
            Err(_) => notes.push(format!("Column '{AMOUNT_COL}' is missing from the dataset.")),
            Ok(column) if column.null_count() == column.len() => notes.push(format!(
                "Every '{AMOUNT_COL}' value is empty; check the currency conversion."
            )),
            Ok(_) => {}
        }

        if df.column(YEAR_COL).is_err() {
            notes.push(format!("Column '{YEAR_COL}' is missing from the dataset."));
        } else if Self::list_available_years(df).is_empty() {
            notes.push(format!("No valid '{YEAR_COL}' found."));
        }

        if df.column(UF_DEST_COL).is_err() && df.column(UF_ORIGIN_COL).is_err() {
            notes.push(format!(
                "State code columns are missing ({UF_DEST_COL} / {UF_ORIGIN_COL})."
            ));
        }

        notes
    }

    /// Pick the state-code column for per-state views.
    ///
    /// A forced preference wins when its column exists. In automatic mode the
    /// column with more non-null values wins, destination on ties.
    pub fn choose_state_column(
        df: &DataFrame,
        preference: StatePreference,
    ) -> AggResult<&'static str> {
        let dest = df.column(UF_DEST_COL).ok();
        let origin = df.column(UF_ORIGIN_COL).ok();

        let chosen = match (preference, dest, origin) {
            (StatePreference::Destination, Some(_), _) => UF_DEST_COL,
            (StatePreference::Origin, _, Some(_)) => UF_ORIGIN_COL,
            (_, Some(d), Some(o)) => {
                let nd = d.len() - d.null_count();
                let no = o.len() - o.null_count();
                if nd >= no {
                    UF_DEST_COL
                } else {
                    UF_ORIGIN_COL
                }
            }
            (_, Some(_), None) => UF_DEST_COL,
            (_, None, Some(_)) => UF_ORIGIN_COL,
            (_, None, None) => return Err(AggregationError::NoStateColumn),
        };
        info!("State column chosen: {chosen} ({preference:?})");
        Ok(chosen)
    }

    /// Mean paid amount per state for one year: `[UF, media_valor_pago, n]`.
    pub fn mean_by_state_for_year(
        df: &DataFrame,
        year: i32,
        preference: StatePreference,
    ) -> AggResult<DataFrame> {
        require(df, YEAR_COL)?;
        require(df, AMOUNT_COL)?;
        let state_col = Self::choose_state_column(df, preference)?;

        let filtered = for_year(df, Some(year))?;
        let states: StringChunked = text(&filtered, state_col)?
            .into_iter()
            .map(|v| v.map(normalize_state_code))
            .collect();
        let values = amounts(&filtered)?;

        let rows = accumulate(&states, &values)
            .into_iter()
            .map(|(key, acc)| (key, acc.mean(), acc.rows))
            .collect();
        Ok(keyed_frame("UF", "media_valor_pago", "n", rows)?)
    }

    /// Total paid per region: `[REGIAO, valor_total, n_linhas]`.
    ///
    /// Falls back to a legacy region column, then to a state-code column.
    pub fn total_by_region(
        df: &DataFrame,
        year: Option<i32>,
        prefer_destination: bool,
    ) -> AggResult<DataFrame> {
        let has = |name: &str| df.column(name).is_ok();
        let group_col = if has(REGION_COL) {
            REGION_COL
        } else if has(LEGACY_REGION_COL) {
            LEGACY_REGION_COL
        } else if prefer_destination && has(UF_DEST_COL) {
            UF_DEST_COL
        } else if has(UF_ORIGIN_COL) {
            UF_ORIGIN_COL
        } else if has(UF_DEST_COL) {
            UF_DEST_COL
        } else {
            return Err(AggregationError::MissingColumn(REGION_COL.to_string()));
        };

        let filtered = for_year(df, year)?;
        totals_by(&filtered, group_col, "REGIAO")
    }

    /// Total paid per knowledge area: `[<level>, valor_total, n_linhas]`.
    pub fn total_by_area(
        df: &DataFrame,
        year: Option<i32>,
        level: AreaLevel,
    ) -> AggResult<DataFrame> {
        require(df, level.column())?;
        let filtered = for_year(df, year)?;
        totals_by(&filtered, level.column(), level.column())
    }

    /// Investment per category: `[MODALIDADE, valor_em_reais, n_unicos]`.
    ///
    /// For the per-entity metrics `n_unicos` counts distinct entities and the
    /// value is the mean of per-entity totals, so an entity with many small
    /// payments weighs the same as one with a single payment.
    pub fn invest_by_category(
        df: &DataFrame,
        year: Option<i32>,
        how: CategoryMetric,
    ) -> AggResult<DataFrame> {
        require(df, CATEGORY_COL)?;
        let entity_col = match how {
            CategoryMetric::Sum => None,
            CategoryMetric::PerBeneficiaryMean => Some(BENEFICIARY_COL),
            CategoryMetric::PerProcessMean => Some(PROCESS_COL),
        };
        if let Some(entity_col) = entity_col {
            require(df, entity_col)?;
        }

        let filtered = for_year(df, year)?;
        let categories = text(&filtered, CATEGORY_COL)?;
        let values = amounts(&filtered)?;

        let rows = match entity_col {
            None => accumulate(&categories, &values)
                .into_iter()
                .map(|(key, acc)| (key, Some(acc.sum), acc.rows))
                .collect(),
            Some(entity_col) => {
                let censor = how == CategoryMetric::PerBeneficiaryMean;
                let entities = text(&filtered, entity_col)?;
                let mut per_entity: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
                for ((category, entity), value) in
                    categories.into_iter().zip(&entities).zip(&values)
                {
                    let (Some(category), Some(entity)) = (category, entity) else {
                        continue;
                    };
                    if censor && CENSORED_NAMES.contains(&entity) {
                        continue;
                    }
                    *per_entity
                        .entry(category.to_string())
                        .or_default()
                        .entry(entity.to_string())
                        .or_insert(0.0) += value.unwrap_or(0.0);
                }
                per_entity
                    .into_iter()
                    .map(|(category, totals)| {
                        let n = totals.len();
                        let mean = totals.values().sum::<f64>() / n as f64;
                        (category, Some(mean), n as u32)
                    })
                    .collect()
            }
        };

        Ok(keyed_frame(CATEGORY_COL, "valor_em_reais", "n_unicos", rows)?)
    }

    fn box_rows(
        df: &DataFrame,
        year: Option<i32>,
        columns: &[&str],
        equals: &[(&str, Option<&str>)],
    ) -> AggResult<DataFrame> {
        for name in columns {
            require(df, name)?;
        }
        let mut filtered = for_year(df, year)?;
        for (name, value) in equals {
            if let Some(value) = value {
                filtered = DataProcessor::filter_by_value(&filtered, name, value)?;
            }
        }

        let mut lf = filtered
            .lazy()
            .with_column(col(AMOUNT_COL).cast(DataType::Float64));
        // Grouping columns and the amount must be present for a box plot
        let not_null = columns
            .iter()
            .filter(|name| **name != YEAR_COL && **name != PROCESS_COL)
            .map(|name| col(*name).is_not_null())
            .reduce(|acc, e| acc.and(e));
        if let Some(predicate) = not_null {
            lf = lf.filter(predicate);
        }
        let selection: Vec<Expr> = columns.iter().map(|name| col(*name)).collect();
        Ok(lf.select(selection).collect()?)
    }

    /// Row-level amounts per category for box plots.
    pub fn box_data_by_category(
        df: &DataFrame,
        year: Option<i32>,
        category: Option<&str>,
    ) -> AggResult<DataFrame> {
        Self::box_rows(
            df,
            year,
            &[YEAR_COL, PROCESS_COL, CATEGORY_COL, AMOUNT_COL],
            &[(CATEGORY_COL, category)],
        )
    }

    /// Row-level amounts per knowledge area for box plots.
    pub fn box_data_by_area(
        df: &DataFrame,
        year: Option<i32>,
        level: AreaLevel,
        level_value: Option<&str>,
    ) -> AggResult<DataFrame> {
        Self::box_rows(
            df,
            year,
            &[YEAR_COL, PROCESS_COL, level.column(), AMOUNT_COL],
            &[(level.column(), level_value)],
        )
    }

    pub fn box_data_by_area_and_category(
        df: &DataFrame,
        year: Option<i32>,
        level: AreaLevel,
        level_value: Option<&str>,
        category: Option<&str>,
    ) -> AggResult<DataFrame> {
        Self::box_rows(
            df,
            year,
            &[YEAR_COL, PROCESS_COL, CATEGORY_COL, level.column(), AMOUNT_COL],
            &[(level.column(), level_value), (CATEGORY_COL, category)],
        )
    }

    /// Flat mean per (year, category): `[ANO_REFERENCIA, MODALIDADE, media_valor]`.
    pub fn time_mean_by_category(df: &DataFrame) -> AggResult<DataFrame> {
        let years = require(df, YEAR_COL)?.cast(&DataType::Int32)?;
        let years = years.i32()?;
        let categories = text(df, CATEGORY_COL)?;
        let values = amounts(df)?;

        let mut groups: BTreeMap<(i32, String), Accumulator> = BTreeMap::new();
        for ((year, category), value) in years.into_iter().zip(&categories).zip(&values) {
            if let (Some(year), Some(category)) = (year, category) {
                groups
                    .entry((year, category.to_string()))
                    .or_default()
                    .push(value);
            }
        }

        let mut out_years = Vec::with_capacity(groups.len());
        let mut out_categories = Vec::with_capacity(groups.len());
        let mut out_means = Vec::with_capacity(groups.len());
        for ((year, category), acc) in groups {
            out_years.push(year);
            out_categories.push(category);
            out_means.push(acc.mean());
        }

        Ok(DataFrame::new(vec![
            Column::new(YEAR_COL.into(), out_years),
            Column::new(CATEGORY_COL.into(), out_categories),
            Column::new("media_valor".into(), out_means),
        ])?)
    }
}
