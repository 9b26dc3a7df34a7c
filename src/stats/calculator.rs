//! Statistics Calculator Module
//! Handles descriptive statistics of paid amounts per group, the numeric
//! backing of the dashboard box plots.

use super::aggregate::{AggResult, AggregationError};
use crate::data::schema::AMOUNT_COL;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Statistics for a single group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub group_name: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p05: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
}

impl Default for GroupStats {
    fn default() -> Self {
        Self {
            group_name: String::new(),
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            p05: f64::NAN,
            p25: f64::NAN,
            p75: f64::NAN,
            p95: f64::NAN,
        }
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> GroupStats {
        let n = values.len();
        if n == 0 {
            return GroupStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        // Sample variance; a single value has none
        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        GroupStats {
            group_name: String::new(),
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            variance,
            p05: Self::percentile(&sorted, 5.0),
            p25: Self::percentile(&sorted, 25.0),
            p75: Self::percentile(&sorted, 75.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Percentile by linear interpolation between closest ranks.
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Non-null paid amounts grouped by the text value of `group_column`.
    pub fn values_by_group(
        df: &DataFrame,
        group_column: &str,
    ) -> AggResult<BTreeMap<String, Vec<f64>>> {
        let groups = df
            .column(group_column)
            .map_err(|_| AggregationError::MissingColumn(group_column.to_string()))?
            .cast(&DataType::String)?;
        let values = df
            .column(AMOUNT_COL)
            .map_err(|_| AggregationError::MissingColumn(AMOUNT_COL.to_string()))?
            .cast(&DataType::Float64)?;

        let mut out: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (group, value) in groups.str()?.into_iter().zip(values.f64()?) {
            if let (Some(group), Some(value)) = (group, value) {
                out.entry(group.to_string()).or_default().push(value);
            }
        }
        Ok(out)
    }

    /// Per-group statistics of the paid amount, groups ascending.
    pub fn group_stats(df: &DataFrame, group_column: &str) -> AggResult<Vec<GroupStats>> {
        Ok(Self::values_by_group(df, group_column)?
            .into_iter()
            .map(|(name, values)| {
                let mut stats = Self::compute_descriptive_stats(&values);
                stats.group_name = name;
                stats
            })
            .collect())
    }

    /// Descriptive statistics table: `[<group>, count, mean, median, std,
    /// variance, p05, p25, p75, p95]`.
    pub fn distribution_by(df: &DataFrame, group_column: &str) -> AggResult<DataFrame> {
        let stats = Self::group_stats(df, group_column)?;

        let pick = |f: fn(&GroupStats) -> f64| stats.iter().map(f).collect::<Vec<f64>>();
        let names: Vec<&str> = stats.iter().map(|s| s.group_name.as_str()).collect();
        let counts: Vec<u32> = stats.iter().map(|s| s.count as u32).collect();

        Ok(DataFrame::new(vec![
            Column::new(group_column.into(), names),
            Column::new("count".into(), counts),
            Column::new("mean".into(), pick(|s| s.mean)),
            Column::new("median".into(), pick(|s| s.median)),
            Column::new("std".into(), pick(|s| s.std)),
            Column::new("variance".into(), pick(|s| s.variance)),
            Column::new("p05".into(), pick(|s| s.p05)),
            Column::new("p25".into(), pick(|s| s.p25)),
            Column::new("p75".into(), pick(|s| s.p75)),
            Column::new("p95".into(), pick(|s| s.p95)),
        ])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptive_stats() {
        let stats = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert!((stats.variance - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.p25, 1.75);
        assert_eq!(stats.p75, 3.25);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(StatsCalculator::compute_descriptive_stats(&[]).mean.is_nan());
        let one = StatsCalculator::compute_descriptive_stats(&[7.0]);
        assert_eq!(one.std, 0.0);
        assert_eq!(one.p95, 7.0);
    }

    #[test]
    fn test_distribution_by_group() {
        let df = df!(
            "MODALIDADE" => [Some("PQ"), Some("GD"), Some("GD"), None],
            "VALOR_PAGO" => [Some(10.0), Some(1.0), None, Some(99.0)]
        )
        .unwrap();
        let out = StatsCalculator::distribution_by(&df, "MODALIDADE").unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.width(), 10);
        let groups = out.column("MODALIDADE").unwrap().str().unwrap();
        assert_eq!(groups.get(0), Some("GD"));
        let counts = out.column("count").unwrap().u32().unwrap();
        assert_eq!(counts.get(0), Some(1));
        let means = out.column("mean").unwrap().f64().unwrap();
        assert_eq!(means.get(1), Some(10.0));
    }

    #[test]
    fn test_distribution_missing_column() {
        let df = df!("VALOR_PAGO" => [1.0]).unwrap();
        assert!(matches!(
            StatsCalculator::distribution_by(&df, "AREA"),
            Err(AggregationError::MissingColumn(c)) if c == "AREA"
        ));
    }
}
