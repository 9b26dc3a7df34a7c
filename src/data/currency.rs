//! Currency Parser Module
//! Converts locale-ambiguous monetary text ("R$ 1.234,56", "$ 8,100.00") into f64.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

static CURRENCY_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"R\$|\$").expect("currency symbol pattern is valid"));

/// Parse a single monetary string.
///
/// Both `.` and `,` present means Brazilian grouping (`1.234,56`) unless the
/// last separator is a dot (`8,100.00`); only `,` means a Brazilian decimal
/// comma (`600,00`); anything else keeps `.` as the decimal point and drops
/// `,` as grouping noise. Returns `None` for blank or malformed input.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let unquoted = raw.trim().trim_matches('"');
    let stripped = CURRENCY_SYMBOL.replace_all(unquoted, "");
    let value = stripped.trim();
    if value.is_empty() {
        return None;
    }

    let last_dot = value.rfind('.');
    let last_comma = value.rfind(',');
    let brazilian = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => comma > dot,
        (None, Some(_)) => true,
        _ => false,
    };
    let normalized = if brazilian {
        value.replace('.', "").replace(',', ".")
    } else {
        value.replace(',', "")
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a whole column of monetary values into Float64.
///
/// Numeric columns are cast as-is, so parsing an already-parsed column is a no-op.
pub fn parse_currency_column(column: &Column) -> PolarsResult<Column> {
    let name = column.name().clone();
    if is_numeric(column.dtype()) {
        return column.cast(&DataType::Float64);
    }

    let text = column.cast(&DataType::String)?;
    let parsed: Float64Chunked = text
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_amount))
        .collect();

    Ok(parsed.with_name(name).into_column())
}

pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brazilian_with_symbol() {
        assert_eq!(parse_amount("R$ 1.234,56"), Some(1234.56));
    }

    #[test]
    fn test_brazilian_decimal_comma() {
        assert_eq!(parse_amount("600,00"), Some(600.0));
    }

    #[test]
    fn test_point_decimal() {
        assert_eq!(parse_amount("300.0"), Some(300.0));
    }

    #[test]
    fn test_dollar_with_thousands_comma() {
        assert_eq!(parse_amount(" $ 8,100.00 "), Some(8100.0));
        // A lone comma is always read as the decimal mark
        assert_eq!(parse_amount("1,500"), Some(1.5));
    }

    #[test]
    fn test_brazilian_grouping_without_decimals() {
        assert_eq!(parse_amount("R$ 12.345.678,9"), Some(12345678.9));
    }

    #[test]
    fn test_quoted_value() {
        assert_eq!(parse_amount("\"R$ 400,00\""), Some(400.0));
    }

    #[test]
    fn test_blank_and_malformed() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("R$"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn test_plain_integer() {
        assert_eq!(parse_amount("1500"), Some(1500.0));
    }

    #[test]
    fn test_column_parse_keeps_nulls() {
        let column = Column::new(
            "VALOR_PAGO".into(),
            [Some("R$ 1.234,56"), None, Some(""), Some("300.0")],
        );
        let parsed = parse_currency_column(&column).unwrap();
        let values: Vec<Option<f64>> = parsed.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1234.56), None, None, Some(300.0)]);
        assert_eq!(parsed.name().as_str(), "VALOR_PAGO");
    }

    #[test]
    fn test_numeric_column_is_idempotent() {
        let column = Column::new("VALOR_PAGO".into(), [Some(150.5f64), None]);
        let once = parse_currency_column(&column).unwrap();
        let twice = parse_currency_column(&once).unwrap();
        assert!(once
            .as_materialized_series()
            .equals_missing(twice.as_materialized_series()));
        assert_eq!(twice.f64().unwrap().get(0), Some(150.5));
    }
}
