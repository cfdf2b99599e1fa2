//! Display formatter: derives cell strings from a [`CanonicalTable`]
//!
//! Formatting never touches the table. Row and cell truncation only exist in
//! the returned [`FormattedTable`], which reports how much was cut.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::OptionsError;
use crate::table::CanonicalTable;
use crate::types::CanonicalValue;

/// Rendering of SQL NULL, distinct from the text `"null"`.
pub const NULL_TOKEN: &str = "NULL";

pub const ELLIPSIS: char = '…';

pub const DEFAULT_MAX_CELL_LENGTH: usize = 200;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FormatOptions {
    /// Characters kept per cell before eliding with [`ELLIPSIS`].
    pub max_cell_length: usize,
    /// Rows rendered; the remainder is counted in `omitted_rows`.
    pub max_rows: Option<usize>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_cell_length: DEFAULT_MAX_CELL_LENGTH,
            max_rows: None,
        }
    }
}

impl FormatOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_cell_length == 0 {
            return Err(OptionsError::invalid(
                "maxCellLength",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows of the table not present in `rows`.
    pub omitted_rows: usize,
    /// Rendered cells shortened by `max_cell_length`.
    pub elided_cells: usize,
}

/// Render `table` for display.
pub fn format(table: &CanonicalTable, opts: &FormatOptions) -> Result<FormattedTable, OptionsError> {
    opts.validate()?;

    let header = table.columns().iter().map(|c| c.name.clone()).collect();
    let shown = opts
        .max_rows
        .map_or(table.row_count(), |max| max.min(table.row_count()));

    let mut elided_cells = 0;
    let rows: Vec<Vec<String>> = table
        .rows()
        .take(shown)
        .map(|row| {
            row.values()
                .iter()
                .map(|value| {
                    let (cell, elided) = elide(render_value(value), opts.max_cell_length);
                    if elided {
                        elided_cells += 1;
                    }
                    cell
                })
                .collect()
        })
        .collect();

    Ok(FormattedTable {
        header,
        rows,
        omitted_rows: table.row_count() - shown,
        elided_cells,
    })
}

/// Full, untruncated rendering of one value.
pub fn render_value(value: &CanonicalValue) -> String {
    match value {
        CanonicalValue::Null => NULL_TOKEN.to_string(),
        CanonicalValue::Integer(v) => v.to_string(),
        CanonicalValue::Decimal { unscaled, scale } => render_decimal(*unscaled, *scale),
        CanonicalValue::Float(v) => render_float(*v),
        CanonicalValue::Text(s) => s.clone(),
        CanonicalValue::Boolean(b) => b.to_string(),
        CanonicalValue::DateDays(days) => render_date(*days),
        CanonicalValue::TimestampMicros(us) => render_timestamp(*us),
        CanonicalValue::Unsupported(raw) => raw.clone(),
    }
}

/// Insert the decimal point `scale` digits from the right, keeping the
/// trailing zeros the scale implies.
pub fn render_decimal(unscaled: i128, scale: i8) -> String {
    let negative = unscaled < 0;
    let digits = unscaled.unsigned_abs().to_string();

    let body = match usize::try_from(scale) {
        Ok(0) => digits,
        Ok(scale) => {
            let padded = format!("{digits:0>width$}", width = scale + 1);
            let (int_part, frac_part) = padded.split_at(padded.len() - scale);
            format!("{int_part}.{frac_part}")
        }
        // Negative scale: the unscaled value counts tens, hundreds, ...
        Err(_) if unscaled == 0 => digits,
        Err(_) => {
            let zeros = usize::from(scale.unsigned_abs());
            format!("{digits}{}", "0".repeat(zeros))
        }
    };

    if negative {
        format!("-{body}")
    } else {
        body
    }
}

fn render_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        String::from(if v > 0.0 { "inf" } else { "-inf" })
    } else {
        // `Display` for f64 is the shortest round-trip form and never uses
        // an exponent.
        v.to_string()
    }
}

fn render_date(days: i32) -> String {
    days.checked_add(UNIX_EPOCH_CE_DAYS)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format!("{days} days"))
}

fn render_timestamp(us: i64) -> String {
    DateTime::from_timestamp_micros(us)
        .map(|ts| ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
        .unwrap_or_else(|| format!("{us} us"))
}

fn elide(cell: String, max_chars: usize) -> (String, bool) {
    match cell.char_indices().nth(max_chars) {
        None => (cell, false),
        Some((cut, _)) => {
            let mut out = cell[..cut].to_string();
            out.push(ELLIPSIS);
            (out, true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CanonicalRow;
    use crate::types::{ColumnDescriptor, LogicalType};

    fn table(rows: Vec<Vec<CanonicalValue>>) -> CanonicalTable {
        let width = rows.first().map_or(1, Vec::len);
        let columns = (0..width)
            .map(|i| ColumnDescriptor::new(format!("c{i}"), LogicalType::Utf8, true))
            .collect();
        CanonicalTable::new(columns, rows.into_iter().map(CanonicalRow::new).collect()).unwrap()
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(render_decimal(12345, 2), "123.45");
        assert_eq!(render_decimal(12300, 2), "123.00");
        assert_eq!(render_decimal(5, 3), "0.005");
        assert_eq!(render_decimal(-5, 3), "-0.005");
        assert_eq!(render_decimal(-12345, 2), "-123.45");
        assert_eq!(render_decimal(42, 0), "42");
        assert_eq!(render_decimal(42, -2), "4200");
        assert_eq!(render_decimal(0, -2), "0");
        assert_eq!(
            render_decimal(i128::MIN, 0),
            "-170141183460469231731687303715884105728"
        );
    }

    #[test]
    fn test_integer_rendering_is_exact() {
        assert_eq!(
            render_value(&CanonicalValue::Integer(i64::MAX)),
            "9223372036854775807"
        );
        assert_eq!(
            render_value(&CanonicalValue::Integer(9_007_199_254_740_993)),
            "9007199254740993"
        );
    }

    #[test]
    fn test_null_is_distinct_from_text_null() {
        assert_eq!(render_value(&CanonicalValue::Null), "NULL");
        assert_eq!(render_value(&CanonicalValue::Text("null".to_string())), "null");
    }

    #[test]
    fn test_float_and_temporal_rendering() {
        assert_eq!(render_value(&CanonicalValue::Float(1e21)), "1000000000000000000000");
        assert_eq!(render_value(&CanonicalValue::Float(0.1)), "0.1");
        assert_eq!(render_value(&CanonicalValue::DateDays(0)), "1970-01-01");
        assert_eq!(render_value(&CanonicalValue::DateDays(19_723)), "2024-01-01");
        assert_eq!(
            render_value(&CanonicalValue::TimestampMicros(1_500_000)),
            "1970-01-01 00:00:01.500"
        );
        assert_eq!(
            render_value(&CanonicalValue::TimestampMicros(0)),
            "1970-01-01 00:00:00"
        );
    }

    #[test]
    fn test_long_cells_are_elided_in_output_only() {
        let long = "é".repeat(10);
        let t = table(vec![vec![CanonicalValue::Text(long.clone())]]);
        let opts = FormatOptions {
            max_cell_length: 4,
            max_rows: None,
        };

        let out = format(&t, &opts).unwrap();
        assert_eq!(out.rows[0][0], "éééé…");
        assert_eq!(out.elided_cells, 1);
        assert_eq!(t.value_at(0, 0), Some(&CanonicalValue::Text(long)));
    }

    #[test]
    fn test_max_rows_reports_omissions() {
        let t = table(
            (0..5)
                .map(|i| vec![CanonicalValue::Integer(i)])
                .collect(),
        );
        let opts = FormatOptions {
            max_rows: Some(2),
            ..FormatOptions::default()
        };

        let out = format(&t, &opts).unwrap();
        assert_eq!(out.rows, vec![vec!["0".to_string()], vec!["1".to_string()]]);
        assert_eq!(out.omitted_rows, 3);
        assert_eq!(t.row_count(), 5);
    }

    #[test]
    fn test_format_is_idempotent() {
        let t = table(vec![
            vec![CanonicalValue::Text("x".repeat(300)), CanonicalValue::Null],
            vec![
                CanonicalValue::Decimal {
                    unscaled: 1,
                    scale: 1,
                },
                CanonicalValue::Boolean(false),
            ],
        ]);
        let opts = FormatOptions::default();
        assert_eq!(format(&t, &opts).unwrap(), format(&t, &opts).unwrap());
    }

    #[test]
    fn test_zero_cell_length_rejected() {
        let t = table(vec![vec![CanonicalValue::Null]]);
        let opts = FormatOptions {
            max_cell_length: 0,
            max_rows: None,
        };
        assert!(matches!(
            format(&t, &opts),
            Err(OptionsError::Invalid { option: "maxCellLength", .. })
        ));
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let parsed: Result<FormatOptions, _> =
            serde_json::from_value(serde_json::json!({ "maxCellLen": 10 }));
        assert!(parsed.is_err());

        let parsed: FormatOptions =
            serde_json::from_value(serde_json::json!({ "maxRows": 10 })).unwrap();
        assert_eq!(parsed.max_cell_length, DEFAULT_MAX_CELL_LENGTH);
        assert_eq!(parsed.max_rows, Some(10));
    }
}
