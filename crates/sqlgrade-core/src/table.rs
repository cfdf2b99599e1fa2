//! Immutable canonical result table

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, TableError};
use crate::types::{CanonicalValue, ColumnDescriptor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalRow(Vec<CanonicalValue>);

impl CanonicalRow {
    pub fn new(values: Vec<CanonicalValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[CanonicalValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, col: usize) -> Option<&CanonicalValue> {
        self.0.get(col)
    }

    /// Comparison key: every cell's key, `|`-separated, in column order.
    pub fn key(&self) -> String {
        let mut out = String::new();
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                out.push('|');
            }
            value.write_key(&mut out);
        }
        out
    }
}

impl From<Vec<CanonicalValue>> for CanonicalRow {
    fn from(values: Vec<CanonicalValue>) -> Self {
        Self(values)
    }
}

/// Normalized query result.
///
/// Positions are stable for the lifetime of the value: there is no API to
/// insert, remove or reorder rows or columns once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTable {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<CanonicalRow>,
    source_row_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<DecodeError>,
}

impl CanonicalTable {
    /// Build a table, rejecting rows whose width disagrees with `columns`.
    pub fn new(
        columns: Vec<ColumnDescriptor>,
        rows: Vec<CanonicalRow>,
    ) -> Result<Self, TableError> {
        let table = Self {
            source_row_count: rows.len(),
            columns,
            rows,
            diagnostics: Vec::new(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Decoder constructor; rows are built to width by construction.
    pub(crate) fn from_decoded(
        columns: Vec<ColumnDescriptor>,
        rows: Vec<CanonicalRow>,
        diagnostics: Vec<DecodeError>,
    ) -> Self {
        Self {
            source_row_count: rows.len(),
            columns,
            rows,
            diagnostics,
        }
    }

    pub fn column_at(&self, i: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(i)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn source_row_count(&self) -> usize {
        self.source_row_count
    }

    pub fn value_at(&self, row: usize, col: usize) -> Option<&CanonicalValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn row(&self, i: usize) -> Option<&CanonicalRow> {
        self.rows.get(i)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &CanonicalRow> {
        self.rows.iter()
    }

    /// Non-fatal decode problems, one per affected column.
    pub fn diagnostics(&self) -> &[DecodeError] {
        &self.diagnostics
    }

    /// Check structural invariants. Tables built through `new` or the decoder
    /// always pass; deserialized tables may not.
    pub fn validate(&self) -> Result<(), TableError> {
        let expected = self.columns.len();
        if let Some((row, r)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != expected)
        {
            return Err(TableError::RaggedRow {
                row,
                expected,
                actual: r.len(),
            });
        }
        if self.source_row_count != self.rows.len() {
            return Err(TableError::RowCountDrift {
                source_rows: self.source_row_count,
                rows: self.rows.len(),
            });
        }
        Ok(())
    }

    /// Values of the first column; handy for single-column metadata queries
    /// such as `SHOW TABLES`.
    pub fn first_column_text(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| match r.get(0) {
                Some(CanonicalValue::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}
