//! Error taxonomy for decoding and option validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`DecodeError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecodeErrorKind {
    SchemaMismatch,
    Truncated,
    UnsupportedType,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DecodeError {
    #[error("Batch {batch} has {actual} columns but the schema declares {expected}")]
    SchemaMismatch {
        batch: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Batch {batch} column {column} is {actual} but the schema declares {expected}")]
    ColumnTypeMismatch {
        batch: usize,
        column: usize,
        expected: String,
        actual: String,
    },

    #[error("Batch {batch} declares {declared} rows but column {column} holds only {available}")]
    Truncated {
        batch: usize,
        column: usize,
        declared: usize,
        available: usize,
    },

    /// Recorded on the table, never returned from `decode`.
    #[error("Column {column} ({name}) has unsupported type {data_type}")]
    UnsupportedType {
        column: usize,
        name: String,
        data_type: String,
    },

    #[error("Arrow IPC stream error: {message}")]
    Ipc { kind: DecodeErrorKind, message: String },
}

impl DecodeError {
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::SchemaMismatch { .. } | DecodeError::ColumnTypeMismatch { .. } => {
                DecodeErrorKind::SchemaMismatch
            }
            DecodeError::Truncated { .. } => DecodeErrorKind::Truncated,
            DecodeError::UnsupportedType { .. } => DecodeErrorKind::UnsupportedType,
            DecodeError::Ipc { kind, .. } => *kind,
        }
    }
}

/// Rejected configuration values (format options, grading policy, history capacity).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("Invalid value for `{option}`: {reason}")]
    Invalid { option: &'static str, reason: String },
}

impl OptionsError {
    pub(crate) fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        OptionsError::Invalid {
            option,
            reason: reason.into(),
        }
    }
}

/// Structural violation inside a [`crate::CanonicalTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TableError {
    #[error("Row {row} has {actual} values but the table has {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Source row count {source_rows} disagrees with {rows} decoded rows")]
    RowCountDrift { source_rows: usize, rows: usize },
}
