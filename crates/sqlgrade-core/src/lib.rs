//! SQLGrade core: result normalization and answer equivalence
//!
//! Turns query-engine record batches into an immutable [`CanonicalTable`],
//! renders it for display, and grades a candidate table against a reference
//! under a [`GradingPolicy`]. Everything here is synchronous and free of I/O;
//! the only shared mutable state is the [`HistoryStore`].

pub mod decode;
pub mod error;
pub mod format;
pub mod grade;
pub mod history;
pub mod table;
pub mod types;

pub use decode::{decode, decode_ipc_stream, decode_record_batches, logical_type_of, RawBatch};
pub use error::{DecodeError, DecodeErrorKind, OptionsError, TableError};
pub use format::{
    format, render_value, FormatOptions, FormattedTable, DEFAULT_MAX_CELL_LENGTH, NULL_TOKEN,
};
pub use grade::{
    grade, GradeFault, GradingPolicy, GradingVerdict, MismatchReason, NumericTolerance, Outcome,
    RowDirection, TableRole,
};
pub use history::{HistoryEntry, HistoryStore, DEFAULT_HISTORY_CAPACITY};
pub use table::{CanonicalRow, CanonicalTable};
pub use types::{CanonicalValue, ColumnDescriptor, LogicalType};

/// Arrow re-export so callers build batches against the same version.
pub use arrow;
