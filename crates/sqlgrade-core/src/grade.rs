//! Equivalence grader: structural comparison of two canonical tables
//!
//! Mismatches are data, returned as [`GradingVerdict::Mismatch`]. Only a
//! table that cannot be evaluated at all produces [`GradingVerdict::Error`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OptionsError, TableError};
use crate::format::render_value;
use crate::table::{CanonicalRow, CanonicalTable};

/// How numeric cells are compared. Only exact comparison exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericTolerance {
    #[default]
    #[serde(rename = "none", alias = "exact")]
    Exact,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GradingPolicy {
    /// Compare rows positionally. Set when the reference query orders its output.
    pub row_order_sensitive: bool,
    /// Compare declared column names positionally.
    pub column_name_sensitive: bool,
    pub numeric_tolerance: NumericTolerance,
}

impl GradingPolicy {
    pub fn ordered() -> Self {
        Self {
            row_order_sensitive: true,
            ..Self::default()
        }
    }

    /// Parse a policy, rejecting unknown keys and unsupported values.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, OptionsError> {
        Self::deserialize(value).map_err(|e| OptionsError::invalid("policy", e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Match,
    Mismatch,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowDirection {
    /// Present in the expected result, absent (or too few times) in the candidate.
    Missing,
    /// Present in the candidate more often than expected.
    Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MismatchReason {
    ColumnCountMismatch {
        expected: usize,
        actual: usize,
    },
    ColumnNameMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
    RowCountMismatch {
        expected: usize,
        actual: usize,
    },
    /// Same rows, different order.
    RowOrderMismatch {
        index: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// Positional comparison found a row whose content is not in the expected result.
    RowValueMismatch {
        index: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    RowSetMismatch {
        row: Vec<String>,
        direction: RowDirection,
        expected_count: usize,
        actual_count: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableRole {
    Candidate,
    Expected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GradeFault {
    CorruptTable { table: TableRole, error: TableError },
}

impl std::fmt::Display for GradeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeFault::CorruptTable { table, error } => {
                write!(f, "{table:?} table cannot be graded: {error}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason")]
pub enum GradingVerdict {
    Match,
    Mismatch(MismatchReason),
    Error(GradeFault),
}

impl GradingVerdict {
    pub fn outcome(&self) -> Outcome {
        match self {
            GradingVerdict::Match => Outcome::Match,
            GradingVerdict::Mismatch(_) => Outcome::Mismatch,
            GradingVerdict::Error(_) => Outcome::Error,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, GradingVerdict::Match)
    }
}

/// Decide whether `candidate` is the same answer as `expected`.
pub fn grade(
    candidate: &CanonicalTable,
    expected: &CanonicalTable,
    policy: &GradingPolicy,
) -> GradingVerdict {
    let verdict = compare(candidate, expected, policy);
    debug!(
        outcome = ?verdict.outcome(),
        rows = candidate.row_count(),
        expected_rows = expected.row_count(),
        ordered = policy.row_order_sensitive,
        "graded attempt"
    );
    verdict
}

fn compare(
    candidate: &CanonicalTable,
    expected: &CanonicalTable,
    policy: &GradingPolicy,
) -> GradingVerdict {
    for (role, table) in [
        (TableRole::Candidate, candidate),
        (TableRole::Expected, expected),
    ] {
        if let Err(error) = table.validate() {
            return GradingVerdict::Error(GradeFault::CorruptTable { table: role, error });
        }
    }

    if candidate.column_count() != expected.column_count() {
        return GradingVerdict::Mismatch(MismatchReason::ColumnCountMismatch {
            expected: expected.column_count(),
            actual: candidate.column_count(),
        });
    }

    if policy.column_name_sensitive {
        let names = expected.columns().iter().zip(candidate.columns()).enumerate();
        for (index, (want, got)) in names {
            if want.name != got.name {
                return GradingVerdict::Mismatch(MismatchReason::ColumnNameMismatch {
                    index,
                    expected: want.name.clone(),
                    actual: got.name.clone(),
                });
            }
        }
    }

    if candidate.row_count() != expected.row_count() {
        return GradingVerdict::Mismatch(MismatchReason::RowCountMismatch {
            expected: expected.row_count(),
            actual: candidate.row_count(),
        });
    }

    let candidate_keys: Vec<String> = candidate.rows().map(CanonicalRow::key).collect();
    let expected_keys: Vec<String> = expected.rows().map(CanonicalRow::key).collect();

    let set_difference = compare_multisets(candidate, &candidate_keys, expected, &expected_keys);

    if policy.row_order_sensitive {
        let first_difference = candidate_keys
            .iter()
            .zip(&expected_keys)
            .position(|(got, want)| got != want);

        if let Some(index) = first_difference {
            let expected_row = render_row(expected.row(index));
            let actual_row = render_row(candidate.row(index));
            let reason = if set_difference.is_none() {
                MismatchReason::RowOrderMismatch {
                    index,
                    expected: expected_row,
                    actual: actual_row,
                }
            } else {
                MismatchReason::RowValueMismatch {
                    index,
                    expected: expected_row,
                    actual: actual_row,
                }
            };
            return GradingVerdict::Mismatch(reason);
        }
        return GradingVerdict::Match;
    }

    match set_difference {
        Some(reason) => GradingVerdict::Mismatch(reason),
        None => GradingVerdict::Match,
    }
}

/// Compare the tables as multisets of rows. The first candidate row that
/// occurs more often than expected is reported; failing that, the first
/// expected row that occurs less often.
fn compare_multisets(
    candidate: &CanonicalTable,
    candidate_keys: &[String],
    expected: &CanonicalTable,
    expected_keys: &[String],
) -> Option<MismatchReason> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for key in expected_keys {
        counts.entry(key.as_str()).or_default().0 += 1;
    }
    for key in candidate_keys {
        counts.entry(key.as_str()).or_default().1 += 1;
    }

    let extra = candidate_keys.iter().enumerate().find_map(|(i, key)| {
        let (want, got) = counts[key.as_str()];
        (got > want).then(|| MismatchReason::RowSetMismatch {
            row: render_row(candidate.row(i)),
            direction: RowDirection::Extra,
            expected_count: want,
            actual_count: got,
        })
    });
    if extra.is_some() {
        return extra;
    }

    expected_keys.iter().enumerate().find_map(|(i, key)| {
        let (want, got) = counts[key.as_str()];
        (got < want).then(|| MismatchReason::RowSetMismatch {
            row: render_row(expected.row(i)),
            direction: RowDirection::Missing,
            expected_count: want,
            actual_count: got,
        })
    })
}

fn render_row(row: Option<&CanonicalRow>) -> Vec<String> {
    row.map(|r| r.values().iter().map(render_value).collect())
        .unwrap_or_default()
}
