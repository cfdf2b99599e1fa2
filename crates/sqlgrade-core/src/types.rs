//! Value model shared by the decoder, formatter and grader

use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Int64,
    Float64,
    Decimal { precision: u8, scale: i8 },
    Utf8,
    Boolean,
    Date,
    Timestamp,
    Null,
    /// Engine type the decoder does not model; carries the engine's type name.
    Unsupported(String),
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalType::Int64 => f.write_str("BIGINT"),
            LogicalType::Float64 => f.write_str("DOUBLE"),
            LogicalType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            LogicalType::Utf8 => f.write_str("VARCHAR"),
            LogicalType::Boolean => f.write_str("BOOLEAN"),
            LogicalType::Date => f.write_str("DATE"),
            LogicalType::Timestamp => f.write_str("TIMESTAMP"),
            LogicalType::Null => f.write_str("NULL"),
            LogicalType::Unsupported(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable,
        }
    }
}

/// A single decoded cell.
///
/// Exact engine numerics stay exact: `Integer` keeps the full `i64` range and
/// `Decimal` keeps the unscaled magnitude next to its scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CanonicalValue {
    Null,
    Integer(i64),
    Decimal {
        #[serde(with = "i128_string")]
        unscaled: i128,
        scale: i8,
    },
    Float(f64),
    Text(String),
    Boolean(bool),
    DateDays(i32),
    TimestampMicros(i64),
    /// Engine rendering of a value whose type is not modelled.
    Unsupported(String),
}

impl CanonicalValue {
    /// Append this value's comparison key to `out`.
    ///
    /// `Integer` and `Decimal` share the `X` class and are keyed by exact
    /// magnitude, so `5`, `5.0` and `5.00` produce the same key. Text carries
    /// its byte length so concatenated keys stay unambiguous.
    pub fn write_key(&self, out: &mut String) {
        match self {
            CanonicalValue::Null => out.push('N'),
            CanonicalValue::Integer(v) => write_exact_key(out, i128::from(*v), 0),
            CanonicalValue::Decimal { unscaled, scale } => {
                write_exact_key(out, *unscaled, i32::from(*scale))
            }
            CanonicalValue::Float(v) => {
                if v.is_nan() {
                    out.push_str("F:NaN");
                } else if *v == 0.0 {
                    out.push_str("F:0");
                } else {
                    let _ = write!(out, "F:{:016x}", v.to_bits());
                }
            }
            CanonicalValue::Text(s) => {
                let _ = write!(out, "T{}:{}", s.len(), s);
            }
            CanonicalValue::Boolean(b) => out.push_str(if *b { "B:1" } else { "B:0" }),
            CanonicalValue::DateDays(d) => {
                let _ = write!(out, "D:{d}");
            }
            CanonicalValue::TimestampMicros(us) => {
                let _ = write!(out, "S:{us}");
            }
            CanonicalValue::Unsupported(raw) => {
                let _ = write!(out, "U{}:{}", raw.len(), raw);
            }
        }
    }
}

/// Strip trailing decimal zeros so equal magnitudes share one key.
fn write_exact_key(out: &mut String, mut unscaled: i128, mut scale: i32) {
    if unscaled == 0 {
        out.push_str("X:0");
        return;
    }
    while unscaled % 10 == 0 {
        unscaled /= 10;
        scale -= 1;
    }
    let _ = write!(out, "X:{unscaled}e{}", -scale);
}

/// JSON numbers cannot carry the full `i128` range portably.
mod i128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
