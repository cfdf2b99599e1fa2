//! Batch decoder: Arrow record batches to a [`CanonicalTable`]
//!
//! The decoder is a pure function of its inputs. Batches are concatenated in
//! arrival order and rows are never reordered. Structural problems (column
//! count, column type, short columns) abort the table; a column whose type
//! is not modelled degrades to `Unsupported` cells rendered by Arrow and is
//! recorded in the table's diagnostics.

use std::io::Cursor;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Float16Type, Float32Type, Float64Type,
    Int16Type, Int32Type, Int64Type, Int8Type, Schema, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::util::display::{ArrayFormatter, FormatOptions as ArrowFormatOptions};
use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeErrorKind};
use crate::table::{CanonicalRow, CanonicalTable};
use crate::types::{CanonicalValue, ColumnDescriptor, LogicalType};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Continuation token followed by a zero-length message: the IPC stream's last bytes.
const IPC_END_OF_STREAM: [u8; 8] = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00];

/// One batch as delivered by the engine: a declared row count plus one array
/// per schema column.
#[derive(Debug, Clone)]
pub struct RawBatch {
    num_rows: usize,
    columns: Vec<ArrayRef>,
}

impl RawBatch {
    pub fn new(num_rows: usize, columns: Vec<ArrayRef>) -> Self {
        Self { num_rows, columns }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ArrayRef] {
        &self.columns
    }
}

impl From<RecordBatch> for RawBatch {
    fn from(batch: RecordBatch) -> Self {
        Self {
            num_rows: batch.num_rows(),
            columns: batch.columns().to_vec(),
        }
    }
}

impl From<&RecordBatch> for RawBatch {
    fn from(batch: &RecordBatch) -> Self {
        Self {
            num_rows: batch.num_rows(),
            columns: batch.columns().to_vec(),
        }
    }
}

/// Map an Arrow type onto the logical type exposed to callers.
pub fn logical_type_of(data_type: &DataType) -> LogicalType {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => LogicalType::Int64,
        // UBIGINT does not fit in i64; keep it exact as a scale-0 decimal.
        DataType::UInt64 => LogicalType::Decimal {
            precision: 20,
            scale: 0,
        },
        DataType::Decimal128(precision, scale) => LogicalType::Decimal {
            precision: *precision,
            scale: *scale,
        },
        DataType::Float16 | DataType::Float32 | DataType::Float64 => LogicalType::Float64,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => LogicalType::Utf8,
        DataType::Boolean => LogicalType::Boolean,
        DataType::Date32 | DataType::Date64 => LogicalType::Date,
        DataType::Timestamp(_, _) => LogicalType::Timestamp,
        DataType::Null => LogicalType::Null,
        DataType::Dictionary(_, value_type) => logical_type_of(value_type),
        other => LogicalType::Unsupported(other.to_string()),
    }
}

/// Decode a schema and zero or more batches into a canonical table.
pub fn decode(schema: &Schema, batches: &[RawBatch]) -> Result<CanonicalTable, DecodeError> {
    let columns: Vec<ColumnDescriptor> = schema
        .fields()
        .iter()
        .map(|field| {
            ColumnDescriptor::new(
                field.name().clone(),
                logical_type_of(field.data_type()),
                field.is_nullable(),
            )
        })
        .collect();

    for (batch_idx, batch) in batches.iter().enumerate() {
        check_batch(schema, batch_idx, batch)?;
    }

    let total_rows: usize = batches.iter().map(RawBatch::num_rows).sum();
    let mut rows = Vec::with_capacity(total_rows);

    for batch in batches {
        let decoded: Vec<Vec<CanonicalValue>> = batch
            .columns
            .iter()
            .map(|array| {
                if array.len() > batch.num_rows {
                    decode_column(&array.slice(0, batch.num_rows))
                } else {
                    decode_column(array)
                }
            })
            .collect();

        let mut cells: Vec<_> = decoded.into_iter().map(Vec::into_iter).collect();
        for _ in 0..batch.num_rows {
            let values = cells
                .iter_mut()
                .map(|column| column.next().unwrap_or(CanonicalValue::Null))
                .collect();
            rows.push(CanonicalRow::new(values));
        }
    }

    let diagnostics = unsupported_columns(&columns);
    for diagnostic in &diagnostics {
        warn!(%diagnostic, "column decoded as unsupported");
    }

    debug!(
        batches = batches.len(),
        rows = rows.len(),
        columns = columns.len(),
        "decoded result batches"
    );

    Ok(CanonicalTable::from_decoded(columns, rows, diagnostics))
}

/// Decode Arrow `RecordBatch`es that share `schema`.
pub fn decode_record_batches(
    schema: &Schema,
    batches: &[RecordBatch],
) -> Result<CanonicalTable, DecodeError> {
    let raw: Vec<RawBatch> = batches.iter().map(RawBatch::from).collect();
    decode(schema, &raw)
}

/// Decode an Arrow IPC stream (schema message followed by record batches).
///
/// The stream must end with the end-of-stream marker. A stream cut on a
/// message boundary reads cleanly otherwise, and would decode as a table
/// that silently lacks its trailing batches.
pub fn decode_ipc_stream(bytes: &[u8]) -> Result<CanonicalTable, DecodeError> {
    if !bytes.ends_with(&IPC_END_OF_STREAM) {
        return Err(DecodeError::Ipc {
            kind: DecodeErrorKind::Truncated,
            message: format!(
                "stream of {} bytes ends without the end-of-stream marker",
                bytes.len()
            ),
        });
    }

    let reader = StreamReader::try_new(Cursor::new(bytes), None).map_err(ipc_error)?;
    let schema = reader.schema();
    let batches = reader
        .map(|batch| batch.map(RawBatch::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ipc_error)?;
    decode(&schema, &batches)
}

fn ipc_error(err: ArrowError) -> DecodeError {
    let kind = match err {
        ArrowError::IoError(..) => DecodeErrorKind::Truncated,
        _ => DecodeErrorKind::Malformed,
    };
    DecodeError::Ipc {
        kind,
        message: err.to_string(),
    }
}

fn check_batch(schema: &Schema, batch_idx: usize, batch: &RawBatch) -> Result<(), DecodeError> {
    if batch.num_columns() != schema.fields().len() {
        return Err(DecodeError::SchemaMismatch {
            batch: batch_idx,
            expected: schema.fields().len(),
            actual: batch.num_columns(),
        });
    }

    for (column, (field, array)) in schema.fields().iter().zip(&batch.columns).enumerate() {
        if array.data_type() != field.data_type() {
            return Err(DecodeError::ColumnTypeMismatch {
                batch: batch_idx,
                column,
                expected: field.data_type().to_string(),
                actual: array.data_type().to_string(),
            });
        }
        if array.len() < batch.num_rows {
            return Err(DecodeError::Truncated {
                batch: batch_idx,
                column,
                declared: batch.num_rows,
                available: array.len(),
            });
        }
    }

    Ok(())
}

fn unsupported_columns(columns: &[ColumnDescriptor]) -> Vec<DecodeError> {
    columns
        .iter()
        .enumerate()
        .filter_map(|(column, descriptor)| match &descriptor.logical_type {
            LogicalType::Unsupported(data_type) => Some(DecodeError::UnsupportedType {
                column,
                name: descriptor.name.clone(),
                data_type: data_type.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn decode_column(array: &ArrayRef) -> Vec<CanonicalValue> {
    use CanonicalValue as V;

    match array.data_type() {
        // NullArray carries no validity buffer, so `is_null` cannot be trusted.
        DataType::Null => vec![V::Null; array.len()],
        DataType::Int8 => primitive(array.as_primitive::<Int8Type>().iter(), |v| {
            V::Integer(i64::from(v))
        }),
        DataType::Int16 => primitive(array.as_primitive::<Int16Type>().iter(), |v| {
            V::Integer(i64::from(v))
        }),
        DataType::Int32 => primitive(array.as_primitive::<Int32Type>().iter(), |v| {
            V::Integer(i64::from(v))
        }),
        DataType::Int64 => primitive(array.as_primitive::<Int64Type>().iter(), V::Integer),
        DataType::UInt8 => primitive(array.as_primitive::<UInt8Type>().iter(), |v| {
            V::Integer(i64::from(v))
        }),
        DataType::UInt16 => primitive(array.as_primitive::<UInt16Type>().iter(), |v| {
            V::Integer(i64::from(v))
        }),
        DataType::UInt32 => primitive(array.as_primitive::<UInt32Type>().iter(), |v| {
            V::Integer(i64::from(v))
        }),
        DataType::UInt64 => primitive(array.as_primitive::<UInt64Type>().iter(), |v| {
            V::Decimal {
                unscaled: i128::from(v),
                scale: 0,
            }
        }),
        DataType::Decimal128(_, scale) => {
            let scale = *scale;
            primitive(array.as_primitive::<Decimal128Type>().iter(), |unscaled| {
                V::Decimal { unscaled, scale }
            })
        }
        DataType::Float16 => primitive(array.as_primitive::<Float16Type>().iter(), |v| {
            V::Float(v.to_f64())
        }),
        DataType::Float32 => primitive(array.as_primitive::<Float32Type>().iter(), |v| {
            V::Float(f64::from(v))
        }),
        DataType::Float64 => primitive(array.as_primitive::<Float64Type>().iter(), V::Float),
        DataType::Utf8 => text(array.as_string::<i32>().iter()),
        DataType::LargeUtf8 => text(array.as_string::<i64>().iter()),
        DataType::Utf8View => text(array.as_string_view().iter()),
        DataType::Boolean => primitive(array.as_boolean().iter(), V::Boolean),
        DataType::Date32 => primitive(array.as_primitive::<Date32Type>().iter(), V::DateDays),
        DataType::Date64 => primitive(array.as_primitive::<Date64Type>().iter(), |ms| {
            i32::try_from(ms.div_euclid(MILLIS_PER_DAY))
                .map(V::DateDays)
                .unwrap_or_else(|_| V::Unsupported(format!("{ms} ms")))
        }),
        DataType::Timestamp(unit, _) => decode_timestamps(array, unit),
        DataType::Dictionary(_, value_type) => match cast(array.as_ref(), value_type) {
            Ok(unpacked) => decode_column(&unpacked),
            Err(err) => {
                warn!(error = %err, "failed to unpack dictionary column");
                render_with_arrow(array)
            }
        },
        _ => render_with_arrow(array),
    }
}

fn primitive<T>(
    values: impl Iterator<Item = Option<T>>,
    to_value: impl Fn(T) -> CanonicalValue,
) -> Vec<CanonicalValue> {
    values
        .map(|v| v.map_or(CanonicalValue::Null, &to_value))
        .collect()
}

fn text<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<CanonicalValue> {
    primitive(values, |s| CanonicalValue::Text(s.to_string()))
}

fn decode_timestamps(array: &ArrayRef, unit: &TimeUnit) -> Vec<CanonicalValue> {
    fn scaled(v: i64, factor: i64) -> CanonicalValue {
        v.checked_mul(factor)
            .map(CanonicalValue::TimestampMicros)
            .unwrap_or_else(|| CanonicalValue::Unsupported(v.to_string()))
    }

    match unit {
        TimeUnit::Second => primitive(
            array.as_primitive::<TimestampSecondType>().iter(),
            |v| scaled(v, 1_000_000),
        ),
        TimeUnit::Millisecond => primitive(
            array.as_primitive::<TimestampMillisecondType>().iter(),
            |v| scaled(v, 1_000),
        ),
        TimeUnit::Microsecond => primitive(
            array.as_primitive::<TimestampMicrosecondType>().iter(),
            CanonicalValue::TimestampMicros,
        ),
        TimeUnit::Nanosecond => primitive(
            array.as_primitive::<TimestampNanosecondType>().iter(),
            |v| CanonicalValue::TimestampMicros(v.div_euclid(1_000)),
        ),
    }
}

/// "Unknown but visible": keep the engine's own rendering of each cell.
fn render_with_arrow(array: &ArrayRef) -> Vec<CanonicalValue> {
    let options = ArrowFormatOptions::default();
    match ArrayFormatter::try_new(array.as_ref(), &options) {
        Ok(formatter) => (0..array.len())
            .map(|i| {
                if array.is_null(i) {
                    CanonicalValue::Null
                } else {
                    CanonicalValue::Unsupported(formatter.value(i).to_string())
                }
            })
            .collect(),
        Err(err) => {
            warn!(error = %err, data_type = %array.data_type(), "no display format for column");
            let placeholder = format!("<{}>", array.data_type());
            (0..array.len())
                .map(|i| {
                    if array.is_null(i) {
                        CanonicalValue::Null
                    } else {
                        CanonicalValue::Unsupported(placeholder.clone())
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        BooleanArray, Date32Array, Date64Array, Decimal128Array, DictionaryArray, Float32Array,
        Int64Array, LargeStringArray, NullArray, StringArray, StringViewArray,
        Time64MicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
        TimestampSecondArray, UInt64Array,
    };
    use arrow::buffer::{NullBuffer, ScalarBuffer};
    use arrow::datatypes::Field;
    use arrow::ipc::writer::StreamWriter;
    use std::sync::Arc;

    fn people_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ])
    }

    fn people_batch(ids: Vec<i64>, names: Vec<Option<&str>>) -> RawBatch {
        let n = ids.len();
        RawBatch::new(
            n,
            vec![
                Arc::new(Int64Array::from(ids)) as ArrayRef,
                Arc::new(StringArray::from(names)) as ArrayRef,
            ],
        )
    }

    #[test]
    fn test_empty_batch_list_keeps_columns() {
        let table = decode(&people_schema(), &[]).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_at(1).unwrap().logical_type, LogicalType::Utf8);
    }

    #[test]
    fn test_batches_concatenate_in_arrival_order() {
        let batches = vec![
            people_batch(vec![3, 1], vec![Some("c"), Some("a")]),
            people_batch(vec![2], vec![None]),
        ];
        let table = decode(&people_schema(), &batches).unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.value_at(0, 0), Some(&CanonicalValue::Integer(3)));
        assert_eq!(table.value_at(1, 0), Some(&CanonicalValue::Integer(1)));
        assert_eq!(table.value_at(2, 0), Some(&CanonicalValue::Integer(2)));
        assert_eq!(table.value_at(2, 1), Some(&CanonicalValue::Null));
    }

    #[test]
    fn test_text_is_verbatim() {
        let batch = people_batch(vec![1], vec![Some("  Mixed Case  ")]);
        let table = decode(&people_schema(), &[batch]).unwrap();
        assert_eq!(
            table.value_at(0, 1),
            Some(&CanonicalValue::Text("  Mixed Case  ".to_string()))
        );
    }

    #[test]
    fn test_null_bits_override_payload() {
        let values = Int64Array::new(
            ScalarBuffer::from(vec![7_i64, 8]),
            Some(NullBuffer::from(vec![true, false])),
        );
        let schema = Schema::new(vec![Field::new("v", DataType::Int64, true)]);
        let batch = RawBatch::new(2, vec![Arc::new(values) as ArrayRef]);

        let table = decode(&schema, &[batch]).unwrap();
        assert_eq!(table.value_at(0, 0), Some(&CanonicalValue::Integer(7)));
        assert_eq!(table.value_at(1, 0), Some(&CanonicalValue::Null));
    }

    #[test]
    fn test_integer_extremes_are_exact() {
        let schema = Schema::new(vec![
            Field::new("big", DataType::Int64, false),
            Field::new("ubig", DataType::UInt64, false),
        ]);
        let batch = RawBatch::new(
            1,
            vec![
                Arc::new(Int64Array::from(vec![i64::MAX])) as ArrayRef,
                Arc::new(UInt64Array::from(vec![u64::MAX])) as ArrayRef,
            ],
        );
        let table = decode(&schema, &[batch]).unwrap();

        assert_eq!(table.value_at(0, 0), Some(&CanonicalValue::Integer(i64::MAX)));
        assert_eq!(
            table.value_at(0, 1),
            Some(&CanonicalValue::Decimal {
                unscaled: i128::from(u64::MAX),
                scale: 0
            })
        );
    }

    #[test]
    fn test_decimal_keeps_unscaled_and_scale() {
        let array = Decimal128Array::from(vec![12345_i128, -5])
            .with_precision_and_scale(10, 2)
            .unwrap();
        let schema = Schema::new(vec![Field::new("amount", DataType::Decimal128(10, 2), false)]);
        let table = decode(&schema, &[RawBatch::new(2, vec![Arc::new(array) as ArrayRef])]).unwrap();

        assert_eq!(
            table.column_at(0).unwrap().logical_type,
            LogicalType::Decimal {
                precision: 10,
                scale: 2
            }
        );
        assert_eq!(
            table.value_at(0, 0),
            Some(&CanonicalValue::Decimal {
                unscaled: 12345,
                scale: 2
            })
        );
        assert_eq!(
            table.value_at(1, 0),
            Some(&CanonicalValue::Decimal {
                unscaled: -5,
                scale: 2
            })
        );
    }

    #[test]
    fn test_temporal_and_boolean_columns() {
        let schema = Schema::new(vec![
            Field::new("d", DataType::Date32, true),
            Field::new("ts", DataType::Timestamp(TimeUnit::Millisecond, None), true),
            Field::new("flag", DataType::Boolean, true),
            Field::new("nothing", DataType::Null, true),
        ]);
        let batch = RawBatch::new(
            1,
            vec![
                Arc::new(Date32Array::from(vec![19_723])) as ArrayRef,
                Arc::new(TimestampMillisecondArray::from(vec![1_500])) as ArrayRef,
                Arc::new(BooleanArray::from(vec![true])) as ArrayRef,
                Arc::new(NullArray::new(1)) as ArrayRef,
            ],
        );
        let table = decode(&schema, &[batch]).unwrap();

        assert_eq!(table.value_at(0, 0), Some(&CanonicalValue::DateDays(19_723)));
        assert_eq!(
            table.value_at(0, 1),
            Some(&CanonicalValue::TimestampMicros(1_500_000))
        );
        assert_eq!(table.value_at(0, 2), Some(&CanonicalValue::Boolean(true)));
        assert_eq!(table.value_at(0, 3), Some(&CanonicalValue::Null));
    }

    #[test]
    fn test_wide_temporal_and_text_encodings() {
        let half: ArrayRef = cast(
            &(Arc::new(Float32Array::from(vec![1.5, -0.25])) as ArrayRef),
            &DataType::Float16,
        )
        .unwrap();
        let schema = Schema::new(vec![
            Field::new("h", DataType::Float16, true),
            Field::new("d64", DataType::Date64, true),
            Field::new("ts_s", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("ts_ns", DataType::Timestamp(TimeUnit::Nanosecond, None), true),
            Field::new("large", DataType::LargeUtf8, true),
            Field::new("view", DataType::Utf8View, true),
        ]);
        let batch = RawBatch::new(
            2,
            vec![
                half,
                Arc::new(Date64Array::from(vec![2 * MILLIS_PER_DAY + 5, -1])) as ArrayRef,
                Arc::new(TimestampSecondArray::from(vec![2, -3])) as ArrayRef,
                Arc::new(TimestampNanosecondArray::from(vec![1_999, -1])) as ArrayRef,
                Arc::new(LargeStringArray::from(vec![Some("wide"), None])) as ArrayRef,
                Arc::new(StringViewArray::from(vec!["a view of text", ""])) as ArrayRef,
            ],
        );
        let table = decode(&schema, &[batch]).unwrap();

        use CanonicalValue as V;
        assert_eq!(
            table.row(0).unwrap().values(),
            &[
                V::Float(1.5),
                V::DateDays(2),
                V::TimestampMicros(2_000_000),
                V::TimestampMicros(1),
                V::Text("wide".to_string()),
                V::Text("a view of text".to_string()),
            ]
        );
        assert_eq!(
            table.row(1).unwrap().values(),
            &[
                V::Float(-0.25),
                V::DateDays(-1),
                V::TimestampMicros(-3_000_000),
                V::TimestampMicros(-1),
                V::Null,
                V::Text(String::new()),
            ]
        );

        // Sub-microsecond precision floors toward negative infinity.
        assert_eq!(
            crate::format::render_value(&V::TimestampMicros(-1)),
            "1969-12-31 23:59:59.999999"
        );
    }

    #[test]
    fn test_dictionary_column_is_unpacked() {
        let dict: DictionaryArray<Int32Type> = vec!["eng", "ops", "eng"].into_iter().collect();
        let schema = Schema::new(vec![Field::new(
            "dept",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            false,
        )]);
        let table = decode(&schema, &[RawBatch::new(3, vec![Arc::new(dict) as ArrayRef])]).unwrap();

        assert_eq!(table.column_at(0).unwrap().logical_type, LogicalType::Utf8);
        assert_eq!(
            table.value_at(2, 0),
            Some(&CanonicalValue::Text("eng".to_string()))
        );
    }

    #[test]
    fn test_unsupported_type_degrades_and_is_recorded() {
        let schema = Schema::new(vec![
            Field::new("t", DataType::Time64(TimeUnit::Microsecond), true),
            Field::new("id", DataType::Int64, false),
        ]);
        let batch = RawBatch::new(
            1,
            vec![
                Arc::new(Time64MicrosecondArray::from(vec![3_600_000_000])) as ArrayRef,
                Arc::new(Int64Array::from(vec![1])) as ArrayRef,
            ],
        );
        let table = decode(&schema, &[batch]).unwrap();

        assert!(matches!(
            table.column_at(0).unwrap().logical_type,
            LogicalType::Unsupported(_)
        ));
        assert!(matches!(
            table.value_at(0, 0),
            Some(CanonicalValue::Unsupported(s)) if !s.is_empty()
        ));
        assert_eq!(table.value_at(0, 1), Some(&CanonicalValue::Integer(1)));
        assert_eq!(table.diagnostics().len(), 1);
        assert_eq!(
            table.diagnostics()[0].kind(),
            DecodeErrorKind::UnsupportedType
        );
    }

    #[test]
    fn test_column_count_mismatch() {
        let batch = RawBatch::new(1, vec![Arc::new(Int64Array::from(vec![1])) as ArrayRef]);
        let err = decode(&people_schema(), &[batch]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::SchemaMismatch {
                batch: 0,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_column_type_mismatch() {
        let batch = RawBatch::new(
            1,
            vec![
                Arc::new(StringArray::from(vec!["1"])) as ArrayRef,
                Arc::new(StringArray::from(vec!["a"])) as ArrayRef,
            ],
        );
        let err = decode(&people_schema(), &[batch]).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_declared_rows_beyond_payload_is_truncated() {
        let batch = RawBatch::new(
            5,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
                Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
            ],
        );
        let err = decode(&people_schema(), &[people_batch(vec![9], vec![None]), batch]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                batch: 1,
                column: 0,
                declared: 5,
                available: 2
            }
        );
    }

    #[test]
    fn test_declared_rows_below_payload_limits_rows() {
        let batch = RawBatch::new(
            1,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
                Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
            ],
        );
        let table = decode(&people_schema(), &[batch]).unwrap();
        assert_eq!(table.row_count(), 1);
    }

    fn ipc_bytes(schema: &Schema, batches: &[RecordBatch]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buf, schema).unwrap();
            for batch in batches {
                writer.write(batch).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_ipc_stream_decodes_all_batches() {
        let schema = Arc::new(people_schema());
        let first = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
                Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
            ],
        )
        .unwrap();
        let second = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![3])) as ArrayRef,
                Arc::new(StringArray::from(vec!["c"])) as ArrayRef,
            ],
        )
        .unwrap();

        let table = decode_ipc_stream(&ipc_bytes(&schema, &[first, second])).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.value_at(2, 1),
            Some(&CanonicalValue::Text("c".to_string()))
        );
    }

    #[test]
    fn test_cut_ipc_stream_is_truncated() {
        let schema = Arc::new(people_schema());
        let make = |ids: Vec<i64>, names: Vec<&str>| {
            RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Int64Array::from(ids)) as ArrayRef,
                    Arc::new(StringArray::from(names)) as ArrayRef,
                ],
            )
            .unwrap()
        };
        let first = make(vec![1, 2, 3, 4], vec!["a", "b", "c", "d"]);
        let second = make(vec![5, 6], vec!["e", "f"]);

        // Message boundaries: each finished stream minus its 8-byte marker.
        let after_schema = ipc_bytes(&schema, &[]).len() - 8;
        let after_first = ipc_bytes(&schema, &[first.clone()]).len() - 8;
        let bytes = ipc_bytes(&schema, &[first, second]);

        for cut in [
            0,
            after_schema,
            after_first,
            bytes.len() - 12,
            bytes.len() - 4,
        ] {
            let err = decode_ipc_stream(&bytes[..cut]).unwrap_err();
            assert_eq!(err.kind(), DecodeErrorKind::Truncated, "cut at {cut}");
        }
        assert_eq!(decode_ipc_stream(&bytes).unwrap().row_count(), 6);
    }

    #[test]
    fn test_garbage_ipc_stream_is_malformed() {
        // Continuation token and an 8-byte length, then a body that is not a message.
        let mut bytes = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x08, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0xAB; 8]);
        bytes.extend_from_slice(&IPC_END_OF_STREAM);
        let err = decode_ipc_stream(&bytes).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Malformed);
    }
}
