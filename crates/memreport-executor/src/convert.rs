//! Arrow to memreport conversions
//!
//! Maps Arrow field types onto catalog column types, counts value byte
//! lengths for the sampler and splits buffer sizes into tuple and string
//! storage for the statistics provider.

use arrow::compute::cast;
use arrow_array::cast::AsArray;
use arrow_array::{Array, RecordBatch};
use arrow_schema::{DataType, Field};
use memreport_common::{ColumnSpec, ColumnType, LengthDefaults, LengthSample, MemReportError, Result};
use std::collections::BTreeMap;

/// Column type for an Arrow data type
pub fn column_type_for(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Int8 | DataType::UInt8 => ColumnType::TinyInt,
        DataType::Int16 | DataType::UInt16 => ColumnType::SmallInt,
        DataType::Int32 | DataType::UInt32 => ColumnType::Integer,
        DataType::Int64 | DataType::UInt64 => ColumnType::BigInt,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnType::Float,
        DataType::Timestamp(_, _) | DataType::Date64 => ColumnType::Timestamp,
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => ColumnType::Decimal,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnType::Varchar,
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => ColumnType::Varbinary,
        DataType::Dictionary(_, value) => column_type_for(value),
        other => ColumnType::Other(other.to_string().to_ascii_uppercase()),
    }
}

/// Build a column spec from an Arrow field.
///
/// Arrow schemas carry no declared length for strings, so VARCHAR and
/// VARBINARY lengths come from `lengths` (per-column override first).
/// [`widen_to_fit`] raises them once the data has been seen.
pub fn column_spec_for(table: &str, field: &Field, lengths: &LengthDefaults) -> ColumnSpec {
    let column_type = column_type_for(field.data_type());
    let length = match (&column_type, field.data_type()) {
        (ColumnType::Varbinary, DataType::FixedSizeBinary(width)) => *width as u64,
        (ColumnType::Varchar, _) => lengths.lookup(table, field.name()).unwrap_or(lengths.varchar),
        (ColumnType::Varbinary, _) => lengths
            .lookup(table, field.name())
            .unwrap_or(lengths.varbinary),
        (_, data_type) => data_type.primitive_width().unwrap_or(0) as u64,
    };
    ColumnSpec::new(field.name().clone(), column_type, length, field.is_nullable())
}

/// Whether the declared length of a field is a guess that data can outgrow
pub fn has_assumed_length(field: &Field) -> bool {
    column_type_for(field.data_type()).is_variable()
        && !matches!(field.data_type(), DataType::FixedSizeBinary(_))
}

/// Longest non-null value in `array`, in characters for strings and bytes
/// for binaries
pub fn longest_value(array: &dyn Array) -> Result<Option<u64>> {
    let longest = match array.data_type() {
        DataType::Utf8 => array.as_string::<i32>().iter().flatten().map(char_len).max(),
        DataType::LargeUtf8 => array.as_string::<i64>().iter().flatten().map(char_len).max(),
        DataType::Utf8View => array.as_string_view().iter().flatten().map(char_len).max(),
        DataType::Binary => array.as_binary::<i32>().iter().flatten().map(<[u8]>::len).max(),
        DataType::LargeBinary => array.as_binary::<i64>().iter().flatten().map(<[u8]>::len).max(),
        DataType::BinaryView => array.as_binary_view().iter().flatten().map(<[u8]>::len).max(),
        DataType::FixedSizeBinary(width) => {
            (array.null_count() < array.len()).then_some(*width as usize)
        }
        DataType::Dictionary(_, value) => return longest_value(cast(array, value)?.as_ref()),
        other => {
            return Err(MemReportError::Sampling(format!(
                "cannot measure {other} values"
            )))
        }
    };
    Ok(longest.map(|l| l as u64))
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Raise a declared length so the longest stored value fits.
pub fn widen_to_fit(table: &str, column: &mut ColumnSpec, longest: u64) {
    if longest <= column.length {
        return;
    }
    tracing::info!(
        "Column {}.{} holds values of length {}, raising declared length from {}",
        table,
        column.name,
        longest,
        column.length
    );
    column.length = longest;
}

/// Counts value byte lengths across batches
#[derive(Debug, Default)]
pub struct LengthCollector {
    counts: BTreeMap<Option<u64>, u64>,
}

impl LengthCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, array: &dyn Array) -> Result<()> {
        match array.data_type() {
            DataType::Utf8 => self.extend(array.as_string::<i32>().iter().map(|v| v.map(str::len))),
            DataType::LargeUtf8 => {
                self.extend(array.as_string::<i64>().iter().map(|v| v.map(str::len)))
            }
            DataType::Utf8View => {
                self.extend(array.as_string_view().iter().map(|v| v.map(str::len)))
            }
            DataType::Binary => {
                self.extend(array.as_binary::<i32>().iter().map(|v| v.map(<[u8]>::len)))
            }
            DataType::LargeBinary => {
                self.extend(array.as_binary::<i64>().iter().map(|v| v.map(<[u8]>::len)))
            }
            DataType::BinaryView => {
                self.extend(array.as_binary_view().iter().map(|v| v.map(<[u8]>::len)))
            }
            DataType::FixedSizeBinary(width) => {
                let width = *width as usize;
                self.extend((0..array.len()).map(|i| (!array.is_null(i)).then_some(width)))
            }
            DataType::Dictionary(_, value) => return self.observe(cast(array, value)?.as_ref()),
            other => {
                return Err(MemReportError::Sampling(format!(
                    "cannot sample byte lengths of {other} values"
                )))
            }
        }
        Ok(())
    }

    fn extend(&mut self, lengths: impl Iterator<Item = Option<usize>>) {
        for length in lengths {
            *self.counts.entry(length.map(|l| l as u64)).or_insert(0) += 1;
        }
    }

    /// Distribution with nulls first, then ascending length
    pub fn finish(self) -> Vec<LengthSample> {
        self.counts
            .into_iter()
            .map(|(length, count)| LengthSample { length, count })
            .collect()
    }
}

/// Tuple and string buffer bytes of a set of batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferUsage {
    pub rows: u64,
    /// Buffers of fixed-width columns
    pub tuple_bytes: u64,
    /// Fixed-width column memory including array overhead
    pub tuple_allocated_bytes: u64,
    /// Buffers of variable-width columns
    pub string_bytes: u64,
}

impl BufferUsage {
    pub fn observe(&mut self, batch: &RecordBatch) {
        self.rows += batch.num_rows() as u64;
        for array in batch.columns() {
            if column_type_for(array.data_type()).is_variable() {
                self.string_bytes += array.get_buffer_memory_size() as u64;
            } else {
                self.tuple_bytes += array.get_buffer_memory_size() as u64;
                self.tuple_allocated_bytes += array.get_array_memory_size() as u64;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::types::Int32Type;
    use arrow_array::{BinaryArray, DictionaryArray, Int64Array, StringArray};
    use arrow_schema::Schema;
    use std::sync::Arc;

    #[test]
    fn test_column_type_mapping() {
        assert_eq!(column_type_for(&DataType::Int8), ColumnType::TinyInt);
        assert_eq!(column_type_for(&DataType::Int16), ColumnType::SmallInt);
        assert_eq!(column_type_for(&DataType::Int32), ColumnType::Integer);
        assert_eq!(column_type_for(&DataType::Int64), ColumnType::BigInt);
        assert_eq!(column_type_for(&DataType::Float64), ColumnType::Float);
        assert_eq!(
            column_type_for(&DataType::Decimal128(10, 2)),
            ColumnType::Decimal
        );
        assert_eq!(column_type_for(&DataType::Utf8), ColumnType::Varchar);
        assert_eq!(column_type_for(&DataType::LargeBinary), ColumnType::Varbinary);
        assert_eq!(
            column_type_for(&DataType::Boolean),
            ColumnType::Other("BOOLEAN".to_string())
        );
    }

    #[test]
    fn test_column_spec_lengths() {
        let mut lengths = LengthDefaults::default();
        lengths.overrides.insert("users.email".to_string(), 120);

        let spec = column_spec_for("users", &Field::new("email", DataType::Utf8, true), &lengths);
        assert_eq!(spec.length, 120);
        assert!(spec.nullable);

        let spec = column_spec_for("users", &Field::new("bio", DataType::Utf8, false), &lengths);
        assert_eq!(spec.length, lengths.varchar);

        let spec = column_spec_for(
            "users",
            &Field::new("digest", DataType::FixedSizeBinary(32), false),
            &lengths,
        );
        assert_eq!(spec.column_type, ColumnType::Varbinary);
        assert_eq!(spec.length, 32);

        let spec = column_spec_for("users", &Field::new("id", DataType::Int64, false), &lengths);
        assert_eq!(spec.length, 8);
    }

    #[test]
    fn test_length_collector() {
        let mut collector = LengthCollector::new();
        let names = StringArray::from(vec![Some("alice"), Some("bob"), None, Some("carol")]);
        collector.observe(&names).unwrap();
        let blobs = BinaryArray::from(vec![Some(&b"abc"[..]), None]);
        collector.observe(&blobs).unwrap();

        assert_eq!(
            collector.finish(),
            vec![
                LengthSample::null(2),
                LengthSample::new(3, 2),
                LengthSample::new(5, 2),
            ]
        );
    }

    #[test]
    fn test_longest_value() {
        // characters, not bytes, for strings
        let names = StringArray::from(vec![Some("héllo"), None, Some("ab")]);
        assert_eq!(longest_value(&names).unwrap(), Some(5));

        let blobs = BinaryArray::from(vec![Some(&b"abcdef"[..]), None]);
        assert_eq!(longest_value(&blobs).unwrap(), Some(6));

        let nulls = StringArray::from(vec![None::<&str>, None]);
        assert_eq!(longest_value(&nulls).unwrap(), None);

        let ids = Int64Array::from(vec![1]);
        assert!(longest_value(&ids).is_err());
    }

    #[test]
    fn test_dictionary_columns() {
        let tags: DictionaryArray<Int32Type> =
            vec![Some("red"), None, Some("green"), Some("red")].into_iter().collect();
        assert_eq!(column_type_for(tags.data_type()), ColumnType::Varchar);
        assert_eq!(longest_value(&tags).unwrap(), Some(5));

        let mut collector = LengthCollector::new();
        collector.observe(&tags).unwrap();
        assert_eq!(
            collector.finish(),
            vec![
                LengthSample::null(1),
                LengthSample::new(3, 2),
                LengthSample::new(5, 1),
            ]
        );
    }

    #[test]
    fn test_widen_to_fit() {
        let mut body = ColumnSpec::new("body", ColumnType::Varchar, 256, true);
        widen_to_fit("docs", &mut body, 100);
        assert_eq!(body.length, 256);
        widen_to_fit("docs", &mut body, 3000);
        assert_eq!(body.length, 3000);

        assert!(has_assumed_length(&Field::new("body", DataType::Utf8, true)));
        assert!(has_assumed_length(&Field::new("raw", DataType::Binary, true)));
        assert!(!has_assumed_length(&Field::new("digest", DataType::FixedSizeBinary(32), true)));
        assert!(!has_assumed_length(&Field::new("id", DataType::Int64, false)));
    }

    #[test]
    fn test_length_collector_rejects_numbers() {
        let mut collector = LengthCollector::new();
        let ids = Int64Array::from(vec![1, 2]);
        assert!(matches!(
            collector.observe(&ids),
            Err(MemReportError::Sampling(_))
        ));
    }

    #[test]
    fn test_buffer_usage_splits_fixed_and_variable() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("ccc")])),
            ],
        )
        .unwrap();

        let mut usage = BufferUsage::default();
        usage.observe(&batch);
        usage.observe(&batch);
        assert_eq!(usage.rows, 6);
        assert!(usage.tuple_bytes >= 48);
        assert!(usage.tuple_allocated_bytes >= usage.tuple_bytes);
        assert!(usage.string_bytes > 0);
    }
}
