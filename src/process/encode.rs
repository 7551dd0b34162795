// src/process/encode.rs
use anyhow::Context;
use arrow::{
    array::{
        ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
        TimestampMillisecondArray,
    },
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use chrono::Datelike;
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::{WriterProperties, WriterVersion},
};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::process::table::{Column, ColumnData, Table, Value};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Characters the Spark/Hive Parquet reader refuses in field names.
const SPARK_RESERVED: &[char] = &[' ', ',', ';', '{', '}', '(', ')', '\n', '\t', '='];

/// Writer settings for the widest reader compatibility: format 1.0 pages,
/// SNAPPY, and a `created_by` tag.
pub fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_writer_version(WriterVersion::PARQUET_1_0)
        .set_compression(Compression::SNAPPY)
        .set_created_by(format!("parquetize version {}", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Serialize `table` to an in-memory Parquet file.
pub fn encode_parquet(table: &Table) -> Result<Vec<u8>> {
    let batch = to_record_batch(table)?;
    let buffer = write_parquet_to_memory(&batch)
        .map_err(|e| ConvertError::Encode(format!("{e:#}")))?;
    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        bytes = buffer.len(),
        "encoded parquet"
    );
    Ok(buffer)
}

fn write_parquet_to_memory(batch: &RecordBatch) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(writer_properties()))
        .context("creating parquet writer")?;
    writer.write(batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;
    Ok(buffer)
}

/// Build the Arrow batch: one nullable field per column, Spark-safe names.
/// A table without columns still carries its row count.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays = Vec::with_capacity(table.num_columns());
    let mut taken: HashMap<String, &str> = HashMap::new();

    for Column { name, data } in table.columns() {
        let field_name = spark_safe_name(name);
        if let Some(first) = taken.insert(field_name.clone(), name.as_str()) {
            return Err(ConvertError::SchemaConflict {
                name: field_name,
                first: first.to_string(),
                second: name.clone(),
            });
        }
        let (dtype, array) = encode_column(data);
        fields.push(Field::new(field_name, dtype, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

pub fn spark_safe_name(name: &str) -> String {
    name.replace(SPARK_RESERVED, "_")
}

/// Map a column to its Arrow type and array.
///
/// - Timestamp → Timestamp(ms, UTC)
/// - Date      → Date32
/// - Int64     → Int64
/// - Utf8      → Utf8
/// - Raw       → see [`RawKind`]
fn encode_column(data: &ColumnData) -> (DataType, ArrayRef) {
    match data {
        ColumnData::Timestamp(v) => {
            let millis: Vec<Option<i64>> =
                v.iter().map(|c| c.map(|ts| ts.timestamp_millis())).collect();
            let array = TimestampMillisecondArray::from(millis).with_timezone("UTC");
            (
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                Arc::new(array) as ArrayRef,
            )
        }
        ColumnData::Date(v) => {
            let days: Vec<Option<i32>> = v
                .iter()
                .map(|c| c.map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
                .collect();
            (DataType::Date32, Arc::new(Date32Array::from(days)) as ArrayRef)
        }
        ColumnData::Int64(v) => (
            DataType::Int64,
            Arc::new(Int64Array::from(v.clone())) as ArrayRef,
        ),
        ColumnData::Utf8(v) => (
            DataType::Utf8,
            Arc::new(StringArray::from(v.clone())) as ArrayRef,
        ),
        ColumnData::Raw(v) => encode_raw(v),
    }
}

/// Storage type inferred for a pass-through column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// No non-null cell at all; stored as an all-null Utf8 column.
    Null,
    Bool,
    Int,
    /// Floats, or ints mixed with floats.
    Float,
    Str,
    /// Anything else, stored as Utf8 with JSON text for non-strings.
    Mixed,
}

pub fn raw_kind(cells: &[Value]) -> RawKind {
    cells.iter().fold(RawKind::Null, |acc, cell| {
        let kind = match cell {
            Value::Null => return acc,
            Value::Bool(_) => RawKind::Bool,
            Value::Int(_) => RawKind::Int,
            Value::Float(_) => RawKind::Float,
            Value::Str(_) => RawKind::Str,
            Value::Nested(_) => RawKind::Mixed,
        };
        match (acc, kind) {
            (RawKind::Null, k) => k,
            (a, k) if a == k => a,
            (RawKind::Int, RawKind::Float) | (RawKind::Float, RawKind::Int) => RawKind::Float,
            _ => RawKind::Mixed,
        }
    })
}

fn encode_raw(cells: &[Value]) -> (DataType, ArrayRef) {
    match raw_kind(cells) {
        RawKind::Bool => {
            let vals: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            (DataType::Boolean, Arc::new(BooleanArray::from(vals)) as ArrayRef)
        }
        RawKind::Int => {
            let vals: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            (DataType::Int64, Arc::new(Int64Array::from(vals)) as ArrayRef)
        }
        RawKind::Float => {
            let vals: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Value::Int(i) => Some(*i as f64),
                    Value::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            (DataType::Float64, Arc::new(Float64Array::from(vals)) as ArrayRef)
        }
        RawKind::Null | RawKind::Str | RawKind::Mixed => {
            let vals: Vec<Option<String>> = cells.iter().map(json_text).collect();
            (DataType::Utf8, Arc::new(StringArray::from(vals)) as ArrayRef)
        }
    }
}

/// Strings as-is, every other non-null cell as its JSON text.
fn json_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::Str(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => {
            Some(serde_json::Number::from_f64(*f).map_or_else(|| f.to_string(), |n| n.to_string()))
        }
        Value::Nested(v) => Some(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Date32Type, Int64Type};
    use bytes::Bytes;
    use chrono::{NaiveDate, TimeZone, Utc};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use serde_json::json;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_raw_kind_inference() {
        assert_eq!(raw_kind(&[]), RawKind::Null);
        assert_eq!(raw_kind(&[Value::Null, Value::Null]), RawKind::Null);
        assert_eq!(raw_kind(&[Value::Int(1), Value::Null]), RawKind::Int);
        assert_eq!(raw_kind(&[Value::Int(1), Value::Float(0.5)]), RawKind::Float);
        assert_eq!(raw_kind(&[Value::Bool(true), Value::Bool(false)]), RawKind::Bool);
        assert_eq!(raw_kind(&[s("a"), Value::Null]), RawKind::Str);
        assert_eq!(raw_kind(&[s("a"), Value::Int(1)]), RawKind::Mixed);
        assert_eq!(raw_kind(&[Value::Nested(json!([]))]), RawKind::Mixed);
    }

    #[test]
    fn test_spark_safe_names() {
        assert_eq!(spark_safe_name("sales_(usd)"), "sales__usd_");
        assert_eq!(spark_safe_name("a=b;c"), "a_b_c");
        assert_eq!(spark_safe_name("order_date"), "order_date");
    }

    #[test]
    fn test_sanitized_name_collision_is_conflict() {
        let mut t = Table::new(1);
        t.push_column("a(b)", ColumnData::Raw(vec![Value::Int(1)]));
        t.push_column("a_b_", ColumnData::Raw(vec![Value::Int(2)]));
        assert!(matches!(
            to_record_batch(&t),
            Err(ConvertError::SchemaConflict { .. })
        ));
    }

    #[test]
    fn test_columnless_tables_keep_row_count() {
        for (table, expected) in [(Table::new(0), 0), (Table::new(2), 2)] {
            let batch = to_record_batch(&table).unwrap();
            assert_eq!(batch.num_columns(), 0);
            assert_eq!(batch.num_rows(), expected);

            let buf = encode_parquet(&table).unwrap();
            assert_eq!(&buf[..4], b"PAR1");
            assert_eq!(&buf[buf.len() - 4..], b"PAR1");
            let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(buf)).unwrap();
            assert!(builder.schema().fields().is_empty());
        }
    }

    #[test]
    fn test_record_batch_types() {
        let mut t = Table::new(2);
        t.push_column(
            "order_date",
            ColumnData::Date(vec![NaiveDate::from_ymd_opt(1970, 1, 2), None]),
        );
        t.push_column("ind1", ColumnData::Int64(vec![None, Some(4)]));
        t.push_column(
            "created_at",
            ColumnData::Timestamp(vec![
                Some(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 1).unwrap()),
                None,
            ]),
        );
        t.push_column("flag", ColumnData::Raw(vec![Value::Bool(true), Value::Null]));
        t.push_column("mixed", ColumnData::Raw(vec![s("x"), Value::Int(3)]));
        t.push_column("empty", ColumnData::Raw(vec![Value::Null, Value::Null]));
        t.push_column(
            "loose",
            ColumnData::Raw(vec![Value::Bool(true), Value::Nested(json!({"k": 1}))]),
        );

        let batch = to_record_batch(&t).unwrap();
        let schema = batch.schema();
        let types: Vec<&DataType> = schema.fields().iter().map(|f| f.data_type()).collect();
        assert_eq!(
            types,
            vec![
                &DataType::Date32,
                &DataType::Int64,
                &DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                &DataType::Boolean,
                &DataType::Utf8,
                &DataType::Utf8,
                &DataType::Utf8,
            ]
        );
        assert!(schema.fields().iter().all(|f| f.is_nullable()));

        let dates = batch.column(0).as_primitive::<Date32Type>();
        assert_eq!(dates.value(0), 1);
        assert!(dates.is_null(1));
        let mixed = batch.column(4).as_string::<i32>();
        assert_eq!(mixed.value(0), "x");
        assert_eq!(mixed.value(1), "3");
        assert_eq!(batch.column(5).null_count(), 2);
        let loose = batch.column(6).as_string::<i32>();
        assert_eq!(loose.value(0), "true");
        assert_eq!(loose.value(1), r#"{"k":1}"#);
    }

    #[test]
    fn test_parquet_roundtrip_metadata_and_values() {
        let mut t = Table::new(3);
        t.push_column("ind1", ColumnData::Int64(vec![Some(1), None, Some(3)]));
        t.push_column("city", ColumnData::Raw(vec![s("Lyon"), Value::Null, s("Oslo")]));

        let buf = encode_parquet(&t).unwrap();
        assert_eq!(&buf[..4], b"PAR1");

        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(buf)).unwrap();
        let file_meta = builder.metadata().file_metadata().clone();
        assert_eq!(file_meta.version(), 1);
        assert_eq!(file_meta.num_rows(), 3);
        assert!(file_meta
            .created_by()
            .unwrap_or_default()
            .starts_with("parquetize"));

        let batches: Vec<RecordBatch> = builder
            .build()
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(batches.len(), 1);
        let ints = batches[0].column(0).as_primitive::<Int64Type>();
        assert_eq!(ints.value(0), 1);
        assert!(ints.is_null(1));
        assert_eq!(ints.value(2), 3);
    }
}
