//! Record batch → Parquet encoding.
//!
//! Column order and names follow the topic schema. Timestamps are stored as
//! microseconds in UTC.

use crate::error::SinkError;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;
use sync_core::{FieldDefinition, FieldType, Record, RecordValue, Schema};

/// Arrow schema equivalent of a topic schema.
pub fn arrow_schema(schema: &Schema) -> ArrowSchema {
    let fields = schema
        .fields()
        .iter()
        .map(|f| Field::new(&f.name, arrow_type(f.field_type), f.nullable))
        .collect::<Vec<_>>();
    ArrowSchema::new(fields)
}

fn arrow_type(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::String => DataType::Utf8,
        FieldType::Integer => DataType::Int64,
        FieldType::Double => DataType::Float64,
        FieldType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
    }
}

/// Encode records as a complete Parquet file.
pub fn encode_batch(schema: &Schema, records: &[Record]) -> Result<Vec<u8>, SinkError> {
    let arrow_schema = Arc::new(arrow_schema(schema));

    let columns = schema
        .fields()
        .iter()
        .map(|field| build_column(field, records))
        .collect::<Result<Vec<_>, _>>()?;

    let batch = RecordBatch::try_new(arrow_schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, arrow_schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(buffer)
}

fn build_column(field: &FieldDefinition, records: &[Record]) -> Result<ArrayRef, SinkError> {
    let column: ArrayRef = match field.field_type {
        FieldType::String => Arc::new(StringArray::from(collect(field, records, |v| {
            v.as_str().map(str::to_owned)
        })?)),
        FieldType::Integer => Arc::new(Int64Array::from(collect(
            field,
            records,
            RecordValue::as_i64,
        )?)),
        FieldType::Double => Arc::new(Float64Array::from(collect(
            field,
            records,
            RecordValue::as_f64,
        )?)),
        FieldType::Timestamp => Arc::new(
            TimestampMicrosecondArray::from(collect(field, records, |v| {
                v.as_timestamp().map(|ts| ts.timestamp_micros())
            })?)
            .with_timezone("UTC"),
        ),
    };
    Ok(column)
}

/// Pull one column out of the records, treating absent fields as null.
fn collect<T>(
    field: &FieldDefinition,
    records: &[Record],
    extract: impl Fn(&RecordValue) -> Option<T>,
) -> Result<Vec<Option<T>>, SinkError> {
    records
        .iter()
        .map(|record| match record.get(&field.name) {
            None | Some(RecordValue::Null) => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| {
                SinkError::Encode(format!(
                    "field '{}' holds {:?}, expected {}",
                    field.name, value, field.field_type
                ))
            }),
        })
        .collect()
}
