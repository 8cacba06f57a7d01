//! Result tables and their output formats.
//!
//! A [`Table`] is an ordered list of typed columns plus rows aligned with
//! them. It can be written as CSV, JSON, NDJSON or Parquet, or converted to
//! an Arrow [`RecordBatch`].

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int64Builder, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use parquet::arrow::ArrowWriter;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::OutputError;
use crate::record::Row;
use crate::value::{Value, ValueType};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// CSV without a header line
    Csv,
    CsvWithHeader,
    /// One JSON array of row objects
    Json,
    /// One JSON object per line
    NdJson,
    Parquet,
}

impl ContentType {
    /// Parses a format name or MIME type.
    ///
    /// Accepts `csv`, `csv_with_header`, `json`, `ndjson`, `parquet` and the
    /// corresponding MIME types; `text/csv;header=present` selects the
    /// header variant.
    pub fn from_string(s: &str) -> Result<Self, OutputError> {
        let normalized = s.trim().to_lowercase();
        let parts: Vec<&str> = normalized.split(';').map(str::trim).collect();
        let header_present = parts
            .iter()
            .skip(1)
            .any(|p| p.replace(' ', "") == "header=present");

        match parts.first().copied().unwrap_or_default() {
            "csv" | "text/csv" if header_present => Ok(ContentType::CsvWithHeader),
            "csv" | "text/csv" => Ok(ContentType::Csv),
            "csv_with_header" | "csv-with-header" => Ok(ContentType::CsvWithHeader),
            "json" | "application/json" => Ok(ContentType::Json),
            "ndjson" | "application/ndjson" | "application/x-ndjson" => Ok(ContentType::NdJson),
            "parquet" | "application/parquet" | "application/vnd.apache.parquet" => {
                Ok(ContentType::Parquet)
            }
            _ => Err(OutputError::UnsupportedFormat(s.to_string())),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentType::Csv => "text/csv",
            ContentType::CsvWithHeader => "text/csv;header=present",
            ContentType::Json => "application/json",
            ContentType::NdJson => "application/ndjson",
            ContentType::Parquet => "application/vnd.apache.parquet",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ContentType::Csv | ContentType::CsvWithHeader => "csv",
            ContentType::Json => "json",
            ContentType::NdJson => "ndjson",
            ContentType::Parquet => "parquet",
        }
    }
}

impl FromStr for ContentType {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::Csv => "csv",
            ContentType::CsvWithHeader => "csv_with_header",
            ContentType::Json => "json",
            ContentType::NdJson => "ndjson",
            ContentType::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

/// A typed output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl Column {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Appends a row; it must have one value per column.
    pub fn push_row(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn extend<I: IntoIterator<Item = Row>>(&mut self, rows: I) {
        for row in rows {
            self.push_row(row);
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The value at `row` in the named column; `None` for null or out of range.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_ref()
    }

    /// All values of one column.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&Value>>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[index].as_ref()).collect())
    }

    /// Writes the table in the given format.
    pub fn write<W: Write + Send>(&self, content_type: ContentType, writer: W) -> Result<(), OutputError> {
        match content_type {
            ContentType::Csv => self.write_csv(writer, false),
            ContentType::CsvWithHeader => self.write_csv(writer, true),
            ContentType::Json => self.write_json(writer),
            ContentType::NdJson => self.write_ndjson(writer),
            ContentType::Parquet => self.write_parquet(writer),
        }
    }

    /// Writes CSV; nulls become empty cells.
    pub fn write_csv<W: Write>(&self, writer: W, header: bool) -> Result<(), OutputError> {
        let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        if header {
            csv.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        }
        for row in &self.rows {
            csv.write_record(
                row.iter()
                    .map(|v| v.as_ref().map(Value::to_string).unwrap_or_default()),
            )?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Writes a JSON array of objects whose keys follow column order.
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<(), OutputError> {
        let objects: Vec<RowObject<'_>> = self.row_objects().collect();
        serde_json::to_writer(&mut writer, &objects)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_ndjson<W: Write>(&self, mut writer: W) -> Result<(), OutputError> {
        for object in self.row_objects() {
            serde_json::to_writer(&mut writer, &object)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_parquet<W: Write + Send>(&self, writer: W) -> Result<(), OutputError> {
        let batch = self.to_record_batch()?;
        let mut parquet = ArrowWriter::try_new(writer, batch.schema(), None)?;
        parquet.write(&batch)?;
        parquet.close()?;
        Ok(())
    }

    fn row_objects(&self) -> impl Iterator<Item = RowObject<'_>> {
        self.rows.iter().map(|row| RowObject {
            columns: &self.columns,
            row,
        })
    }

    /// Converts the table to an Arrow record batch with nullable columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch, OutputError> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(c.name.as_str(), arrow_type(c.value_type), true))
            .collect();
        let arrays: Vec<ArrayRef> = (0..self.columns.len())
            .map(|i| self.arrow_column(i))
            .collect();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }

    fn arrow_column(&self, index: usize) -> ArrayRef {
        let values = self.rows.iter().map(|r| r[index].as_ref());
        match self.columns[index].value_type {
            ValueType::String => {
                let mut builder = StringBuilder::new();
                for value in values {
                    match value {
                        Some(Value::String(s)) => builder.append_value(s),
                        Some(other) => builder.append_value(other.to_string()),
                        None => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
            ValueType::Integer => {
                let mut builder = Int64Builder::new();
                for value in values {
                    match value {
                        Some(Value::Integer(i)) => builder.append_value(*i),
                        _ => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
            ValueType::Float => {
                let mut builder = Float64Builder::new();
                for value in values {
                    match value.and_then(Value::as_f64) {
                        Some(f) => builder.append_value(f),
                        None => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
            ValueType::Date => {
                let mut builder = Date32Builder::new();
                for value in values {
                    match value {
                        Some(Value::Date(d)) => {
                            builder.append_value(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                        }
                        _ => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
            ValueType::Boolean => {
                let mut builder = BooleanBuilder::new();
                for value in values {
                    match value {
                        Some(Value::Boolean(b)) => builder.append_value(*b),
                        _ => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
        }
    }
}

fn arrow_type(value_type: ValueType) -> DataType {
    match value_type {
        ValueType::String => DataType::Utf8,
        ValueType::Integer => DataType::Int64,
        ValueType::Float => DataType::Float64,
        ValueType::Date => DataType::Date32,
        ValueType::Boolean => DataType::Boolean,
    }
}

/// One row serialized as a JSON object in column order.
struct RowObject<'a> {
    columns: &'a [Column],
    row: &'a Row,
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.row) {
            map.serialize_entry(&column.name, &value.as_ref().map(Value::to_json))?;
        }
        map.end()
    }
}
