//! Parquet I/O powered by Serde + Arrow.
//!
//! The Arrow schema comes from the table's declared column types rather than
//! from tracing the row type, so a table with zero rows still gets its full
//! column list and `DATE` columns are written as Arrow `Date32`. Every
//! column except the leading surrogate key is nullable.

use anyhow::{Context, Result, bail};
use arrow::datatypes::{DataType, Field, FieldRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Serialize, de::DeserializeOwned};
use serde_arrow::{from_record_batch, to_record_batch};
use std::fs::{File, create_dir_all};
use std::path::Path;
use std::sync::Arc;

/// Map a warehouse SQL column type onto its Arrow type.
fn arrow_type(sql_type: &str) -> Result<DataType> {
    Ok(match sql_type {
        "BIGINT" => DataType::Int64,
        "INT" => DataType::Int32,
        "FLOAT" => DataType::Float32,
        "DOUBLE" => DataType::Float64,
        "STRING" => DataType::Utf8,
        "DATE" => DataType::Date32,
        other => bail!("no Arrow type for SQL column type `{other}`"),
    })
}

/// Build Arrow fields for `(name, SQL type)` column pairs.
pub fn arrow_fields(columns: &[(&str, &str)]) -> Result<Vec<FieldRef>> {
    columns
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| {
            let field = Field::new(*name, arrow_type(ty)?, i > 0);
            Ok(Arc::new(field))
        })
        .collect()
}

/// Write a typed slice to a Parquet file whose columns are `columns`.
///
/// Internally:
/// 1. Builds the Arrow schema with [`arrow_fields`].
/// 2. Converts the rows into a `RecordBatch` via `to_record_batch`.
/// 3. Writes the batch with `parquet::arrow::ArrowWriter`.
///
/// `NaiveDate` fields serialize as `%Y-%m-%d` strings, which `serde_arrow`
/// stores in a `Date32` column.
///
/// # Returns
/// Number of rows written (`data.len()`).
///
/// # Errors
/// An error is returned if a column type is unknown, or if conversion, file
/// creation, or writing fails.
pub fn write_parquet_vec<T: Serialize>(
    path: impl AsRef<Path>,
    columns: &[(&str, &str)],
    data: &[T],
) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }

    let fields = arrow_fields(columns)?;
    let batch: RecordBatch = to_record_batch(&fields, &data).context("convert rows to RecordBatch")?;

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let props = WriterProperties::builder().build();
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).context("create ArrowWriter")?;
    writer.write(&batch).context("write batch to parquet")?;
    writer.close().context("close ArrowWriter")?;

    Ok(data.len())
}

/// Read a Parquet file into a typed `Vec<T>`.
///
/// # Errors
/// Returns an error if the file cannot be opened, the reader cannot be built,
/// batch iteration fails, or conversion to `T` fails.
pub fn read_parquet_vec<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;

    let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("open ParquetRecordBatchReader")?
        .with_batch_size(64 * 1024)
        .build()
        .context("build ParquetRecordBatchReader")?;

    let mut out: Vec<T> = Vec::new();
    while let Some(batch) = reader.next().transpose().context("read next batch")? {
        let mut rows: Vec<T> =
            from_record_batch(&batch).context("deserialize RecordBatch rows")?;
        out.append(&mut rows);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DIM_HOTEL, FACT_REVIEWS, FactReview};
    use chrono::NaiveDate;

    fn fact(review_id: i64, date: Option<NaiveDate>) -> FactReview {
        FactReview {
            review_id,
            hotel_id: Some(1),
            reviewer_id: None,
            review_text_id: Some(2),
            review_date: date,
            reviewer_score: Some(9.5),
            review_total_negative_word_counts: Some(4),
            review_total_positive_word_counts: None,
            total_number_of_reviews_reviewer_has_given: Some(1),
            total_number_of_reviews: Some(120),
            additional_number_of_scoring: Some(7),
            days_since_review: None,
        }
    }

    #[test]
    fn fields_follow_declared_column_types() -> Result<()> {
        let fields = arrow_fields(FACT_REVIEWS.columns)?;
        assert_eq!(fields.len(), FACT_REVIEWS.columns.len());
        let date = fields.iter().find(|f| f.name() == "Review_Date").expect("date field");
        assert_eq!(date.data_type(), &DataType::Date32);
        assert!(date.is_nullable());
        assert_eq!(fields[0].data_type(), &DataType::Int64);
        assert!(!fields[0].is_nullable());

        let hotel = arrow_fields(DIM_HOTEL.columns)?;
        assert_eq!(hotel[3].data_type(), &DataType::Float32);
        assert!(arrow_fields(&[("x", "BLOB")]).is_err());
        Ok(())
    }

    #[test]
    fn dates_are_written_as_date32() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("facts.parquet");
        let rows = vec![fact(0, NaiveDate::from_ymd_opt(2017, 8, 3)), fact(1, None)];
        assert_eq!(write_parquet_vec(&path, FACT_REVIEWS.columns, &rows)?, 2);

        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?;
        let schema = builder.schema();
        assert_eq!(
            schema.field_with_name("Review_Date")?.data_type(),
            &DataType::Date32
        );

        let back: Vec<FactReview> = read_parquet_vec(&path)?;
        assert_eq!(back, rows);
        Ok(())
    }
}
