use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::dataset::{Dataset, Record, Schema};
use crate::error::{PipelineError, Result};
use crate::field::FieldValue;
use crate::timeline::TimelineSection;

/// The whole classified table: export columns in file order, coerced
/// timestamp columns as datetimes, then the derived product and resolution
/// columns when the corresponding stage ran.
pub fn to_dataframe(dataset: &Dataset) -> PolarsResult<DataFrame> {
    let schema = dataset.schema();
    let records = dataset.records();
    let product_name = schema.columns.product.as_str();
    let resolution_name = schema.columns.resolution_hours.as_str();

    let mut cols: Vec<Column> = Vec::with_capacity(schema.width() + 2);
    for (idx, header) in schema.headers.iter().enumerate() {
        let shadowed = (schema.has_product && header.eq_ignore_ascii_case(product_name))
            || (schema.has_resolution_hours && header.eq_ignore_ascii_case(resolution_name));
        if shadowed {
            continue;
        }
        cols.push(cell_column(schema, records, idx)?);
    }

    if schema.has_product {
        let products: Vec<Option<&str>> = records
            .iter()
            .map(|record| record.product.as_ref().map(|label| label.as_str()))
            .collect();
        cols.push(Series::new(product_name.into(), products).into());
    }

    if schema.has_resolution_hours {
        let hours: Vec<Option<f64>> = records.iter().map(|record| record.resolution_hours).collect();
        cols.push(Series::new(resolution_name.into(), hours).into());
    }

    DataFrame::new(cols)
}

/// The ticket columns shown next to a section summary. Requested columns the
/// export does not have are skipped.
pub fn section_frame(
    schema: &Schema,
    section: &TimelineSection,
    columns: &[String],
) -> PolarsResult<DataFrame> {
    let mut cols: Vec<Column> = Vec::with_capacity(columns.len());
    for name in columns {
        if let Some(idx) = schema.column_index(name) {
            cols.push(cell_column(schema, &section.records, idx)?);
        }
    }
    DataFrame::new(cols)
}

fn cell_column(schema: &Schema, records: &[Record], idx: usize) -> PolarsResult<Column> {
    let name = schema.headers[idx].as_str();

    if schema.timestamps_parsed && schema.is_timestamp_column(idx) {
        let pick = |record: &Record| -> Option<i64> {
            let value: &FieldValue<NaiveDateTime> = if schema.acceptance_time == Some(idx) {
                &record.acceptance_time
            } else {
                &record.completion_time
            };
            value.get().map(|dt| dt.and_utc().timestamp_micros())
        };
        let micros: Vec<Option<i64>> = records.iter().map(pick).collect();
        let series = Series::new(name.into(), micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
        return Ok(series.into());
    }

    let values: Vec<Option<&str>> = records.iter().map(|record| record.cell(idx)).collect();
    Ok(Series::new(name.into(), values).into())
}

/// Writes a frame as Parquet or CSV depending on the file extension.
pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("parquet") => {
            let file = File::create(path)?;
            ParquetWriter::new(file).finish(df)?;
        }
        Some("csv") => {
            let mut file = File::create(path)?;
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        other => {
            return Err(PipelineError::Validation(format!(
                "unsupported export format '{}', expected .csv or .parquet",
                other.unwrap_or("")
            )));
        }
    }
    Ok(())
}
