use std::sync::Arc;

use chrono::NaiveDateTime;
use ticketflow_parser::RawTable;

use crate::category::ProductLabel;
use crate::config::ColumnNames;
use crate::error::{PipelineError, Result};
use crate::field::FieldValue;

/// Header names of a dataset plus where the logical fields live.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub headers: Vec<String>,
    pub columns: ColumnNames,
    pub service_category: Option<usize>,
    pub acceptance_time: Option<usize>,
    pub completion_time: Option<usize>,
    /// Set once the preprocessor coerced the timestamp columns.
    pub timestamps_parsed: bool,
    /// Set once category mapping ran.
    pub has_product: bool,
    /// Set only when the resolution gate passed for the whole dataset.
    pub has_resolution_hours: bool,
}

impl Schema {
    pub fn resolve(headers: Vec<String>, columns: &ColumnNames) -> Self {
        let find = |name: &str| {
            let wanted = name.trim();
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(wanted))
        };

        let service_category = find(&columns.service_category);
        let acceptance_time = find(&columns.acceptance_time);
        let completion_time = find(&columns.completion_time);

        Self {
            service_category,
            acceptance_time,
            completion_time,
            columns: columns.clone(),
            headers,
            timestamps_parsed: false,
            has_product: false,
            has_resolution_hours: false,
        }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn is_timestamp_column(&self, idx: usize) -> bool {
        self.acceptance_time == Some(idx) || self.completion_time == Some(idx)
    }
}

/// One ticket. `cells` is the untouched export payload aligned with
/// [`Schema::headers`]; the remaining fields are filled in by pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub line_index: usize,
    pub cells: Vec<Option<String>>,
    pub acceptance_time: FieldValue<NaiveDateTime>,
    pub completion_time: FieldValue<NaiveDateTime>,
    pub product: Option<ProductLabel>,
    pub resolution_hours: Option<f64>,
}

impl Record {
    pub fn new(line_index: usize, cells: Vec<Option<String>>) -> Self {
        Self {
            line_index,
            cells,
            acceptance_time: FieldValue::Absent,
            completion_time: FieldValue::Absent,
            product: None,
            resolution_hours: None,
        }
    }

    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).and_then(|cell| cell.as_deref())
    }

    pub fn value<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a str> {
        schema.column_index(name).and_then(|idx| self.cell(idx))
    }

    pub fn service_category(&self, schema: &Schema) -> Option<&str> {
        schema.service_category.and_then(|idx| self.cell(idx))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self {
            schema: Arc::new(schema),
            records,
        }
    }

    pub fn empty(columns: &ColumnNames) -> Self {
        Self::new(Schema::resolve(Vec::new(), columns), Vec::new())
    }

    pub fn from_table(table: RawTable, columns: &ColumnNames) -> Self {
        let schema = Schema::resolve(table.headers, columns);
        let records = table
            .rows
            .into_iter()
            .map(|row| Record::new(row.line_index, row.cells))
            .collect();
        Self::new(schema, records)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// New dataset sharing this schema.
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            records,
        }
    }

    /// Every record must carry exactly one cell per header.
    pub fn validate_shape(&self, stage: &str) -> Result<()> {
        let width = self.schema.width();
        if let Some(record) = self.records.iter().find(|record| record.cells.len() != width) {
            return Err(PipelineError::Validation(format!(
                "{stage}: record from line {} has {} cells but the schema has {width} columns",
                record.line_index,
                record.cells.len()
            )));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        ticketflow_parser::parse_ticket_export(
            "order_number,Service_Category,ACCEPTANCE_TIME\n1,KAI,2024-01-01 00:00:00\n",
        )
        .unwrap()
        .table
    }

    #[test]
    fn resolves_logical_columns_case_insensitively() {
        let dataset = Dataset::from_table(table(), &ColumnNames::default());
        let schema = dataset.schema();
        assert_eq!(schema.service_category, Some(1));
        assert_eq!(schema.acceptance_time, Some(2));
        assert_eq!(schema.completion_time, None);
        assert!(!schema.has_product);
        assert_eq!(dataset.records()[0].service_category(schema), Some("KAI"));
        assert_eq!(dataset.records()[0].value(schema, "ORDER_NUMBER"), Some("1"));
    }

    #[test]
    fn shape_validation_reports_the_offending_line() {
        let dataset = Dataset::from_table(table(), &ColumnNames::default());
        let broken = dataset.with_records(vec![Record::new(7, vec![Some("1".into())])]);
        let err = broken.validate_shape("clean").expect_err("short record should fail");
        let message = err.to_string();
        assert!(message.contains("line 7"), "{message}");
        assert!(message.contains("clean"), "{message}");
    }

    #[test]
    fn padded_headers_resolve_for_every_lookup() {
        let headers = vec![" ORDER_NUMBER ".to_string(), "ACCEPTANCE_TIME\t".to_string()];
        let schema = Schema::resolve(headers, &ColumnNames::default());
        assert_eq!(schema.acceptance_time, Some(1));
        assert_eq!(schema.column_index("order_number"), Some(0));
        assert_eq!(schema.column_index(" ACCEPTANCE_TIME"), Some(1));
        assert_eq!(schema.column_index("COMPLETION_TIME"), None);
    }
}
