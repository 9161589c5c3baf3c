use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::config::{CategoryConfig, TimestampConfig};
use crate::dataset::{Dataset, Record};
use crate::error::Result;
use crate::field::FieldValue;

#[derive(Debug, Clone)]
pub struct TimestampParser {
    formats: Vec<String>,
}

impl TimestampParser {
    pub fn new(config: &TimestampConfig) -> Self {
        Self {
            formats: config.formats.clone(),
        }
    }

    /// RFC 3339 values are normalised to UTC; everything else is taken as
    /// naive local time. Date-only formats land on midnight.
    pub fn parse(&self, raw: Option<&str>) -> FieldValue<NaiveDateTime> {
        let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return FieldValue::Absent;
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return FieldValue::Valid(dt.naive_utc());
        }

        for fmt in &self.formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
                return FieldValue::Valid(dt);
            }
            if let Some(dt) = NaiveDate::parse_from_str(value, fmt)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
            {
                return FieldValue::Valid(dt);
            }
        }

        FieldValue::Invalid(value.to_string())
    }
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::new(&TimestampConfig::default())
    }
}

/// Drops records outside the category whitelist and coerces the timestamp
/// columns.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    valid_categories: HashSet<String>,
    timestamps: TimestampParser,
}

impl Preprocessor {
    pub fn new(categories: &CategoryConfig, timestamps: &TimestampConfig) -> Self {
        Self {
            valid_categories: categories
                .valid
                .iter()
                .map(|code| code.trim().to_string())
                .collect(),
            timestamps: TimestampParser::new(timestamps),
        }
    }

    pub fn clean(&self, dataset: &Dataset) -> Result<Dataset> {
        if dataset.is_empty() {
            return Ok(dataset.clone());
        }
        dataset.validate_shape("preprocessing")?;

        let schema = dataset.schema();
        let mut invalid_acceptance = 0usize;
        let mut invalid_completion = 0usize;

        let records: Vec<Record> = dataset
            .iter()
            .filter(|record| match schema.service_category {
                Some(idx) => record
                    .cell(idx)
                    .is_some_and(|code| self.valid_categories.contains(code.trim())),
                None => true,
            })
            .map(|record| {
                let mut cleaned = record.clone();
                cleaned.acceptance_time = match schema.acceptance_time {
                    Some(idx) => self.timestamps.parse(record.cell(idx)),
                    None => FieldValue::Absent,
                };
                cleaned.completion_time = match schema.completion_time {
                    Some(idx) => self.timestamps.parse(record.cell(idx)),
                    None => FieldValue::Absent,
                };
                invalid_acceptance += usize::from(cleaned.acceptance_time.is_invalid());
                invalid_completion += usize::from(cleaned.completion_time.is_invalid());
                cleaned
            })
            .collect();

        if invalid_acceptance > 0 || invalid_completion > 0 {
            warn!(
                invalid_acceptance,
                invalid_completion, "unparsable timestamps treated as missing"
            );
        }
        info!(
            input = dataset.len(),
            retained = records.len(),
            dropped = dataset.len() - records.len(),
            category_filter = schema.service_category.is_some(),
            "preprocessed ticket records"
        );

        let mut cleaned_schema = schema.clone();
        cleaned_schema.timestamps_parsed = true;
        Ok(Dataset::new(cleaned_schema, records))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(&CategoryConfig::default(), &TimestampConfig::default())
    }
}
