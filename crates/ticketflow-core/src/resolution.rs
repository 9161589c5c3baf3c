use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::dataset::Dataset;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Signed hours from acceptance to completion. Negative values are kept so
/// that bad source data stays visible.
pub fn resolution_hours(acceptance: NaiveDateTime, completion: NaiveDateTime) -> f64 {
    (completion - acceptance).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionCalculator;

impl ResolutionCalculator {
    /// The field is only derived when both timestamp columns exist and each
    /// holds at least one valid value somewhere in the dataset. Records lacking
    /// either timestamp keep `None`.
    pub fn with_resolution_time(&self, dataset: &Dataset) -> Dataset {
        if dataset.is_empty() {
            return dataset.clone();
        }

        let schema = dataset.schema();
        let gate_open = schema.acceptance_time.is_some()
            && schema.completion_time.is_some()
            && dataset.iter().any(|record| record.acceptance_time.is_valid())
            && dataset.iter().any(|record| record.completion_time.is_valid());

        let mut derived_schema = schema.clone();
        derived_schema.has_resolution_hours = gate_open;

        if !gate_open {
            debug!("timestamp columns missing or wholly invalid, skipping resolution hours");
        }

        let mut derived = 0usize;
        let records = dataset
            .iter()
            .map(|record| {
                let mut updated = record.clone();
                updated.resolution_hours = if gate_open {
                    match (record.acceptance_time.get(), record.completion_time.get()) {
                        (Some(acceptance), Some(completion)) => {
                            derived += 1;
                            Some(resolution_hours(acceptance, completion))
                        }
                        _ => None,
                    }
                } else {
                    None
                };
                updated
            })
            .collect();

        if gate_open {
            info!(
                records = dataset.len(),
                derived,
                "derived resolution hours"
            );
        }

        Dataset::new(derived_schema, records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::config::ColumnNames;
    use crate::dataset::{Record, Schema};
    use crate::field::FieldValue;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn record(
        acceptance: FieldValue<NaiveDateTime>,
        completion: FieldValue<NaiveDateTime>,
    ) -> Record {
        let mut record = Record::new(2, vec![None, None]);
        record.acceptance_time = acceptance;
        record.completion_time = completion;
        record
    }

    fn dataset(records: Vec<Record>) -> Dataset {
        let schema = Schema::resolve(
            vec!["ACCEPTANCE_TIME".into(), "COMPLETION_TIME".into()],
            &ColumnNames::default(),
        );
        Dataset::new(schema, records)
    }

    #[test]
    fn computes_fractional_and_negative_hours() {
        assert_eq!(resolution_hours(base(), base() + Duration::minutes(90)), 1.5);
        assert_eq!(resolution_hours(base(), base() - Duration::hours(2)), -2.0);
        assert_eq!(resolution_hours(base(), base()), 0.0);
    }

    #[test]
    fn derives_per_record_when_gate_passes() {
        let input = dataset(vec![
            record(
                FieldValue::Valid(base()),
                FieldValue::Valid(base() + Duration::hours(5)),
            ),
            record(FieldValue::Valid(base()), FieldValue::Invalid("x".into())),
            record(
                FieldValue::Absent,
                FieldValue::Valid(base() + Duration::hours(1)),
            ),
        ]);

        let derived = ResolutionCalculator.with_resolution_time(&input);
        assert!(derived.schema().has_resolution_hours);
        let hours: Vec<_> = derived.iter().map(|r| r.resolution_hours).collect();
        assert_eq!(hours, vec![Some(5.0), None, None]);
    }

    #[test]
    fn gate_passes_on_independent_columns() {
        // No single record has both timestamps, yet both columns hold a valid value.
        let input = dataset(vec![
            record(FieldValue::Valid(base()), FieldValue::Absent),
            record(FieldValue::Absent, FieldValue::Valid(base())),
        ]);
        let derived = ResolutionCalculator.with_resolution_time(&input);
        assert!(derived.schema().has_resolution_hours);
        assert!(derived.iter().all(|r| r.resolution_hours.is_none()));
    }

    #[test]
    fn wholly_invalid_column_disables_the_field() {
        let input = dataset(vec![
            record(FieldValue::Valid(base()), FieldValue::Invalid("n/a".into())),
            record(FieldValue::Valid(base()), FieldValue::Absent),
        ]);
        let derived = ResolutionCalculator.with_resolution_time(&input);
        assert!(!derived.schema().has_resolution_hours);
        assert!(derived.iter().all(|r| r.resolution_hours.is_none()));
    }

    #[test]
    fn missing_completion_column_disables_the_field() {
        let schema = Schema::resolve(vec!["ACCEPTANCE_TIME".into()], &ColumnNames::default());
        let mut only = Record::new(2, vec![None]);
        only.acceptance_time = FieldValue::Valid(base());
        let input = Dataset::new(schema, vec![only]);

        let derived = ResolutionCalculator.with_resolution_time(&input);
        assert!(!derived.schema().has_resolution_hours);
    }

    #[test]
    fn rerunning_is_stable() {
        let input = dataset(vec![record(
            FieldValue::Valid(base()),
            FieldValue::Valid(base() + Duration::minutes(30)),
        )]);
        let once = ResolutionCalculator.with_resolution_time(&input);
        let twice = ResolutionCalculator.with_resolution_time(&once);
        assert_eq!(once, twice);
    }
}
