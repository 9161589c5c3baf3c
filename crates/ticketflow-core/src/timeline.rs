//! Splits one product's tickets into the narrative sections used for
//! per-section summaries.
//!
//! Three strategies exist. Small datasets spread one ticket over each leading
//! section, short bursts are cut into fixed-size buckets, and anything else is
//! cut into equal-width time windows anchored at the earliest ticket.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SegmentationConfig;
use crate::dataset::{Dataset, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionLabel {
    InitialIssues,
    FollowUps,
    Developments,
    LaterIncidents,
    RecentEvents,
    /// Only used when no record carries a usable acceptance time.
    AllTickets,
}

impl SectionLabel {
    pub const TIMELINE: [SectionLabel; 5] = [
        SectionLabel::InitialIssues,
        SectionLabel::FollowUps,
        SectionLabel::Developments,
        SectionLabel::LaterIncidents,
        SectionLabel::RecentEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::InitialIssues => "Initial Issues",
            SectionLabel::FollowUps => "Follow-ups",
            SectionLabel::Developments => "Developments",
            SectionLabel::LaterIncidents => "Later Incidents",
            SectionLabel::RecentEvents => "Recent Events",
            SectionLabel::AllTickets => "All Tickets",
        }
    }
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SectionLabel {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        SectionLabel::TIMELINE
            .into_iter()
            .chain([SectionLabel::AllTickets])
            .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown section '{trimmed}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSection {
    pub label: SectionLabel,
    pub records: Vec<Record>,
}

impl TimelineSection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentationStrategy {
    Adaptive,
    CountBased { bucket_size: usize },
    TimeBased { window_days: i64 },
}

impl SegmentationStrategy {
    pub fn select(count: usize, date_range_days: i64, config: &SegmentationConfig) -> Self {
        if count <= config.adaptive_max_records {
            SegmentationStrategy::Adaptive
        } else if date_range_days <= config.count_based_max_range_days {
            SegmentationStrategy::CountBased {
                bucket_size: config.bucket_size.max(1),
            }
        } else {
            let windows = SectionLabel::TIMELINE.len() as i64;
            SegmentationStrategy::TimeBased {
                window_days: (date_range_days / windows).max(1),
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SegmentationStrategy::Adaptive => "adaptive",
            SegmentationStrategy::CountBased { .. } => "count_based",
            SegmentationStrategy::TimeBased { .. } => "time_based",
        }
    }

    /// `sorted` must be ordered ascending by time. Empty sections are dropped.
    pub fn partition(&self, sorted: Vec<(NaiveDateTime, Record)>) -> Vec<TimelineSection> {
        let buckets = match *self {
            SegmentationStrategy::Adaptive => leading_buckets(sorted, 1),
            SegmentationStrategy::CountBased { bucket_size } => {
                leading_buckets(sorted, bucket_size.max(1))
            }
            SegmentationStrategy::TimeBased { window_days } => {
                time_windows(sorted, window_days.max(1))
            }
        };

        SectionLabel::TIMELINE
            .into_iter()
            .zip(buckets)
            .filter(|(_, records)| !records.is_empty())
            .map(|(label, records)| TimelineSection { label, records })
            .collect()
    }
}

impl fmt::Display for SegmentationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationStrategy::Adaptive => f.write_str("adaptive"),
            SegmentationStrategy::CountBased { bucket_size } => {
                write!(f, "count_based(bucket_size={bucket_size})")
            }
            SegmentationStrategy::TimeBased { window_days } => {
                write!(f, "time_based(window_days={window_days})")
            }
        }
    }
}

/// The first four sections take `width` records each, the last takes the rest.
fn leading_buckets(sorted: Vec<(NaiveDateTime, Record)>, width: usize) -> Vec<Vec<Record>> {
    let last = SectionLabel::TIMELINE.len() - 1;
    let mut buckets: Vec<Vec<Record>> = vec![Vec::new(); SectionLabel::TIMELINE.len()];
    for (idx, (_, record)) in sorted.into_iter().enumerate() {
        buckets[(idx / width).min(last)].push(record);
    }
    buckets
}

/// Half-open windows `[anchor + k*w, anchor + (k+1)*w)`; the last window is
/// open-ended.
fn time_windows(sorted: Vec<(NaiveDateTime, Record)>, window_days: i64) -> Vec<Vec<Record>> {
    let last = SectionLabel::TIMELINE.len() - 1;
    let mut buckets: Vec<Vec<Record>> = vec![Vec::new(); SectionLabel::TIMELINE.len()];
    let Some(anchor) = sorted.first().map(|(at, _)| *at) else {
        return buckets;
    };
    let window_millis = Duration::days(window_days).num_milliseconds();

    for (at, record) in sorted {
        let offset = (at - anchor).num_milliseconds().max(0);
        let window = usize::try_from(offset / window_millis).unwrap_or(last);
        buckets[window.min(last)].push(record);
    }
    buckets
}

/// Result of segmenting one product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineSections {
    /// `None` when the input was empty or could not be ordered.
    pub strategy: Option<SegmentationStrategy>,
    pub date_range_days: Option<i64>,
    pub sections: Vec<TimelineSection>,
    /// Records without a valid acceptance time, left out of an ordered split.
    pub excluded: Vec<Record>,
}

impl TimelineSections {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineSection> {
        self.sections.iter()
    }

    pub fn get(&self, label: SectionLabel) -> Option<&TimelineSection> {
        self.sections.iter().find(|section| section.label == label)
    }

    pub fn labels(&self) -> Vec<SectionLabel> {
        self.sections.iter().map(|section| section.label).collect()
    }

    pub fn record_count(&self) -> usize {
        self.sections.iter().map(TimelineSection::len).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelineSegmenter {
    config: SegmentationConfig,
}

impl TimelineSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn segment(&self, dataset: &Dataset) -> TimelineSections {
        if dataset.is_empty() {
            return TimelineSections::default();
        }

        let has_valid_time = dataset.schema().acceptance_time.is_some()
            && dataset.iter().any(|record| record.acceptance_time.is_valid());
        if !has_valid_time {
            debug!(
                records = dataset.len(),
                "no usable acceptance time, returning a single section"
            );
            return TimelineSections {
                sections: vec![TimelineSection {
                    label: SectionLabel::AllTickets,
                    records: dataset.records().to_vec(),
                }],
                ..TimelineSections::default()
            };
        }

        let mut timed: Vec<(NaiveDateTime, Record)> = Vec::with_capacity(dataset.len());
        let mut excluded = Vec::new();
        for record in dataset {
            match record.acceptance_time.get() {
                Some(at) => timed.push((at, record.clone())),
                None => excluded.push(record.clone()),
            }
        }
        timed.sort_by_key(|(at, _)| *at);

        let date_range_days = match (timed.first(), timed.last()) {
            (Some((first, _)), Some((last, _))) => (*last - *first).num_days(),
            _ => 0,
        };

        let strategy = SegmentationStrategy::select(timed.len(), date_range_days, &self.config);
        debug!(
            strategy = %strategy,
            records = timed.len(),
            excluded = excluded.len(),
            date_range_days,
            "segmenting timeline"
        );

        TimelineSections {
            strategy: Some(strategy),
            date_range_days: Some(date_range_days),
            sections: strategy.partition(timed),
            excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: i64, hour: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(day)
            + Duration::hours(hour)
    }

    fn timed(count: usize) -> Vec<(NaiveDateTime, Record)> {
        (0..count)
            .map(|idx| (at(0, idx as i64), Record::new(idx, Vec::new())))
            .collect()
    }

    fn sizes(sections: &[TimelineSection]) -> Vec<(SectionLabel, usize)> {
        sections.iter().map(|s| (s.label, s.len())).collect()
    }

    #[test]
    fn strategy_boundaries() {
        let config = SegmentationConfig::default();
        assert_eq!(
            SegmentationStrategy::select(10, 100, &config),
            SegmentationStrategy::Adaptive
        );
        assert_eq!(
            SegmentationStrategy::select(11, 7, &config),
            SegmentationStrategy::CountBased { bucket_size: 2 }
        );
        assert_eq!(
            SegmentationStrategy::select(11, 8, &config),
            SegmentationStrategy::TimeBased { window_days: 1 }
        );
        assert_eq!(
            SegmentationStrategy::select(50, 40, &config),
            SegmentationStrategy::TimeBased { window_days: 8 }
        );
        assert_eq!(
            SegmentationStrategy::select(50, 12, &config),
            SegmentationStrategy::TimeBased { window_days: 2 }
        );
    }

    #[test]
    fn adaptive_fills_leading_sections_one_by_one() {
        let sections = SegmentationStrategy::Adaptive.partition(timed(3));
        assert_eq!(
            sizes(&sections),
            vec![
                (SectionLabel::InitialIssues, 1),
                (SectionLabel::FollowUps, 1),
                (SectionLabel::Developments, 1),
            ]
        );

        let sections = SegmentationStrategy::Adaptive.partition(timed(10));
        assert_eq!(
            sizes(&sections),
            vec![
                (SectionLabel::InitialIssues, 1),
                (SectionLabel::FollowUps, 1),
                (SectionLabel::Developments, 1),
                (SectionLabel::LaterIncidents, 1),
                (SectionLabel::RecentEvents, 6),
            ]
        );
        let recent: Vec<_> = sections[4].records.iter().map(|r| r.line_index).collect();
        assert_eq!(recent, vec![4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn count_based_uses_buckets_of_two() {
        let sections = SegmentationStrategy::CountBased { bucket_size: 2 }.partition(timed(12));
        assert_eq!(
            sizes(&sections),
            vec![
                (SectionLabel::InitialIssues, 2),
                (SectionLabel::FollowUps, 2),
                (SectionLabel::Developments, 2),
                (SectionLabel::LaterIncidents, 2),
                (SectionLabel::RecentEvents, 4),
            ]
        );
        let follow_ups: Vec<_> = sections[1].records.iter().map(|r| r.line_index).collect();
        assert_eq!(follow_ups, vec![2, 3]);
    }

    #[test]
    fn count_based_skips_unreached_buckets() {
        let sections = SegmentationStrategy::CountBased { bucket_size: 2 }.partition(timed(5));
        assert_eq!(
            sizes(&sections),
            vec![
                (SectionLabel::InitialIssues, 2),
                (SectionLabel::FollowUps, 2),
                (SectionLabel::Developments, 1),
            ]
        );
    }

    #[test]
    fn time_windows_are_half_open() {
        let records: Vec<_> = [0, 7, 8, 15, 16, 31, 32, 40]
            .into_iter()
            .enumerate()
            .map(|(idx, day)| (at(day, 0), Record::new(idx, Vec::new())))
            .collect();
        let sections = SegmentationStrategy::TimeBased { window_days: 8 }.partition(records);
        let days: Vec<Vec<usize>> = sections
            .iter()
            .map(|s| s.records.iter().map(|r| r.line_index).collect())
            .collect();
        assert_eq!(days, vec![vec![0, 1], vec![2, 3], vec![4], vec![5], vec![6, 7]]);
    }

    #[test]
    fn time_windows_omit_empty_periods() {
        let records: Vec<_> = [0, 1, 39]
            .into_iter()
            .enumerate()
            .map(|(idx, day)| (at(day, 0), Record::new(idx, Vec::new())))
            .collect();
        let sections = SegmentationStrategy::TimeBased { window_days: 8 }.partition(records);
        assert_eq!(
            sizes(&sections),
            vec![(SectionLabel::InitialIssues, 2), (SectionLabel::RecentEvents, 1)]
        );
    }

    #[test]
    fn labels_round_trip_through_display() {
        for label in SectionLabel::TIMELINE {
            assert_eq!(SectionLabel::try_from(label.as_str()), Ok(label));
        }
        assert_eq!(
            SectionLabel::try_from("all tickets"),
            Ok(SectionLabel::AllTickets)
        );
        assert!(SectionLabel::try_from("Epilogue").is_err());
    }

    #[test]
    fn strategy_serializes_with_a_kind_tag() {
        let strategy = SegmentationStrategy::CountBased { bucket_size: 2 };
        let value = serde_json::to_value(strategy).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "kind": "count_based", "bucket_size": 2 })
        );

        let back: SegmentationStrategy =
            serde_json::from_str(r#"{"kind":"time_based","window_days":8}"#).unwrap();
        assert_eq!(back, SegmentationStrategy::TimeBased { window_days: 8 });
        assert_eq!(
            serde_json::to_value(SegmentationStrategy::Adaptive).unwrap(),
            serde_json::json!({ "kind": "adaptive" })
        );
    }
}
