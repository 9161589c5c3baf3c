use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Immutable settings injected into every pipeline component.
///
/// All sections fall back to the built-in defaults, so a TOML file only has to
/// name what it overrides:
///
/// ```toml
/// [categories]
/// valid = ["KAI", "KAV"]
///
/// [categories.map]
/// KAI = "Broadband"
/// KAV = "Voice"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketflowConfig {
    pub columns: ColumnNames,
    pub categories: CategoryConfig,
    pub timestamps: TimestampConfig,
    pub segmentation: SegmentationConfig,
    pub display: DisplayConfig,
}

impl TicketflowConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str::<TicketflowConfig>(toml_str)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Header names of the logical fields. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub service_category: String,
    pub acceptance_time: String,
    pub completion_time: String,
    pub product: String,
    pub resolution_hours: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            service_category: "SERVICE_CATEGORY".to_string(),
            acceptance_time: "ACCEPTANCE_TIME".to_string(),
            completion_time: "COMPLETION_TIME".to_string(),
            product: "PRODUCT".to_string(),
            resolution_hours: "RESOLUTION_HOURS".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub map: BTreeMap<String, String>,
    pub valid: Vec<String>,
    pub fallback_label: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        let map = [
            ("KAI", "Broadband"),
            ("NET", "Broadband"),
            ("KAV", "Voice"),
            ("KAD", "TV"),
            ("GIGA", "GIGA"),
            ("VOD", "VOD"),
            ("HDW", "Hardware"),
        ]
        .into_iter()
        .map(|(code, label)| (code.to_string(), label.to_string()))
        .collect();

        let valid = ["HDW", "NET", "KAI", "KAV", "GIGA", "VOD", "KAD"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            map,
            valid,
            fallback_label: "Unknown".to_string(),
        }
    }
}

/// chrono format strings, tried in order after RFC 3339. Slash dates are
/// month-first; dotted dates are day-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    pub formats: Vec<String>,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        let formats = [
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%d.%m.%Y %H:%M:%S",
            "%d.%m.%Y %H:%M",
            "%m/%d/%Y %H:%M:%S",
            "%m/%d/%Y %H:%M",
            "%Y/%m/%d %H:%M:%S",
            "%Y/%m/%d %H:%M",
            "%Y-%m-%d",
            "%d.%m.%Y",
            "%m/%d/%Y",
            "%Y/%m/%d",
        ];
        Self {
            formats: formats.into_iter().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Datasets up to this size use one record per leading section.
    pub adaptive_max_records: usize,
    /// Larger datasets spanning at most this many days are split by count.
    pub count_based_max_range_days: i64,
    pub bucket_size: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            adaptive_max_records: 10,
            count_based_max_range_days: 7,
            bucket_size: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub ticket_columns: Vec<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            ticket_columns: ["ORDER_NUMBER", "ACCEPTANCE_TIME", "ORDER_DESCRIPTION_1"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = TicketflowConfig::from_toml_str(
            r#"
            [categories]
            valid = ["KAI"]

            [segmentation]
            bucket_size = 3
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.categories.valid, vec!["KAI"]);
        assert_eq!(config.categories.map.get("KAV").map(String::as_str), Some("Voice"));
        assert_eq!(config.categories.fallback_label, "Unknown");
        assert_eq!(config.segmentation.bucket_size, 3);
        assert_eq!(config.segmentation.adaptive_max_records, 10);
        assert_eq!(config.columns, ColumnNames::default());
    }

    #[test]
    fn empty_toml_is_default() {
        let config = TicketflowConfig::from_toml_str("").unwrap();
        assert_eq!(config, TicketflowConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        let err = TicketflowConfig::from_toml_str("[segmentation]\nbucket_size = \"two\"")
            .expect_err("string bucket size should fail");
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
