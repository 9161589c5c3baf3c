use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CategoryConfig;
use crate::dataset::Dataset;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductLabel(String);

impl ProductLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for ProductLabel {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProductLabel {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Maps service category codes to product labels. Total: unknown or missing
/// codes resolve to the fallback label.
#[derive(Debug, Clone)]
pub struct CategoryMapper {
    table: HashMap<String, ProductLabel>,
    fallback: ProductLabel,
}

impl CategoryMapper {
    pub fn new(config: &CategoryConfig) -> Self {
        let table = config
            .map
            .iter()
            .map(|(code, label)| (code.trim().to_string(), ProductLabel::new(label.as_str())))
            .collect();
        Self {
            table,
            fallback: ProductLabel::new(config.fallback_label.as_str()),
        }
    }

    pub fn fallback(&self) -> &ProductLabel {
        &self.fallback
    }

    pub fn map(&self, code: Option<&str>) -> ProductLabel {
        code.map(str::trim)
            .and_then(|code| self.table.get(code))
            .unwrap_or(&self.fallback)
            .clone()
    }

    /// Assigns a product to every record. Without a category column the whole
    /// dataset maps to the fallback label.
    pub fn map_categories(&self, dataset: &Dataset) -> Result<Dataset> {
        dataset.validate_shape("category mapping")?;

        let schema = dataset.schema();
        if schema.service_category.is_none() {
            debug!(
                column = %schema.columns.service_category,
                "category column missing, assigning fallback product"
            );
        }

        let records = dataset
            .iter()
            .map(|record| {
                let mut mapped = record.clone();
                mapped.product = Some(self.map(record.service_category(schema)));
                mapped
            })
            .collect();

        let mut mapped_schema = schema.clone();
        mapped_schema.has_product = true;
        Ok(Dataset::new(mapped_schema, records))
    }
}

impl Default for CategoryMapper {
    fn default() -> Self {
        Self::new(&CategoryConfig::default())
    }
}
