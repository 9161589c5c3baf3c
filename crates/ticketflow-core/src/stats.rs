use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::category::ProductLabel;
use crate::dataset::{Dataset, Record};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_count: usize,
    pub unique_product_count: usize,
    /// First-seen order.
    pub products: Vec<ProductLabel>,
}

impl DatasetStats {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        if dataset.is_empty() {
            return Self::default();
        }
        let products = unique_products(dataset);
        Self {
            total_count: dataset.len(),
            unique_product_count: products.len(),
            products,
        }
    }
}

pub fn unique_products(dataset: &Dataset) -> Vec<ProductLabel> {
    let mut products: Vec<ProductLabel> = Vec::new();
    for label in dataset.iter().filter_map(|record| record.product.as_ref()) {
        if !products.contains(label) {
            products.push(label.clone());
        }
    }
    products
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub product: ProductLabel,
    pub count: usize,
    pub mean_hours: f64,
    pub median_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

/// Per-product resolution statistics over records that have a resolution
/// value. Empty when the dataset never derived the field.
pub fn resolution_summary(dataset: &Dataset) -> Vec<ResolutionSummary> {
    if !dataset.schema().has_resolution_hours {
        return Vec::new();
    }

    let mut per_product: HashMap<&ProductLabel, Vec<f64>> = HashMap::new();
    for record in dataset {
        if let (Some(product), Some(hours)) = (record.product.as_ref(), record.resolution_hours) {
            per_product.entry(product).or_default().push(hours);
        }
    }

    unique_products(dataset)
        .into_iter()
        .filter_map(|product| {
            let mut hours = per_product.remove(&product)?;
            hours.sort_by(f64::total_cmp);
            let count = hours.len();
            let mean_hours = hours.iter().sum::<f64>() / count as f64;
            let median_hours = if count % 2 == 0 {
                (hours[count / 2 - 1] + hours[count / 2]) / 2.0
            } else {
                hours[count / 2]
            };
            Some(ResolutionSummary {
                count,
                mean_hours,
                median_hours,
                min_hours: hours[0],
                max_hours: hours[count - 1],
                product,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub product: ProductLabel,
    pub count: usize,
}

/// Ticket counts per acceptance date and product, ordered by date and then by
/// first-seen product order. Records without a valid acceptance time are not
/// counted.
pub fn daily_volume(dataset: &Dataset) -> Vec<DailyVolume> {
    let products = unique_products(dataset);
    let rank = |label: &ProductLabel| products.iter().position(|p| p == label);

    let mut counts: HashMap<(NaiveDate, usize), usize> = HashMap::new();
    for record in dataset {
        let Some((date, product_rank)) = day_and_rank(record, &rank) else {
            continue;
        };
        *counts.entry((date, product_rank)).or_default() += 1;
    }

    let mut keys: Vec<(NaiveDate, usize)> = counts.keys().copied().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| DailyVolume {
            date: key.0,
            product: products[key.1].clone(),
            count: counts[&key],
        })
        .collect()
}

fn day_and_rank(
    record: &Record,
    rank: &impl Fn(&ProductLabel) -> Option<usize>,
) -> Option<(NaiveDate, usize)> {
    let at = record.acceptance_time.get()?;
    let product_rank = rank(record.product.as_ref()?)?;
    Some((at.date(), product_rank))
}
