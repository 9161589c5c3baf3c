//! Orchestrates clean -> map categories -> resolution time, and answers the
//! per-product queries on the result.

use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::category::{CategoryMapper, ProductLabel};
use crate::config::TicketflowConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::frames;
use crate::preprocess::Preprocessor;
use crate::resolution::ResolutionCalculator;
use crate::stats::{self, DailyVolume, DatasetStats, ResolutionSummary};
use crate::timeline::{TimelineSection, TimelineSections, TimelineSegmenter};

#[derive(Debug, Clone)]
pub struct TicketPipeline {
    config: TicketflowConfig,
    preprocessor: Preprocessor,
    mapper: CategoryMapper,
    calculator: ResolutionCalculator,
    segmenter: TimelineSegmenter,
}

impl TicketPipeline {
    pub fn new(config: TicketflowConfig) -> Self {
        Self {
            preprocessor: Preprocessor::new(&config.categories, &config.timestamps),
            mapper: CategoryMapper::new(&config.categories),
            calculator: ResolutionCalculator,
            segmenter: TimelineSegmenter::new(config.segmentation.clone()),
            config,
        }
    }

    pub fn config(&self) -> &TicketflowConfig {
        &self.config
    }

    pub fn segmenter(&self) -> &TimelineSegmenter {
        &self.segmenter
    }

    /// Parses a delimited export into an unclassified dataset.
    pub fn load_text(&self, content: &str) -> Result<Dataset> {
        let parsed = ticketflow_parser::parse_ticket_export(content)?;
        debug!(
            delimiter = %parsed.delimiter,
            rows = parsed.table.len(),
            columns = parsed.table.headers.len(),
            content_hash = %parsed.content_hash,
            "parsed ticket export"
        );
        Ok(Dataset::from_table(parsed.table, &self.config.columns))
    }

    pub fn run_text(&self, content: &str) -> Result<ClassifiedDataset> {
        let raw = self.load_text(content)?;
        self.run(&raw)
    }

    pub fn run(&self, raw: &Dataset) -> Result<ClassifiedDataset> {
        let cleaned = self.preprocessor.clean(raw)?;
        let classified = self.classify(&cleaned)?;

        info!(
            raw = raw.len(),
            classified = classified.len(),
            resolution_hours = classified.schema().has_resolution_hours,
            "classified ticket dataset"
        );

        Ok(ClassifiedDataset {
            dataset: classified,
            segmenter: self.segmenter.clone(),
            display_columns: self.config.display.ticket_columns.clone(),
        })
    }

    /// Category mapping followed by resolution time. Running it again on its
    /// own output changes nothing.
    pub fn classify(&self, cleaned: &Dataset) -> Result<Dataset> {
        let mapped = self.mapper.map_categories(cleaned)?;
        Ok(self.calculator.with_resolution_time(&mapped))
    }
}

impl Default for TicketPipeline {
    fn default() -> Self {
        Self::new(TicketflowConfig::default())
    }
}

/// Output of a pipeline run. Owns its data, so it can be shared across
/// threads for per-product work.
#[derive(Debug, Clone)]
pub struct ClassifiedDataset {
    dataset: Dataset,
    segmenter: TimelineSegmenter,
    display_columns: Vec<String>,
}

impl ClassifiedDataset {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn display_columns(&self) -> &[String] {
        &self.display_columns
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats::from_dataset(&self.dataset)
    }

    pub fn products(&self) -> Vec<ProductLabel> {
        stats::unique_products(&self.dataset)
    }

    /// Records of one product in dataset order.
    pub fn product_records(&self, product: &str) -> Dataset {
        let records = self
            .dataset
            .iter()
            .filter(|record| {
                record
                    .product
                    .as_ref()
                    .is_some_and(|label| label.as_str() == product)
            })
            .cloned()
            .collect();
        self.dataset.with_records(records)
    }

    pub fn sections_for(&self, product: &str) -> TimelineSections {
        self.segmenter.segment(&self.product_records(product))
    }

    pub fn all_sections(&self) -> Vec<(ProductLabel, TimelineSections)> {
        self.products()
            .into_iter()
            .map(|product| {
                let sections = self.sections_for(product.as_str());
                (product, sections)
            })
            .collect()
    }

    pub fn resolution_summary(&self) -> Vec<ResolutionSummary> {
        stats::resolution_summary(&self.dataset)
    }

    pub fn daily_volume(&self) -> Vec<DailyVolume> {
        stats::daily_volume(&self.dataset)
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(frames::to_dataframe(&self.dataset)?)
    }

    /// Relevant-ticket table for one section, restricted to the configured
    /// display columns.
    pub fn section_frame(&self, section: &TimelineSection) -> Result<DataFrame> {
        Ok(frames::section_frame(
            self.dataset.schema(),
            section,
            &self.display_columns,
        )?)
    }
}
