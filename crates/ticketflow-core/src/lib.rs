pub mod category;
pub mod config;
pub mod dataset;
pub mod error;
pub mod field;
pub mod frames;
pub mod pipeline;
pub mod preprocess;
pub mod resolution;
pub mod stats;
pub mod timeline;

pub use category::{CategoryMapper, ProductLabel};
pub use config::TicketflowConfig;
pub use dataset::{Dataset, Record, Schema};
pub use error::{PipelineError, Result};
pub use field::FieldValue;
pub use pipeline::{ClassifiedDataset, TicketPipeline};
pub use preprocess::{Preprocessor, TimestampParser};
pub use resolution::ResolutionCalculator;
pub use stats::{DailyVolume, DatasetStats, ResolutionSummary};
pub use timeline::{
    SectionLabel, SegmentationStrategy, TimelineSection, TimelineSections, TimelineSegmenter,
};
