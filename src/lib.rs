pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;

pub use config::{
    AreaMeasure, ChannelBounds, ColorRange, CountConfig, HueScale, OutlineStyle,
    StructuringElement,
};
pub use detection::{build_mask_pipeline, load_image, PlantCounter};
pub use error::{PlantError, Result};
pub use models::{CountOutcome, Region};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, PipelineData, PipelineStep};
pub use report::{RecordStore, ReportPaths, ResultReporter, RunRecord, StoreLock};
