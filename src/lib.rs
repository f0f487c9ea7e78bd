pub mod config;
pub mod gallery;
pub mod labels;
pub mod logging;
pub mod metrics;
pub mod orders;
pub mod pipeline;
pub mod predictions;
pub mod schema;

pub use config::{GalleryConfig, PipelineConfig, Settings};
pub use schema::{ImageRecord, OrderGroup, OrdersArtifact, StepResult, Verdict};
