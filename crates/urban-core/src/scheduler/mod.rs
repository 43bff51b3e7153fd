//! Scheduler de generación y fachada de armado del pipeline.

pub mod builder;
pub mod core;

pub use builder::{PipelineBuilder, UrbanPipeline};
pub use core::{GenerationScheduler, JobProgress, StageStatusView};
