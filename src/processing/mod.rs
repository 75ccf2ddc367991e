//! Option-driven image processing
//!
//! A flat [`ProcessingOptions`] record selects which stages of a fixed
//! pipeline run; see [`Pipeline::process`] for the order.

pub mod options;
pub mod pipeline;
pub mod steps;

pub use options::{EqualizationMode, Flip, ProcessingOptions, ResizeTarget};
pub use pipeline::{process_image, Pipeline, PipelineOutput, StepTiming};
