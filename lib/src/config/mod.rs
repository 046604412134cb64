//! Configuration module.
//!
//! - [`Settings`] - slicing settings for one job (layer height, solid span)
//! - [`RasterConfig`] - exposure mask surface (resolution, fill rule, colors)
//! - [`JobFile`] - JSON job description with models

mod job_file;
mod print_config;

pub use job_file::{square_outline, JobFile, ModelSpec, RegionSpec};
pub use print_config::{
    FillRule, RasterConfig, Settings, DEFAULT_HEIGHT, DEFAULT_LAYER_HEIGHT,
    DEFAULT_SOLID_LAYER_SPAN, DEFAULT_WIDTH,
};
