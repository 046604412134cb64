//! Slicing module - per-height layers of each model.
//!
//! - [`LayerSlice`] - one cross-section of one model plus its derived geometry
//! - [`SliceEngine`] - contract of the external slicer engine
//! - [`PrismEngine`] - engine for extruded footprints and pre-sliced stacks
//! - [`SlicingParams`] - parameters handed to the engine
//! - [`surface`] - flat/bridge detection and projection between layers

mod engine;
mod layer;
mod slicing_params;
pub mod surface;

pub use engine::{ModelSource, PrismEngine, SliceEngine};
pub use layer::LayerSlice;
pub use slicing_params::SlicingParams;
pub use surface::{detect_surfaces, project_onto, LayerSurfaces, SurfaceType};
