//! # SLA Slicer
//!
//! Layer processing for vat-photopolymerization (SLA/MSLA) printers.
//!
//! This library takes the per-height polygon slices of each model on a build
//! plate and turns them into exposure masks:
//! - Layer refinement (shells, boolean correction, solid projection, solid fill)
//! - Rasterization of every layer index into a fixed-size mask image
//! - Streaming of the mask buffers to a consumer with backpressure
//! - A layer-by-layer preview built from the same geometry
//!
//! Mesh slicing itself is delegated to a [`SliceEngine`]; the bundled
//! [`PrismEngine`] only handles extruded footprints and pre-sliced stacks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sla_slicer::{DriverRegistry, PrintJob, SlaDriver, Settings};
//!
//! let mut registry = DriverRegistry::new();
//! registry.register(Arc::new(SlaDriver::default()));
//!
//! let mut job = PrintJob::new(Settings::default());
//! job.add_model(model);
//! let handle = sla_slicer::worker::spawn(job, registry.get("SLA")?, engine, 4);
//! for message in handle.messages() { /* progress, layers, completion */ }
//! ```

// Core modules
pub mod clipper;
pub mod config;
pub mod driver;
pub mod export;
pub mod geometry;
pub mod infill;
pub mod pipeline;
pub mod preview;
pub mod print;
pub mod raster;
pub mod shell;
pub mod slice;
pub mod worker;

// Re-export commonly used types
pub use config::{FillRule, JobFile, ModelSpec, RasterConfig, Settings};
pub use driver::{Driver, DriverRegistry, SlaDriver};
pub use export::{
    layer_channel, ExportSummary, LayerEncoder, LayerReceiver, LayerSender, LayerStreamExporter,
    OutputFormat, StreamMessage,
};
pub use geometry::{ExPolygon, ExPolygons, Point, PointF, Polygon};
pub use pipeline::{
    CancelToken, DegradedLayer, ProgressRange, RefineConfig, RefineReport, RefinementPipeline,
    Stage,
};
pub use preview::{PreviewLayer, PreviewRenderer};
pub use print::{Model, PrintJob, PrintOutput};
pub use raster::{LayerImage, LayerRasterizer};
pub use slice::{LayerSlice, ModelSource, PrismEngine, SliceEngine, SlicingParams};
pub use worker::{JobHandle, Phase, WorkerMessage};

/// Coordinate type used throughout the slicer.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// One model unit (mm, or one mask pixel) is 1_000_000 internal units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the slicer.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for slicer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Slicing error: {0}")]
    Slicing(String),

    #[error("Out of memory allocating layer {layer} ({bytes} bytes)")]
    ResourceExhausted { layer: usize, bytes: usize },

    #[error("Output format not supported yet: {0}")]
    Unsupported(String),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Consumer disconnected")]
    Disconnected,

    #[error("Cancelled")]
    Cancelled,
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        assert_eq!(scale(1.0), 1_000_000);
        assert!((unscale(1_000_000) - 1.0).abs() < 1e-10);

        // Epsilons used by the refinement stages survive scaling
        assert_eq!(scale(0.005), 5_000);
        assert_eq!(scale(0.05), 50_000);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::ResourceExhausted {
            layer: 7,
            bytes: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Out of memory allocating layer 7 (1024 bytes)"
        );
        assert_eq!(
            Error::Unsupported("photon".into()).to_string(),
            "Output format not supported yet: photon"
        );
    }
}
