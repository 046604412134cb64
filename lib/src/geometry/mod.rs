//! Geometry primitives for the slicer.
//!
//! - [`Point`] / [`PointF`] - scaled integer and unscaled floating-point points
//! - [`Polygon`] - closed ring
//! - [`ExPolygon`] - region with an outer contour and holes
//!
//! ## Coordinate System
//!
//! Coordinates are stored as integers scaled by `SCALING_FACTOR` (1,000,000).
//! Use `scale()` / `unscale()` to convert between model units and internal units.
//! Model units map one-to-one onto mask pixels when a layer is rasterized.

mod expolygon;
mod point;
mod polygon;
pub mod simplify;

pub use expolygon::{total_area_unscaled, ExPolygon, ExPolygons};
pub use point::{Point, PointF};
pub use polygon::{Polygon, Polygons};
pub use simplify::{merge_close_vertices, merge_close_vertices_ex, remove_duplicate_points};
