//! Layer preview module.
//!
//! Builds the layer-by-layer preview shown to the user from the same boundary
//! regions the rasterizer draws. Runs in the foreground after the background
//! job has handed the refined models back.
//!
//! Layer indices are walked from zero with no upper bound; the walk ends at
//! the first index where no model has a polygon, and the collected layers
//! become the job output.

use crate::geometry::{ExPolygon, PointF};
use crate::print::{Model, PrintJob, PrintOutput};
use crate::CoordF;
use log::debug;

/// Default outline color (RGB).
pub const PREVIEW_COLOR: u32 = 0x888888;

/// One closed outline of a preview layer.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewPolygon {
    pub contour: Vec<PointF>,
    pub holes: Vec<Vec<PointF>>,
    /// RGB color.
    pub color: u32,
    pub filled: bool,
}

impl PreviewPolygon {
    fn from_region(region: &ExPolygon, color: u32) -> Self {
        Self {
            contour: region.contour.points_f().collect(),
            holes: region
                .holes
                .iter()
                .map(|hole| hole.points_f().collect())
                .collect(),
            color,
            filled: true,
        }
    }
}

/// Renderable outlines of one layer index across all models.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreviewLayer {
    pub index: usize,
    pub z: CoordF,
    pub polygons: Vec<PreviewPolygon>,
}

impl PreviewLayer {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Number of polygons drawn into this layer.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Axis-aligned bounds `(min, max)` of all outlines.
    pub fn bounds(&self) -> Option<(PointF, PointF)> {
        let mut points = self.polygons.iter().flat_map(|p| p.contour.iter());
        let first = *points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (
                PointF::new(min.x.min(p.x), min.y.min(p.y)),
                PointF::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }
}

/// Builds preview layers for a job.
#[derive(Clone, Debug)]
pub struct PreviewRenderer {
    color: u32,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self {
            color: PREVIEW_COLOR,
        }
    }
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the outline color.
    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// Render all layers and store them as the job output.
    /// Returns the number of preview layers.
    pub fn render(&self, job: &mut PrintJob) -> usize {
        let mut layers = Vec::new();
        for index in 0.. {
            let layer = self.render_layer(&job.models, index);
            if layer.is_empty() {
                break;
            }
            layers.push(layer);
        }

        debug!("Preview has {} layers", layers.len());
        let count = layers.len();
        job.output = Some(PrintOutput::Preview(layers));
        count
    }

    /// Outlines of every model at one layer index.
    pub fn render_layer(&self, models: &[Model], index: usize) -> PreviewLayer {
        let mut layer = PreviewLayer::new(index);
        for slice in models.iter().filter_map(|model| model.layer(index)) {
            layer.z = slice.z();
            layer.polygons.extend(
                slice
                    .boundary()
                    .iter()
                    .map(|region| PreviewPolygon::from_region(region, self.color)),
            );
        }
        layer
    }
}
