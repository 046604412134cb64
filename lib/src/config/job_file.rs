//! JSON job files.
//!
//! A job file bundles the settings, the mask surface and the models placed on
//! the build plate. Models are either extruded footprints (prisms) or stacks
//! of already sliced layers.
//!
//! ```json
//! {
//!   "settings": { "layer_height": 0.05, "solid_layer_span": 5 },
//!   "raster": { "width": 2560, "height": 1440 },
//!   "models": [
//!     { "name": "block", "outline": [[-5,-5],[5,-5],[5,5],[-5,5]], "height": 1.0 }
//!   ]
//! }
//! ```

use super::{RasterConfig, Settings};
use crate::geometry::{ExPolygon, ExPolygons, PointF, Polygon};
use crate::print::Model;
use crate::slice::ModelSource;
use crate::{scale, CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One region of a layer: an outline with optional holes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub outline: Vec<[CoordF; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[CoordF; 2]>>,
}

impl RegionSpec {
    fn to_expolygon(&self, offset: [CoordF; 2]) -> ExPolygon {
        let ring = |points: &[[CoordF; 2]]| {
            let points: Vec<PointF> = points.iter().copied().map(PointF::from).collect();
            let mut polygon = Polygon::from_points_f(&points);
            polygon.translate(scale(offset[0]), scale(offset[1]));
            polygon
        };
        ExPolygon::with_holes(
            ring(&self.outline),
            self.holes.iter().map(|hole| ring(hole)).collect(),
        )
    }
}

/// A model placed on the build plate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub name: String,
    /// Footprint outline of a prism model.
    #[serde(default)]
    pub outline: Vec<[CoordF; 2]>,
    /// Holes through a prism model.
    #[serde(default)]
    pub holes: Vec<Vec<[CoordF; 2]>>,
    /// Height of a prism model.
    #[serde(default)]
    pub height: CoordF,
    /// Pre-sliced layers, bottom first. Takes precedence over the prism fields.
    #[serde(default)]
    pub layers: Vec<Vec<RegionSpec>>,
    /// Placement on the build plate.
    #[serde(default)]
    pub offset: [CoordF; 2],
}

impl ModelSpec {
    /// Build the model this entry describes.
    pub fn to_model(&self) -> Result<Model> {
        let source = if !self.layers.is_empty() {
            ModelSource::Layers(
                self.layers
                    .iter()
                    .map(|regions| -> ExPolygons {
                        regions
                            .iter()
                            .map(|region| region.to_expolygon(self.offset))
                            .collect()
                    })
                    .collect(),
            )
        } else {
            if self.outline.len() < 3 {
                return Err(Error::Config(format!(
                    "model '{}' needs an outline with at least 3 points or explicit layers",
                    self.name
                )));
            }
            if !self.height.is_finite() || self.height <= 0.0 {
                return Err(Error::Config(format!(
                    "model '{}' has invalid height {}",
                    self.name, self.height
                )));
            }
            let region = RegionSpec {
                outline: self.outline.clone(),
                holes: self.holes.clone(),
            };
            ModelSource::Prism {
                footprint: vec![region.to_expolygon(self.offset)],
                height: self.height,
            }
        };
        Ok(Model::new(self.name.clone(), source))
    }
}

/// A complete job description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub raster: RasterConfig,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

impl JobFile {
    /// Load a job file from JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a job description from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let job: JobFile = serde_json::from_str(json)?;
        job.settings.validate()?;
        job.raster.validate()?;
        Ok(job)
    }

    /// Build the models described by this job.
    pub fn build_models(&self) -> Result<Vec<Model>> {
        self.models.iter().map(ModelSpec::to_model).collect()
    }
}

/// Convenience for tests and callers building a square footprint centered on a point.
pub fn square_outline(center: [CoordF; 2], size: CoordF) -> Vec<[CoordF; 2]> {
    let h = size / 2.0;
    let [cx, cy] = center;
    vec![
        [cx - h, cy - h],
        [cx + h, cy - h],
        [cx + h, cy + h],
        [cx - h, cy + h],
    ]
}
