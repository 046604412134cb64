//! Slicer engine seam.
//!
//! Turning a mesh into per-height polygons is the job of an external slicer
//! engine. [`SliceEngine`] is the contract this crate consumes; [`PrismEngine`]
//! is a small engine for models that are already flat: extruded footprints
//! and stacks of pre-sliced layers.

use super::{LayerSlice, SlicingParams};
use crate::geometry::ExPolygons;
use crate::print::Model;
use crate::{CoordF, Error, Result};
use log::debug;

/// Geometry a model is sliced from.
#[derive(Clone, Debug)]
pub enum ModelSource {
    /// A footprint extruded from z = 0 up to `height`.
    Prism { footprint: ExPolygons, height: CoordF },
    /// Already sliced regions, one entry per layer, bottom first.
    Layers(Vec<ExPolygons>),
}

/// External slicer engine contract.
pub trait SliceEngine: Send + Sync {
    /// Cut a model into layers. `progress` receives the engine's own `[0, 1]`
    /// fraction; callers map it into the job's slicing range.
    fn slice_model(
        &self,
        model: &Model,
        params: &SlicingParams,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<LayerSlice>>;
}

/// Engine for prisms and pre-sliced layer stacks.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrismEngine;

impl PrismEngine {
    pub fn new() -> Self {
        Self
    }

    /// Number of cuts at `z = k * layer_height` strictly below `height`.
    pub fn layer_count(height: CoordF, layer_height: CoordF) -> usize {
        if height <= 0.0 || layer_height <= 0.0 {
            return 0;
        }
        // Tolerate float error so 0.15 / 0.05 yields 3 cuts, not 4
        ((height / layer_height) - 1e-9).ceil().max(0.0) as usize
    }
}

impl SliceEngine for PrismEngine {
    fn slice_model(
        &self,
        model: &Model,
        params: &SlicingParams,
        progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<LayerSlice>> {
        let layer_height = params.layer_height;
        if !layer_height.is_finite() || layer_height <= 0.0 {
            return Err(Error::Slicing(format!(
                "invalid layer height {layer_height}"
            )));
        }

        let layers = match &model.source {
            ModelSource::Prism { footprint, height } => {
                let count = Self::layer_count(*height, layer_height);
                let mut layers = Vec::with_capacity(count);
                for index in 0..count {
                    let z = index as CoordF * layer_height;
                    layers.push(LayerSlice::new(index, z, footprint.clone()));
                    progress((index + 1) as f64 / count as f64);
                }
                layers
            }
            ModelSource::Layers(stack) => {
                let count = stack.len();
                let mut layers = Vec::with_capacity(count);
                for (index, regions) in stack.iter().enumerate() {
                    let z = index as CoordF * layer_height;
                    layers.push(LayerSlice::new(index, z, regions.clone()));
                    progress((index + 1) as f64 / count as f64);
                }
                layers
            }
        };

        debug!("Sliced model '{}' into {} layers", model.name, layers.len());
        progress(1.0);
        Ok(layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ExPolygon;

    fn square() -> ExPolygons {
        vec![ExPolygon::rectangle_mm(-5.0, -5.0, 5.0, 5.0)]
    }

    #[test]
    fn test_layer_count() {
        assert_eq!(PrismEngine::layer_count(0.15, 0.05), 3);
        assert_eq!(PrismEngine::layer_count(0.16, 0.05), 4);
        assert_eq!(PrismEngine::layer_count(1.0, 0.05), 20);
        assert_eq!(PrismEngine::layer_count(0.0, 0.05), 0);
    }

    #[test]
    fn test_slice_prism() {
        let model = Model::new(
            "block",
            ModelSource::Prism {
                footprint: square(),
                height: 0.15,
            },
        );
        let mut reported = Vec::new();
        let layers = PrismEngine
            .slice_model(&model, &SlicingParams::new(0.05), &mut |f| reported.push(f))
            .unwrap();

        assert_eq!(layers.len(), 3);
        let heights: Vec<f64> = layers.iter().map(|l| l.z()).collect();
        assert!((heights[1] - 0.05).abs() < 1e-12);
        assert!((heights[2] - 0.10).abs() < 1e-12);
        assert_eq!(reported.last().copied(), Some(1.0));
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_slice_layer_stack() {
        let model = Model::new(
            "stack",
            ModelSource::Layers(vec![square(), Vec::new(), square()]),
        );
        let layers = PrismEngine
            .slice_model(&model, &SlicingParams::default(), &mut |_| {})
            .unwrap();
        assert_eq!(layers.len(), 3);
        assert!(layers[1].is_empty());
        assert_eq!(layers[2].index(), 2);
    }

    #[test]
    fn test_invalid_layer_height() {
        let model = Model::new("stack", ModelSource::Layers(vec![square()]));
        let result = PrismEngine.slice_model(&model, &SlicingParams::new(0.0), &mut |_| {});
        assert!(matches!(result, Err(Error::Slicing(_))));
    }
}
