//! Print job model.
//!
//! A [`PrintJob`] is the build plate: its settings, the [`Model`]s placed on
//! it, the rasterized mask images and the final output. Every model shares
//! the job's layer index space, so layer `i` of the job is layer `i` of each
//! model that is tall enough to have one.

use crate::config::{RasterConfig, Settings};
use crate::export::ExportSummary;
use crate::preview::PreviewLayer;
use crate::raster::LayerImage;
use crate::slice::{LayerSlice, ModelSource};

/// One positioned solid on the build plate.
#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    /// Geometry handed to the slicer engine.
    pub source: ModelSource,
    slices: Vec<LayerSlice>,
}

impl Model {
    /// Create an unsliced model.
    pub fn new(name: impl Into<String>, source: ModelSource) -> Self {
        Self {
            name: name.into(),
            source,
            slices: Vec::new(),
        }
    }

    /// Layers produced by the slicer engine, bottom first.
    #[inline]
    pub fn slices(&self) -> &[LayerSlice] {
        &self.slices
    }

    /// Mutable access to the layers. The sequence itself cannot be resized.
    #[inline]
    pub fn slices_mut(&mut self) -> &mut [LayerSlice] {
        &mut self.slices
    }

    /// Replace the layers with a fresh slicing result.
    pub fn set_slices(&mut self, slices: Vec<LayerSlice>) {
        self.slices = slices;
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.slices.len()
    }

    /// Layer `index`, if the model reaches that high.
    #[inline]
    pub fn layer(&self, index: usize) -> Option<&LayerSlice> {
        self.slices.get(index)
    }
}

/// Final output of a job.
#[derive(Debug)]
pub enum PrintOutput {
    /// Mask images were streamed to a consumer.
    Exported(ExportSummary),
    /// Layer-by-layer preview standing in for device output.
    Preview(Vec<PreviewLayer>),
}

/// All models printed together plus everything produced for them.
#[derive(Debug, Default)]
pub struct PrintJob {
    pub settings: Settings,
    pub raster: RasterConfig,
    pub models: Vec<Model>,
    /// `images[i]` is the mask of layer index `i` across all models.
    pub images: Vec<LayerImage>,
    pub output: Option<PrintOutput>,
}

impl PrintJob {
    /// Create an empty job with the default mask surface.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Builder method: set the mask surface.
    pub fn with_raster(mut self, raster: RasterConfig) -> Self {
        self.raster = raster;
        self
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    /// Maximum layer count among the models (zero for an empty plate).
    pub fn layer_max(&self) -> usize {
        self.models
            .iter()
            .map(Model::layer_count)
            .max()
            .unwrap_or(0)
    }

    /// Drop images and output from a previous run.
    pub fn reset_output(&mut self) {
        self.images.clear();
        self.output = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ExPolygon;

    fn stack(layers: usize) -> Model {
        let mut model = Model::new("stack", ModelSource::Layers(Vec::new()));
        model.set_slices(
            (0..layers)
                .map(|i| {
                    LayerSlice::new(
                        i,
                        i as f64 * 0.05,
                        vec![ExPolygon::rectangle_mm(0.0, 0.0, 1.0, 1.0)],
                    )
                })
                .collect(),
        );
        model
    }

    #[test]
    fn test_layer_max() {
        let mut job = PrintJob::new(Settings::default());
        assert_eq!(job.layer_max(), 0);

        job.add_model(stack(3));
        job.add_model(stack(7));
        assert_eq!(job.layer_max(), 7);
        assert!(job.models[0].layer(5).is_none());
        assert!(job.models[1].layer(6).is_some());
    }

    #[test]
    fn test_reset_output() {
        let mut job = PrintJob::new(Settings::default());
        job.output = Some(PrintOutput::Preview(Vec::new()));
        job.reset_output();
        assert!(job.output.is_none());
        assert!(job.images.is_empty());
    }
}
