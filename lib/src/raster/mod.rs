//! Layer rasterization module.
//!
//! Every layer index of a job becomes one exposure mask: a fixed-size RGBA
//! buffer holding the boundary regions of every model at that index, filled
//! with the mask color. Model coordinates map onto pixels by translation
//! alone, `(x + width/2, y + height/2)`, so the model origin sits at the
//! buffer center.
//!
//! Each region is drawn as one path (contour and holes) under the configured
//! [`FillRule`](crate::config::FillRule). Separate regions and separate models
//! are separate paths, so where they overlap the pixels are simply painted
//! twice.
//!
//! Iteration stops at the first index where no model contributes a polygon;
//! that empty layer is not emitted.

pub mod fill;

use crate::config::RasterConfig;
use crate::pipeline::CancelToken;
use crate::print::{Model, PrintJob};
use crate::{unscale, Error, Result};
use fill::{fill_path, Ring};
use image::{Rgba, RgbaImage};
use log::debug;

/// Exposure mask of one layer index.
#[derive(Clone, Debug)]
pub struct LayerImage {
    pub index: usize,
    pub image: RgbaImage,
}

impl LayerImage {
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA bytes, row major.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Take the pixel buffer without copying it.
    #[inline]
    pub fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }

    /// Count pixels of exactly `color`.
    pub fn count_pixels(&self, color: [u8; 4]) -> usize {
        self.image.pixels().filter(|p| p.0 == color).count()
    }
}

/// Draws job layers into mask images.
#[derive(Clone, Debug, Default)]
pub struct LayerRasterizer {
    config: RasterConfig,
    cancel: CancelToken,
}

impl LayerRasterizer {
    pub fn new(config: RasterConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Builder: share a cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Rasterize every layer of a job into `job.images`.
    ///
    /// Progress is `index / layer_max` after each layer, then `1.0` once.
    /// Returns the number of images produced.
    pub fn rasterize<F>(&self, job: &mut PrintJob, mut on_progress: F) -> Result<usize>
    where
        F: FnMut(f64),
    {
        job.images.clear();
        let layer_max = job.layer_max();
        let mut images = Vec::new();

        for image in self.layers(&job.models) {
            let image = image?;
            on_progress(image.index as f64 / layer_max as f64);
            images.push(image);
        }
        on_progress(1.0);

        debug!(
            "Rasterized {} of {} layers at {}",
            images.len(),
            layer_max,
            self.config
        );
        job.images = images;
        Ok(job.images.len())
    }

    /// Lazily rasterize the layers of a set of models, one buffer at a time.
    pub fn layers<'a>(&'a self, models: &'a [Model]) -> Layers<'a> {
        Layers {
            rasterizer: self,
            models,
            index: 0,
            layer_max: models.iter().map(Model::layer_count).max().unwrap_or(0),
            done: false,
        }
    }

    /// Rasterize layer `index` across all models.
    ///
    /// Returns `None` when no model has a polygon at that index.
    pub fn rasterize_layer(&self, models: &[Model], index: usize) -> Result<Option<LayerImage>> {
        let count: usize = models
            .iter()
            .filter_map(|model| model.layer(index))
            .map(|layer| layer.polygon_count())
            .sum();
        if count == 0 {
            return Ok(None);
        }

        let mut image = self.allocate(index)?;
        let (cx, cy) = (
            self.config.width as f64 / 2.0,
            self.config.height as f64 / 2.0,
        );
        let color = Rgba(self.config.fill_color);

        for layer in models.iter().filter_map(|model| model.layer(index)) {
            for region in layer.boundary() {
                let rings: Vec<Ring> = region
                    .rings()
                    .map(|ring| {
                        ring.points()
                            .iter()
                            .map(|p| (unscale(p.x) + cx, unscale(p.y) + cy))
                            .collect()
                    })
                    .collect();
                fill_path(&mut image, &rings, self.config.fill_rule, color);
            }
        }

        Ok(Some(LayerImage { index, image }))
    }

    /// Allocate a background-filled buffer, reporting failure instead of aborting.
    fn allocate(&self, layer: usize) -> Result<RgbaImage> {
        let bytes = self
            .config
            .buffer_len()
            .ok_or(Error::ResourceExhausted {
                layer,
                bytes: usize::MAX,
            })?;

        let mut buffer: Vec<u8> = Vec::new();
        buffer
            .try_reserve_exact(bytes)
            .map_err(|_| Error::ResourceExhausted { layer, bytes })?;
        buffer.resize(bytes, 0);
        if self.config.background != [0; 4] {
            for pixel in buffer.chunks_exact_mut(4) {
                pixel.copy_from_slice(&self.config.background);
            }
        }

        RgbaImage::from_raw(self.config.width, self.config.height, buffer)
            .ok_or(Error::ResourceExhausted { layer, bytes })
    }
}

/// Iterator over the masks of a job, see [`LayerRasterizer::layers`].
///
/// Ends at the first index without polygons, after the last layer, or after
/// yielding an error.
pub struct Layers<'a> {
    rasterizer: &'a LayerRasterizer,
    models: &'a [Model],
    index: usize,
    layer_max: usize,
    done: bool,
}

impl Layers<'_> {
    /// Maximum layer count among the models.
    pub fn layer_max(&self) -> usize {
        self.layer_max
    }
}

impl Iterator for Layers<'_> {
    type Item = Result<LayerImage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.index >= self.layer_max {
            return None;
        }
        if let Err(e) = self.rasterizer.cancel.check() {
            self.done = true;
            return Some(Err(e));
        }

        match self.rasterizer.rasterize_layer(self.models, self.index) {
            Ok(Some(image)) => {
                self.index += 1;
                Some(Ok(image))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
