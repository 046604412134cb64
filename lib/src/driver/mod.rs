//! Device drivers.
//!
//! A [`Driver`] knows how to take a job for one kind of printer from models to
//! device output: slice and refine, rasterize, export, and build the preview.
//! Hosts construct a [`DriverRegistry`] at startup and register the drivers
//! they ship; nothing is registered implicitly.

mod sla;

pub use sla::SlaDriver;

use crate::export::ExportSummary;
use crate::pipeline::{CancelToken, RefineReport};
use crate::print::PrintJob;
use crate::raster::LayerImage;
use crate::slice::SliceEngine;
use crate::{Error, Result};
use log::info;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Progress sink: `(fraction, message)`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f64, Option<&str>);

/// Printer driver contract.
pub trait Driver: Send + Sync {
    /// Registry name, e.g. `"SLA"`.
    fn name(&self) -> &str;

    /// Slice every model with `engine` and refine the layers.
    ///
    /// Progress covers the whole job `[0, 1]`; per model, slicing and
    /// refinement share that model's window.
    fn slice(
        &self,
        job: &mut PrintJob,
        engine: &dyn SliceEngine,
        cancel: &CancelToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<RefineReport>>;

    /// Rasterize the job into `job.images`. Returns the image count.
    fn prepare(
        &self,
        job: &mut PrintJob,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<usize>;

    /// Emit `job.images`, then the completion summary.
    fn export(
        &self,
        job: &mut PrintJob,
        on_layer: &mut dyn FnMut(LayerImage) -> Result<()>,
        on_complete: &mut dyn FnMut(ExportSummary),
    ) -> Result<ExportSummary>;

    /// Rasterize and export in one pass.
    ///
    /// The default runs [`prepare`](Driver::prepare) then
    /// [`export`](Driver::export); drivers that can produce layers lazily
    /// should hold only the layers the consumer has not taken yet.
    fn print(
        &self,
        job: &mut PrintJob,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(f64),
        on_layer: &mut dyn FnMut(LayerImage) -> Result<()>,
        on_complete: &mut dyn FnMut(ExportSummary),
    ) -> Result<ExportSummary> {
        self.prepare(job, cancel, on_progress)?;
        self.export(job, on_layer, on_complete)
    }

    /// Build the layer preview as the job output. Returns the layer count.
    fn render(&self, job: &mut PrintJob) -> usize;
}

/// Drivers available to a host, keyed by case-insensitive name.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the drivers shipped with this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SlaDriver::default()));
        registry
    }

    /// Register a driver, replacing and returning any driver of the same name.
    pub fn register(&mut self, driver: Arc<dyn Driver>) -> Option<Arc<dyn Driver>> {
        let key = driver.name().to_ascii_uppercase();
        let previous = self.drivers.insert(key, driver);
        if let Some(previous) = &previous {
            info!("Replaced driver {}", previous.name());
        }
        previous
    }

    /// Look up a driver by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .get(&name.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| Error::Config(format!("no driver registered as '{name}'")))
    }

    /// Registered driver names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.values().map(|d| d.name().to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
