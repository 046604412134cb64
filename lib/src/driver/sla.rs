//! Driver for vat-photopolymerization (SLA/MSLA) printers.

use super::{Driver, ProgressFn};
use crate::export::{ExportSummary, LayerStreamExporter, OutputFormat};
use crate::pipeline::{CancelToken, ProgressRange, RefineConfig, RefineReport, RefinementPipeline};
use crate::preview::PreviewRenderer;
use crate::print::{PrintJob, PrintOutput};
use crate::raster::{LayerImage, LayerRasterizer};
use crate::slice::{SliceEngine, SlicingParams};
use crate::Result;
use log::info;

/// SLA driver: refine, rasterize each layer into a mask, stream the masks.
#[derive(Clone, Debug)]
pub struct SlaDriver {
    format: OutputFormat,
    slice_range: ProgressRange,
    refine_range: ProgressRange,
}

impl Default for SlaDriver {
    fn default() -> Self {
        Self {
            format: OutputFormat::Raw,
            slice_range: ProgressRange::SLICE,
            refine_range: ProgressRange::REFINE,
        }
    }
}

impl SlaDriver {
    pub const NAME: &'static str = "SLA";

    /// Builder: set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder: set how slicing and refinement split a model's progress.
    pub fn with_progress_split(mut self, slice: ProgressRange, refine: ProgressRange) -> Self {
        self.slice_range = slice;
        self.refine_range = refine;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn rasterizer(&self, job: &PrintJob, cancel: &CancelToken) -> LayerRasterizer {
        LayerRasterizer::new(job.raster.clone()).with_cancel(cancel.clone())
    }
}

impl Driver for SlaDriver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn slice(
        &self,
        job: &mut PrintJob,
        engine: &dyn SliceEngine,
        cancel: &CancelToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<RefineReport>> {
        job.reset_output();
        let params = SlicingParams::from_settings(&job.settings);
        let count = job.models.len();
        let mut reports = Vec::with_capacity(count);

        info!("Slicing {} models ({})", count, job.settings);

        for (k, model) in job.models.iter_mut().enumerate() {
            cancel.check()?;
            let window = ProgressRange::FULL.sub(k as f64 / count as f64, (k + 1) as f64 / count as f64);
            let slice_window = window.sub(self.slice_range.from, self.slice_range.to);
            let refine_window = window.sub(self.refine_range.from, self.refine_range.to);

            let layers = engine.slice_model(model, &params, &mut |f| {
                on_progress(slice_window.map(f), None)
            })?;
            model.set_slices(layers);

            let pipeline = RefinementPipeline::new(
                RefineConfig::from_settings(&job.settings).progress(refine_window),
            )
            .with_cancel(cancel.clone());
            reports.push(pipeline.run(model, |f, message| on_progress(f, message))?);
        }

        Ok(reports)
    }

    fn prepare(
        &self,
        job: &mut PrintJob,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<usize> {
        self.rasterizer(job, cancel).rasterize(job, on_progress)
    }

    fn export(
        &self,
        job: &mut PrintJob,
        on_layer: &mut dyn FnMut(LayerImage) -> Result<()>,
        on_complete: &mut dyn FnMut(ExportSummary),
    ) -> Result<ExportSummary> {
        LayerStreamExporter::new(self.format).export(job, on_layer, on_complete)
    }

    fn print(
        &self,
        job: &mut PrintJob,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(f64),
        on_layer: &mut dyn FnMut(LayerImage) -> Result<()>,
        on_complete: &mut dyn FnMut(ExportSummary),
    ) -> Result<ExportSummary> {
        job.reset_output();
        let rasterizer = self.rasterizer(job, cancel);
        let exporter = LayerStreamExporter::new(self.format);
        let layer_max = job.layer_max();

        let summary = exporter.stream(
            rasterizer.layers(&job.models),
            job.raster.width,
            job.raster.height,
            |layer| {
                on_progress(layer.index as f64 / layer_max as f64);
                on_layer(layer)
            },
            |_| {},
        )?;
        on_progress(1.0);
        on_complete(summary);

        job.output = Some(PrintOutput::Exported(summary));
        Ok(summary)
    }

    fn render(&self, job: &mut PrintJob) -> usize {
        PreviewRenderer::new().render(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{square_outline, JobFile, ModelSpec, RasterConfig, Settings};
    use crate::Error;

    fn job(models: usize, height: f64) -> PrintJob {
        let file = JobFile {
            settings: Settings::new().with_solid_layer_span(1),
            raster: RasterConfig::new().resolution(64, 32),
            models: (0..models)
                .map(|k| ModelSpec {
                    name: format!("block{k}"),
                    outline: square_outline([k as f64 * 8.0 - 8.0, 0.0], 4.0),
                    height,
                    ..Default::default()
                })
                .collect(),
        };
        let mut job = PrintJob::new(file.settings.clone()).with_raster(file.raster.clone());
        for model in file.build_models().unwrap() {
            job.add_model(model);
        }
        job
    }

    #[test]
    fn test_slice_progress_over_models() {
        let mut job = job(2, 0.15);
        let mut values = Vec::new();
        let reports = SlaDriver::default()
            .slice(&mut job, &crate::slice::PrismEngine, &CancelToken::new(), &mut |f, _| {
                values.push(f)
            })
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.contains(&0.5));
        assert_eq!(values.last().copied(), Some(1.0));
        assert_eq!(job.models[1].layer_count(), 3);
    }

    #[test]
    fn test_prepare_then_export() {
        let mut job = job(1, 0.15);
        let driver = SlaDriver::default();
        let cancel = CancelToken::new();
        driver
            .slice(&mut job, &crate::slice::PrismEngine, &cancel, &mut |_, _| {})
            .unwrap();
        assert_eq!(driver.prepare(&mut job, &cancel, &mut |_| {}).unwrap(), 3);

        let mut layers = 0;
        let mut summaries = Vec::new();
        let summary = driver
            .export(&mut job, &mut |_| {
                layers += 1;
                Ok(())
            }, &mut |s| summaries.push(s))
            .unwrap();
        assert_eq!(layers, 3);
        assert_eq!(summaries, vec![summary]);
        assert_eq!((summary.width, summary.height), (64, 32));
    }

    #[test]
    fn test_streaming_print() {
        let mut job = job(2, 0.1);
        let driver = SlaDriver::default();
        let cancel = CancelToken::new();
        driver
            .slice(&mut job, &crate::slice::PrismEngine, &cancel, &mut |_, _| {})
            .unwrap();

        let mut progress = Vec::new();
        let mut indices = Vec::new();
        let mut completions = 0;
        let summary = driver
            .print(
                &mut job,
                &cancel,
                &mut |f| progress.push(f),
                &mut |layer| {
                    indices.push(layer.index);
                    Ok(())
                },
                &mut |_| completions += 1,
            )
            .unwrap();

        assert_eq!(indices, vec![0, 1]);
        assert_eq!(summary.layers, 2);
        assert_eq!(completions, 1);
        assert_eq!(progress, vec![0.0, 0.5, 1.0]);
        assert!(job.images.is_empty());
        assert!(matches!(job.output, Some(PrintOutput::Exported(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let mut job = job(1, 0.05);
        let driver = SlaDriver::default().with_format(OutputFormat::Photon);
        let cancel = CancelToken::new();
        driver
            .slice(&mut job, &crate::slice::PrismEngine, &cancel, &mut |_, _| {})
            .unwrap();
        let result = driver.print(&mut job, &cancel, &mut |_| {}, &mut |_| Ok(()), &mut |_| {});
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_render_preview() {
        let mut job = job(1, 0.2);
        let driver = SlaDriver::default();
        driver
            .slice(&mut job, &crate::slice::PrismEngine, &CancelToken::new(), &mut |_, _| {})
            .unwrap();
        assert_eq!(driver.render(&mut job), 4);
        assert!(matches!(job.output, Some(PrintOutput::Preview(ref layers)) if layers.len() == 4));
    }
}
