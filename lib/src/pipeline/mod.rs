//! Pipeline module - refines the sliced layers of a model.
//!
//! Four stages run over every layer of a model, strictly in order, each one
//! finishing on all layers before the next starts:
//!
//! 1. **Shells** - one shell at zero inset, plus the fill area
//! 2. **Diff** - clean the shells and compare each layer with its neighbors
//!    to find flats (uncovered from above) and bridges (unsupported from below)
//! 3. **Project** - carry flats downward and bridges upward as solid regions
//!    across `solid_layer_span` layers
//! 4. **Solid** - turn the projected solids into the final solid fill
//!
//! A stage is a pure function of the layer stack as the previous stage left
//! it; its results are staged and written back once the stage is done on
//! every layer, so neighbor reads never see half-updated data.
//!
//! # Progress
//!
//! Each stage owns a slice of the pipeline's `[0, 1]` span (shells 0-0.2,
//! diff 0.2-0.4, project 0.4-0.5, solid 0.5-0.6), advancing linearly with the
//! layers completed. The pipeline span itself is mapped into the injected
//! [`ProgressRange`], by default the upper half `[0.5, 1.0]` of the job
//! because slicing occupies the lower half. After the last stage the range end
//! is reported.
//!
//! # Failures
//!
//! A stage failing on one layer degrades that layer (its derived geometry is
//! cleared and later stages skip it) and the model carries on. Every degraded
//! layer is logged, reported through the progress callback and listed in the
//! [`RefineReport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sla_slicer::pipeline::{RefineConfig, RefinementPipeline};
//!
//! let pipeline = RefinementPipeline::new(RefineConfig::from_settings(&settings));
//! let report = pipeline.run(&mut model, |fraction, message| {
//!     println!("{:5.1}% {}", fraction * 100.0, message.unwrap_or(""));
//! })?;
//! ```

use crate::clipper::{clean, union_ex};
use crate::config::Settings;
use crate::geometry::ExPolygons;
use crate::infill::{SolidFillConfig, SolidFillGenerator, SolidFillResult};
use crate::print::Model;
use crate::shell::{ShellConfig, ShellGenerator, ShellResult};
use crate::slice::{detect_surfaces, project_onto, LayerSlice, LayerSurfaces, SurfaceType};
use crate::{CoordF, Error, Result};
use log::{debug, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Regions smaller than this are degenerate (model units squared).
pub const AREA_EPSILON: CoordF = 1e-5;

/// Vertices closer than this are merged (model units).
pub const DISTANCE_EPSILON: CoordF = 5e-3;

/// A `[from, to]` window of a job's overall progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressRange {
    pub from: f64,
    pub to: f64,
}

impl ProgressRange {
    /// Window of the external slicer engine.
    pub const SLICE: ProgressRange = ProgressRange { from: 0.0, to: 0.5 };
    /// Window of the refinement pipeline.
    pub const REFINE: ProgressRange = ProgressRange { from: 0.5, to: 1.0 };
    /// The whole `[0, 1]` span.
    pub const FULL: ProgressRange = ProgressRange { from: 0.0, to: 1.0 };

    pub const fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Map a fraction of this window onto the outer scale.
    #[inline]
    pub fn map(&self, fraction: f64) -> f64 {
        self.from + fraction * (self.to - self.from)
    }

    /// Window `[from, to]` of this window, in outer scale.
    pub fn sub(&self, from: f64, to: f64) -> ProgressRange {
        ProgressRange::new(self.map(from), self.map(to))
    }
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self::REFINE
    }
}

/// Cooperative cancellation flag shared between a job and its owner.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return [`Error::Cancelled`] once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Refinement stages in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Shells,
    Diff,
    Project,
    Solid,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Shells, Stage::Diff, Stage::Project, Stage::Solid];

    /// Share of the pipeline span owned by this stage, proportional to its cost.
    pub fn span(&self) -> (f64, f64) {
        match self {
            Stage::Shells => (0.0, 0.2),
            Stage::Diff => (0.2, 0.4),
            Stage::Project => (0.4, 0.5),
            Stage::Solid => (0.5, 0.6),
        }
    }

    /// Progress message reported while the stage runs.
    pub fn message(&self) -> &'static str {
        match self {
            Stage::Shells => "slice",
            Stage::Diff => "delta",
            Stage::Project => "project",
            Stage::Solid => "solid",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Configuration for the refinement pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct RefineConfig {
    /// Stage 1 parameters.
    pub shell: ShellConfig,
    /// Area below which regions are dropped.
    pub area_epsilon: CoordF,
    /// Distance below which vertices are merged.
    pub distance_epsilon: CoordF,
    /// Number of layers flats and bridges are projected across.
    pub solid_layer_span: usize,
    /// Window of the job progress this pipeline reports into.
    pub progress: ProgressRange,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RefineConfig {
    /// Pipeline configuration for a job.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            shell: ShellConfig::default(),
            area_epsilon: AREA_EPSILON,
            distance_epsilon: DISTANCE_EPSILON,
            solid_layer_span: settings.solid_layer_span(),
            progress: ProgressRange::REFINE,
        }
    }

    /// Builder: set the projection span.
    pub fn solid_layer_span(mut self, span: usize) -> Self {
        self.solid_layer_span = span;
        self
    }

    /// Builder: set the progress window.
    pub fn progress(mut self, range: ProgressRange) -> Self {
        self.progress = range;
        self
    }
}

/// A layer whose derived geometry was dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct DegradedLayer {
    pub index: usize,
    pub stage: Stage,
    pub reason: String,
}

/// Summary of one refinement run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RefineReport {
    pub layers: usize,
    pub solid_layers: usize,
    pub degraded: Vec<DegradedLayer>,
}

impl RefineReport {
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Output of the diff stage for one layer.
struct DiffResult {
    shells: ExPolygons,
    surfaces: LayerSurfaces,
}

/// Output of the project stage for one layer.
struct Projection {
    solids: ExPolygons,
    supports: ExPolygons,
}

/// Runs the refinement stages over a model's layers.
#[derive(Clone, Debug, Default)]
pub struct RefinementPipeline {
    config: RefineConfig,
    cancel: CancelToken,
}

impl RefinementPipeline {
    pub fn new(config: RefineConfig) -> Self {
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

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// Refine every layer of a model in place.
    ///
    /// The callback receives `(fraction, message)` with non-decreasing
    /// fractions inside the configured progress window, the last one being
    /// the window end.
    pub fn run<F>(&self, model: &mut Model, on_progress: F) -> Result<RefineReport>
    where
        F: FnMut(f64, Option<&str>),
    {
        debug!(
            "Refining model '{}' ({} layers)",
            model.name,
            model.layer_count()
        );
        let report = self.run_layers(model.slices_mut(), on_progress)?;
        info!(
            "Model '{}': {} layers, {} solid, {} degraded",
            model.name,
            report.layers,
            report.solid_layers,
            report.degraded.len()
        );
        Ok(report)
    }

    /// Refine a stack of layers, bottom first.
    pub fn run_layers<F>(&self, layers: &mut [LayerSlice], mut on_progress: F) -> Result<RefineReport>
    where
        F: FnMut(f64, Option<&str>),
    {
        let mut report = RefineReport {
            layers: layers.len(),
            ..Default::default()
        };

        for layer in layers.iter_mut() {
            layer.invalidate();
        }

        // Stage 1: shells
        let shells = ShellGenerator::new(self.config.shell.clone());
        self.run_stage(
            Stage::Shells,
            layers,
            &mut report,
            &mut on_progress,
            |layers, i| shells.generate(layers[i].boundary()),
            |layer, result: ShellResult| {
                layer.shells = result.outer().to_vec();
                layer.fill_area = result.fill_area;
            },
        )?;

        // Stage 2: boolean correction against the neighbors
        let (area_eps, dist_eps) = (self.config.area_epsilon, self.config.distance_epsilon);
        self.run_stage(
            Stage::Diff,
            layers,
            &mut report,
            &mut on_progress,
            |layers, i| {
                let current = &layers[i].shells;
                let cleaned = clean(current, area_eps, dist_eps);
                if cleaned.is_empty() && !current.is_empty() {
                    return Err(Error::Geometry("shells vanished after cleaning".into()));
                }
                let lower = i.checked_sub(1).map(|below| &layers[below].shells);
                let upper = layers.get(i + 1).map(|above| &above.shells);
                let surfaces = detect_surfaces(&cleaned, lower, upper, area_eps, dist_eps);
                Ok(DiffResult {
                    shells: cleaned,
                    surfaces,
                })
            },
            |layer, result: DiffResult| {
                layer.shells = result.shells;
                layer.flats = result.surfaces.flats;
                layer.bridges = result.surfaces.bridges;
            },
        )?;

        // Stage 3: project flats down and bridges up
        let span = self.config.solid_layer_span;
        self.run_stage(
            Stage::Project,
            layers,
            &mut report,
            &mut on_progress,
            |layers, i| {
                let target = &layers[i].fill_area;
                let count = layers.len();
                let gather = |kind: SurfaceType| -> ExPolygons {
                    let sources: ExPolygons = layers[kind.projection_sources(i, span, count)]
                        .iter()
                        .flat_map(|source| match kind {
                            SurfaceType::Flat => source.flats.iter(),
                            SurfaceType::Bridge => source.bridges.iter(),
                        })
                        .cloned()
                        .collect();
                    if sources.is_empty() {
                        return Vec::new();
                    }
                    project_onto(&union_ex(&sources), target)
                };

                let supports = gather(SurfaceType::Bridge);
                let mut solids = gather(SurfaceType::Flat);
                solids.extend(supports.iter().cloned());
                Ok(Projection { solids, supports })
            },
            |layer, projection: Projection| {
                layer.solids = projection.solids;
                layer.supports = projection.supports;
            },
        )?;

        // Stage 4: solid fill
        let solid_fill = SolidFillGenerator::new(SolidFillConfig {
            area_epsilon: area_eps,
        });
        self.run_stage(
            Stage::Solid,
            layers,
            &mut report,
            &mut on_progress,
            |layers, i| -> Result<SolidFillResult> {
                let layer = &layers[i];
                Ok(solid_fill.generate(&layer.solids, &layer.fill_area))
            },
            |layer, result: SolidFillResult| {
                layer.solid_fill = result.regions;
                layer.is_solid_fill = result.is_solid;
            },
        )?;

        report.solid_layers = layers.iter().filter(|layer| layer.is_solid_fill).count();
        on_progress(self.config.progress.to, None);
        Ok(report)
    }

    /// Run one stage over all layers.
    ///
    /// `compute` sees the whole stack as the previous stage left it; results
    /// are written back with `apply` once every layer is done. Degraded layers
    /// are skipped.
    fn run_stage<T, F, C, A>(
        &self,
        stage: Stage,
        layers: &mut [LayerSlice],
        report: &mut RefineReport,
        on_progress: &mut F,
        compute: C,
        apply: A,
    ) -> Result<()>
    where
        F: FnMut(f64, Option<&str>),
        C: Fn(&[LayerSlice], usize) -> Result<T>,
        A: Fn(&mut LayerSlice, T),
    {
        let count = layers.len();
        let (from, to) = stage.span();
        let window = self.config.progress.sub(from, to);
        let mut staged: Vec<Option<T>> = Vec::with_capacity(count);
        let mut failed = Vec::new();

        debug!("Stage {}: {} layers", stage, count);

        for i in 0..count {
            self.cancel.check()?;

            let fraction = window.map((i + 1) as f64 / count as f64);
            if layers[i].is_degraded() {
                staged.push(None);
            } else {
                match compute(layers, i) {
                    Ok(value) => staged.push(Some(value)),
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(e) => {
                        let reason = e.to_string();
                        warn!("Layer {} degraded in stage {}: {}", i, stage, reason);
                        on_progress(
                            fraction,
                            Some(format!("layer {i} degraded in {stage}: {reason}").as_str()),
                        );
                        failed.push(DegradedLayer {
                            index: i,
                            stage,
                            reason,
                        });
                        staged.push(None);
                    }
                }
            }
            on_progress(fraction, Some(stage.message()));
        }

        for (layer, value) in layers.iter_mut().zip(staged) {
            if let Some(value) = value {
                apply(layer, value);
            }
        }
        for degraded in &failed {
            layers[degraded.index].degrade();
        }
        report.degraded.extend(failed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::total_area;
    use crate::geometry::{ExPolygon, Point, Polygon};

    fn square_stack(count: usize, size: f64) -> Vec<LayerSlice> {
        (0..count)
            .map(|i| {
                let h = size / 2.0;
                LayerSlice::new(
                    i,
                    i as f64 * 0.05,
                    vec![ExPolygon::rectangle_mm(-h, -h, h, h)],
                )
            })
            .collect()
    }

    fn pipeline(span: usize) -> RefinementPipeline {
        RefinementPipeline::new(RefineConfig::default().solid_layer_span(span))
    }

    #[test]
    fn test_progress_range_mapping() {
        let range = ProgressRange::REFINE;
        // 0.5 + (from + f * (to - from)) * 0.5
        let window = range.sub(0.2, 0.4);
        assert!((window.map(0.5) - (0.5 + (0.2 + 0.5 * 0.2) * 0.5)).abs() < 1e-12);
        assert!((range.map(1.0) - 1.0).abs() < 1e-12);
        assert_eq!(ProgressRange::default(), ProgressRange::REFINE);
    }

    #[test]
    fn test_progress_values() {
        let mut layers = square_stack(2, 10.0);
        let mut reported = Vec::new();
        pipeline(1)
            .run_layers(&mut layers, |f, msg| {
                reported.push((f, msg.map(str::to_string)))
            })
            .unwrap();

        let expected: Vec<f64> = Stage::ALL
            .iter()
            .flat_map(|stage| {
                let (from, to) = stage.span();
                [0.5, 1.0].map(move |f| 0.5 + (from + f * (to - from)) * 0.5)
            })
            .chain(std::iter::once(1.0))
            .collect();
        let values: Vec<f64> = reported.iter().map(|(f, _)| *f).collect();
        assert_eq!(values.len(), expected.len());
        for (got, want) in values.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
        assert_eq!(reported[0].1.as_deref(), Some("slice"));
        assert_eq!(reported[2].1.as_deref(), Some("delta"));
        assert_eq!(reported.last().map(|(f, _)| *f), Some(1.0));
    }

    #[test]
    fn test_progress_monotonic_in_range() {
        let mut layers = square_stack(7, 10.0);
        let mut values = Vec::new();
        pipeline(5)
            .run_layers(&mut layers, |f, _| values.push(f))
            .unwrap();

        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|f| (0.5..=1.0).contains(f)));
        assert_eq!(values.last().copied(), Some(1.0));
    }

    #[test]
    fn test_injected_range() {
        let mut layers = square_stack(3, 10.0);
        let mut values = Vec::new();
        let config = RefineConfig::default().progress(ProgressRange::FULL);
        RefinementPipeline::new(config)
            .run_layers(&mut layers, |f, _| values.push(f))
            .unwrap();
        assert!((values[0] - 0.2 / 3.0).abs() < 1e-12);
        assert_eq!(values.last().copied(), Some(1.0));
    }

    #[test]
    fn test_boundary_untouched() {
        let mut layers = square_stack(4, 10.0);
        let before: Vec<ExPolygons> = layers.iter().map(|l| l.boundary().clone()).collect();
        pipeline(2).run_layers(&mut layers, |_, _| {}).unwrap();
        let after: Vec<ExPolygons> = layers.iter().map(|l| l.boundary().clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_top_flats_project_down() {
        let mut layers = square_stack(6, 10.0);
        let report = pipeline(2).run_layers(&mut layers, |_, _| {}).unwrap();

        // Top layer and the one below it are solid, the rest shelled
        let solid: Vec<bool> = layers.iter().map(|l| l.is_solid_fill).collect();
        assert_eq!(solid, vec![false, false, false, false, true, true]);
        assert_eq!(report.solid_layers, 2);
        assert!((total_area(&layers[5].flats) - 100.0).abs() < 1e-3);
        assert!(layers[4].flats.is_empty());
        assert!(layers.iter().all(|l| l.bridges.is_empty()));
        assert!((total_area(&layers[4].solid_fill) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_overhang_bridges_project_up() {
        // Two narrow layers carrying six wide ones
        let mut layers: Vec<LayerSlice> = (0..8)
            .map(|i| {
                let region = if i < 2 {
                    ExPolygon::rectangle_mm(0.0, 0.0, 4.0, 10.0)
                } else {
                    ExPolygon::rectangle_mm(0.0, 0.0, 10.0, 10.0)
                };
                LayerSlice::new(i, i as f64 * 0.05, vec![region])
            })
            .collect();
        pipeline(2).run_layers(&mut layers, |_, _| {}).unwrap();

        assert!((total_area(&layers[2].bridges) - 60.0).abs() < 1e-3);
        assert!((total_area(&layers[2].supports) - 60.0).abs() < 1e-3);
        assert!((total_area(&layers[3].supports) - 60.0).abs() < 1e-3);
        assert!(layers[4].supports.is_empty());
        assert!(!layers[2].is_solid_fill);
        assert!((total_area(&layers[3].solid_fill) - 60.0).abs() < 1e-3);
        assert!(layers[4].solid_fill.is_empty());
    }

    #[test]
    fn test_degenerate_layer_degrades() {
        let mut layers = square_stack(3, 10.0);
        let sliver = ExPolygon::new(Polygon::from_points(vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(1.0, 1.0),
        ]));
        layers[1] = LayerSlice::new(1, 0.05, vec![sliver]);

        let mut messages = Vec::new();
        let report = pipeline(1)
            .run_layers(&mut layers, |_, msg| {
                if let Some(msg) = msg {
                    messages.push(msg.to_string());
                }
            })
            .unwrap();

        assert_eq!(report.degraded.len(), 1);
        assert_eq!(report.degraded[0].index, 1);
        assert_eq!(report.degraded[0].stage, Stage::Shells);
        assert!(layers[1].is_degraded());
        assert!(layers[1].shells.is_empty());
        assert!(layers[1].solid_fill.is_empty());
        assert!(messages.iter().any(|m| m.starts_with("layer 1 degraded")));

        // Neighbors still refined
        assert!(!layers[0].shells.is_empty());
        assert!(layers[2].is_solid_fill);
    }

    #[test]
    fn test_rerun_recomputes() {
        let mut layers = square_stack(3, 10.0);
        let pipeline = pipeline(1);
        pipeline.run_layers(&mut layers, |_, _| {}).unwrap();
        let first: Vec<bool> = layers.iter().map(|l| l.is_solid_fill).collect();
        pipeline.run_layers(&mut layers, |_, _| {}).unwrap();
        let second: Vec<bool> = layers.iter().map(|l| l.is_solid_fill).collect();
        assert_eq!(first, second);
        assert_eq!(layers[2].solid_fill.len(), 1);
    }

    #[test]
    fn test_cancel() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut layers = square_stack(3, 10.0);
        let result = pipeline(1)
            .with_cancel(cancel)
            .run_layers(&mut layers, |_, _| {});
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_empty_model() {
        let mut values = Vec::new();
        let report = pipeline(5).run_layers(&mut [], |f, _| values.push(f)).unwrap();
        assert_eq!(report.layers, 0);
        assert_eq!(values, vec![1.0]);
    }
}
