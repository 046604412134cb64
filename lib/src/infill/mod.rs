//! Solid fill synthesis module.
//!
//! Resin layers are cured as a whole, so there is no infill pattern to
//! generate: a region is either solid or left to the shells. This module
//! decides which part of a layer's fill area is solid.
//!
//! # Algorithm
//!
//! 1. Merge the solid regions projected onto the layer
//! 2. Clip them to the layer's fill area
//! 3. Drop regions not larger than the area epsilon
//! 4. If what remains of the fill area is itself below the epsilon, the
//!    whole layer is solid and its fill area becomes the solid fill

use crate::clipper::{difference, intersection, remove_small, total_area, union_ex};
use crate::geometry::{ExPolygon, ExPolygons};
use crate::CoordF;

/// Default area below which a region counts as degenerate (model units squared).
pub const DEFAULT_AREA_EPSILON: CoordF = 1e-5;

/// Configuration for solid fill synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidFillConfig {
    pub area_epsilon: CoordF,
}

impl Default for SolidFillConfig {
    fn default() -> Self {
        Self {
            area_epsilon: DEFAULT_AREA_EPSILON,
        }
    }
}

/// Solid fill of one layer.
#[derive(Debug, Clone, Default)]
pub struct SolidFillResult {
    pub regions: ExPolygons,
    /// The solid regions cover the whole fill area.
    pub is_solid: bool,
}

impl SolidFillResult {
    pub fn area(&self) -> CoordF {
        total_area(&self.regions)
    }
}

/// Solid fill generator.
#[derive(Debug, Clone, Default)]
pub struct SolidFillGenerator {
    config: SolidFillConfig,
}

impl SolidFillGenerator {
    pub fn new(config: SolidFillConfig) -> Self {
        Self { config }
    }

    /// Compute the solid fill of a layer from its projected solids and fill area.
    pub fn generate(&self, solids: &[ExPolygon], fill_area: &[ExPolygon]) -> SolidFillResult {
        if fill_area.is_empty() || solids.is_empty() {
            return SolidFillResult::default();
        }

        let eps = self.config.area_epsilon;
        let regions = remove_small(&intersection(&union_ex(solids), fill_area), eps);
        if regions.is_empty() {
            return SolidFillResult::default();
        }

        let uncovered = difference(fill_area, &regions);
        if total_area(&uncovered) <= eps {
            return SolidFillResult {
                regions: fill_area.to_vec(),
                is_solid: true,
            };
        }

        SolidFillResult {
            regions,
            is_solid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> ExPolygons {
        vec![ExPolygon::rectangle_mm(x0, y0, x1, y1)]
    }

    #[test]
    fn test_full_cover_is_solid() {
        let fill = rect(0.0, 0.0, 10.0, 10.0);
        let result = SolidFillGenerator::default().generate(&rect(-1.0, -1.0, 11.0, 11.0), &fill);
        assert!(result.is_solid);
        assert!((result.area() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_partial_cover() {
        let fill = rect(0.0, 0.0, 10.0, 10.0);
        let result = SolidFillGenerator::default().generate(&rect(0.0, 0.0, 4.0, 10.0), &fill);
        assert!(!result.is_solid);
        assert!((result.area() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_overlapping_solids_merge() {
        let fill = rect(0.0, 0.0, 10.0, 10.0);
        let mut solids = rect(0.0, 0.0, 6.0, 10.0);
        solids.extend(rect(4.0, 0.0, 10.0, 10.0));
        let result = SolidFillGenerator::default().generate(&solids, &fill);
        assert!(result.is_solid);
        assert_eq!(result.regions.len(), 1);
    }

    #[test]
    fn test_no_solids() {
        let result = SolidFillGenerator::default().generate(&[], &rect(0.0, 0.0, 1.0, 1.0));
        assert!(!result.is_solid);
        assert!(result.regions.is_empty());

        // Slivers below the epsilon vanish
        let result = SolidFillGenerator::default()
            .generate(&rect(0.0, 0.0, 1e-4, 1e-4), &rect(0.0, 0.0, 1.0, 1.0));
        assert!(result.regions.is_empty());
    }
}
