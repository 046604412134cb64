//! One horizontal cross-section of one model.

use crate::geometry::ExPolygons;
use crate::CoordF;

/// Layer `index` of a model, cut at height `z`.
///
/// The boundary regions come from slicing and cannot be changed afterwards.
/// Every other field is derived by the refinement pipeline: each pass
/// invalidates them first and recomputes them from the boundary and the
/// neighboring layers.
#[derive(Clone, Debug, Default)]
pub struct LayerSlice {
    index: usize,
    z: CoordF,
    boundary: ExPolygons,

    /// Shell regions (stage 1, cleaned in stage 2).
    pub shells: ExPolygons,
    /// Area enclosed by the innermost shell (stage 1).
    pub fill_area: ExPolygons,
    /// Regions not covered by the layer above (stage 2).
    pub flats: ExPolygons,
    /// Regions not supported by the layer below (stage 2).
    pub bridges: ExPolygons,
    /// Solid regions projected onto this layer from flats and bridges (stage 3).
    pub solids: ExPolygons,
    /// Part of `solids` projected upward from bridges below (stage 3).
    pub supports: ExPolygons,
    /// Final solid fill regions (stage 4).
    pub solid_fill: ExPolygons,
    /// The whole fill area is solid (stage 4).
    pub is_solid_fill: bool,

    degraded: bool,
}

impl LayerSlice {
    /// Create a layer from its sliced boundary regions.
    pub fn new(index: usize, z: CoordF, boundary: ExPolygons) -> Self {
        Self {
            index,
            z,
            boundary,
            ..Default::default()
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cutting height.
    #[inline]
    pub fn z(&self) -> CoordF {
        self.z
    }

    /// The sliced cross-section.
    #[inline]
    pub fn boundary(&self) -> &ExPolygons {
        &self.boundary
    }

    /// Number of boundary polygons drawn for this layer.
    #[inline]
    pub fn polygon_count(&self) -> usize {
        self.boundary.len()
    }

    /// Check if slicing produced no geometry at this height.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boundary.is_empty()
    }

    /// Clear every derived field ahead of a refinement pass.
    pub fn invalidate(&mut self) {
        self.shells.clear();
        self.fill_area.clear();
        self.flats.clear();
        self.bridges.clear();
        self.solids.clear();
        self.supports.clear();
        self.solid_fill.clear();
        self.is_solid_fill = false;
        self.degraded = false;
    }

    /// Drop all derived geometry after a stage failed on this layer.
    /// Later stages leave a degraded layer empty.
    pub fn degrade(&mut self) {
        self.invalidate();
        self.degraded = true;
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ExPolygon;

    #[test]
    fn test_invalidate_keeps_boundary() {
        let square = ExPolygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let mut layer = LayerSlice::new(3, 0.15, vec![square.clone()]);
        layer.shells = vec![square.clone()];
        layer.solid_fill = vec![square.clone()];
        layer.is_solid_fill = true;

        layer.invalidate();
        assert!(layer.shells.is_empty());
        assert!(layer.solid_fill.is_empty());
        assert!(!layer.is_solid_fill);
        assert_eq!(layer.boundary(), &vec![square]);
        assert_eq!(layer.index(), 3);
        assert!((layer.z() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_degrade() {
        let mut layer = LayerSlice::new(0, 0.0, vec![ExPolygon::rectangle_mm(0.0, 0.0, 1.0, 1.0)]);
        layer.flats = layer.boundary().clone();
        layer.degrade();
        assert!(layer.is_degraded());
        assert!(layer.flats.is_empty());

        layer.invalidate();
        assert!(!layer.is_degraded());
    }
}
