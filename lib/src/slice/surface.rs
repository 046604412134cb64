//! Flat and bridge surfaces between neighboring layers.
//!
//! Surfaces are detected by comparing a layer with the layers next to it:
//!
//! - **Flat**: area of the current layer not covered by the layer above
//! - **Bridge**: area of the current layer not supported by the layer below
//!
//! Both are then projected into neighboring layers as solid regions so caps
//! and overhangs cure as solid material instead of a thin shell.

use crate::clipper::{clean, difference, intersection};
use crate::geometry::ExPolygons;
use crate::CoordF;
use std::fmt;
use std::ops::Range;

/// Classification of a detected surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceType {
    /// Exposed upward (nothing above).
    Flat,
    /// Exposed downward (nothing below).
    Bridge,
}

impl SurfaceType {
    /// Layers whose surfaces of this type project onto layer `index`.
    ///
    /// Flats project downward and bridges upward, each across `span` layers
    /// including the layer they were found on. So a layer collects flats from
    /// itself and the `span - 1` layers above, and bridges from itself and the
    /// `span - 1` layers below.
    pub fn projection_sources(&self, index: usize, span: usize, layer_count: usize) -> Range<usize> {
        if span == 0 || index >= layer_count {
            return index..index;
        }
        match self {
            SurfaceType::Flat => index..(index + span).min(layer_count),
            SurfaceType::Bridge => (index + 1).saturating_sub(span)..index + 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Flat => "flat",
            SurfaceType::Bridge => "bridge",
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Surfaces detected on one layer.
#[derive(Clone, Debug, Default)]
pub struct LayerSurfaces {
    pub flats: ExPolygons,
    pub bridges: ExPolygons,
}

/// Detect flat and bridge surfaces for a layer.
///
/// * `current` - regions of the current layer
/// * `lower` - regions of the layer below, `None` for the first layer (which
///   rests on the build plate and never bridges)
/// * `upper` - regions of the layer above, `None` for the last layer (whose
///   whole area is a flat)
///
/// Results are cleaned with the given epsilons (model units).
pub fn detect_surfaces(
    current: &ExPolygons,
    lower: Option<&ExPolygons>,
    upper: Option<&ExPolygons>,
    area_epsilon: CoordF,
    distance_epsilon: CoordF,
) -> LayerSurfaces {
    if current.is_empty() {
        return LayerSurfaces::default();
    }

    let flats = match upper {
        Some(upper) => difference(current, upper),
        None => current.clone(),
    };

    let bridges = match lower {
        Some(lower) => difference(current, lower),
        None => Vec::new(),
    };

    LayerSurfaces {
        flats: clean(&flats, area_epsilon, distance_epsilon),
        bridges: clean(&bridges, area_epsilon, distance_epsilon),
    }
}

/// Clip projected surfaces to the area of the target layer.
pub fn project_onto(surfaces: &ExPolygons, target_area: &ExPolygons) -> ExPolygons {
    intersection(surfaces, target_area)
}
