//! Polygon with holes.

use super::{Point, Polygon};
use crate::{CoordF, SCALING_FACTOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A region bounded by an outer contour with zero or more holes.
///
/// Construction normalizes orientation: the contour is counter-clockwise and
/// every hole is clockwise, so non-zero filling cuts the holes out.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    pub contour: Polygon,
    pub holes: Vec<Polygon>,
}

impl ExPolygon {
    /// Create an ExPolygon without holes.
    pub fn new(contour: Polygon) -> Self {
        Self::with_holes(contour, Vec::new())
    }

    /// Create an ExPolygon with holes.
    pub fn with_holes(mut contour: Polygon, mut holes: Vec<Polygon>) -> Self {
        contour.make_counter_clockwise();
        for hole in &mut holes {
            hole.make_clockwise();
        }
        Self { contour, holes }
    }

    /// Axis-aligned rectangle in model units.
    pub fn rectangle_mm(x0: CoordF, y0: CoordF, x1: CoordF, y1: CoordF) -> Self {
        Self::new(Polygon::rectangle(
            Point::new_scale(x0, y0),
            Point::new_scale(x1, y1),
        ))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    /// Net area (contour minus holes) in scaled units squared.
    pub fn area(&self) -> CoordF {
        self.contour.area().abs() - self.holes.iter().map(|h| h.area().abs()).sum::<CoordF>()
    }

    /// Net area in model units squared.
    #[inline]
    pub fn area_unscaled(&self) -> CoordF {
        self.area() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    /// All rings, contour first.
    pub fn rings(&self) -> impl Iterator<Item = &Polygon> {
        std::iter::once(&self.contour).chain(self.holes.iter())
    }

    /// Translate contour and holes by a scaled offset.
    pub fn translate(&mut self, dx: crate::Coord, dy: crate::Coord) {
        self.contour.translate(dx, dy);
        for hole in &mut self.holes {
            hole.translate(dx, dy);
        }
    }
}

impl From<Polygon> for ExPolygon {
    fn from(polygon: Polygon) -> Self {
        ExPolygon::new(polygon)
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon({} points, {} holes, area={:.4})",
            self.contour.len(),
            self.holes.len(),
            self.area_unscaled()
        )
    }
}

/// Type alias for a collection of ExPolygons.
pub type ExPolygons = Vec<ExPolygon>;

/// Total net area of a set of regions in model units squared.
pub fn total_area_unscaled(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(ExPolygon::area_unscaled).sum()
}
