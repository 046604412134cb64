//! Closed polygon type.

use super::{Point, PointF};
use crate::{Coord, CoordF, SCALING_FACTOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed polygon. The closing edge from the last point back to the first
/// is implicit and the first point is not repeated.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a new empty polygon.
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from a vector of points.
    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Create a polygon from unscaled model-space points.
    pub fn from_points_f(points: &[PointF]) -> Self {
        Self::from_points(points.iter().map(PointF::to_scaled).collect())
    }

    /// Axis-aligned rectangle spanning `min` to `max` (counter-clockwise).
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Get the points of this polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A polygon needs at least three vertices to enclose any area.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
    }

    /// Signed area in scaled units squared (positive when counter-clockwise).
    pub fn area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut twice: i128 = 0;
        let n = self.points.len();
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            twice += p.x as i128 * q.y as i128 - q.x as i128 * p.y as i128;
        }
        twice as CoordF / 2.0
    }

    /// Unsigned area in model units squared.
    #[inline]
    pub fn area_unscaled(&self) -> CoordF {
        self.area().abs() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.area() > 0.0
    }

    /// Reverse the winding order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Orient counter-clockwise. Returns true if the polygon was reversed.
    pub fn make_counter_clockwise(&mut self) -> bool {
        if self.area() < 0.0 {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Orient clockwise. Returns true if the polygon was reversed.
    pub fn make_clockwise(&mut self) -> bool {
        if self.area() > 0.0 {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Translate all points by a scaled offset.
    pub fn translate(&mut self, dx: Coord, dy: Coord) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// Iterate the points as unscaled model-space coordinates.
    pub fn points_f(&self) -> impl Iterator<Item = PointF> + '_ {
        self.points.iter().map(Point::to_f)
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

/// Type alias for a collection of polygons.
pub type Polygons = Vec<Polygon>;
