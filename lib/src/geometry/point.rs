//! Point types.
//!
//! [`Point`] holds scaled integer coordinates and is what polygons store.
//! [`PointF`] holds unscaled model-space coordinates and is used at the
//! edges of the library (rasterization, preview, job files).

use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A 2D point with scaled integer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    /// Create a new point from scaled coordinates.
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a point from unscaled (model unit) coordinates.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self::new(scale(x), scale(y))
    }

    /// Squared distance to another point, in scaled units.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        dx * dx + dy * dy
    }

    /// Convert to an unscaled floating-point point.
    #[inline]
    pub fn to_f(&self) -> PointF {
        PointF::new(unscale(self.x), unscale(self.y))
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", unscale(self.x), unscale(self.y))
    }
}

/// A 2D point with unscaled floating-point coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: CoordF,
    pub y: CoordF,
}

impl PointF {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    /// Scale into an integer point.
    #[inline]
    pub fn to_scaled(&self) -> Point {
        Point::new_scale(self.x, self.y)
    }
}

impl From<[CoordF; 2]> for PointF {
    fn from(p: [CoordF; 2]) -> Self {
        PointF::new(p[0], p[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_scaling_round_trip() {
        let p = Point::new_scale(1.5, -2.25);
        assert_eq!(p, Point::new(1_500_000, -2_250_000));

        let f = p.to_f();
        assert!((f.x - 1.5).abs() < 1e-12);
        assert!((f.y + 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_point_ops() {
        let a = Point::new(10, 20);
        let b = Point::new(3, 4);
        assert_eq!(a - b, Point::new(7, 16));
        assert_eq!(a + b, Point::new(13, 24));
        assert_eq!(Point::new(0, 0).distance_squared(&Point::new(3, 4)), 25);
    }
}
