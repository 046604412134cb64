//! Clipper polygon boolean operations module.
//!
//! This module provides polygon boolean operations (union, intersection, difference)
//! and offset operations using the geo-clipper library.
//!
//! These operations back every refinement stage:
//! - Shell insets
//! - Flat/bridge detection between neighboring layers
//! - Solid projection and solid fill clipping

use crate::geometry::{simplify, ExPolygon, ExPolygons, Point, Polygon};
use crate::{unscale, CoordF, SCALING_FACTOR};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Precision factor handed to clipper: model units are snapped to 1e-5.
const CLIPPER_PRECISION: f64 = 100_000.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners
    Round,
    /// Mitered corners
    #[default]
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25),
            OffsetJoinType::Miter => JoinType::Miter(2.0),
        }
    }
}

fn ring_to_geo(poly: &Polygon) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();

    // Close the ring if needed
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last()) {
        if first != *last {
            ring.push(first);
        }
    }

    LineString::new(ring)
}

/// Convert our ExPolygon to geo's Polygon type (with holes).
fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    GeoPolygon::new(
        ring_to_geo(&expoly.contour),
        expoly.holes.iter().map(ring_to_geo).collect(),
    )
}

fn geo_to_ring(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(crate::scale(c.x), crate::scale(c.y)))
        .collect();

    // Our Polygon doesn't store the closing point
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    Polygon::from_points(points)
}

/// Convert geo's Polygon to our ExPolygon type (with holes).
fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>) -> ExPolygon {
    ExPolygon::with_holes(
        geo_to_ring(geo_poly.exterior()),
        geo_poly.interiors().iter().map(geo_to_ring).collect(),
    )
}

fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi
        .0
        .iter()
        .map(geo_to_expolygon)
        .filter(|expoly| expoly.contour.is_valid())
        .collect()
}

fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

// ============================================================================
// Boolean Operations
// ============================================================================

/// Compute the union of two sets of polygons.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return union_ex(clip);
    }
    if clip.is_empty() {
        return union_ex(subject);
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.union(&clip_geo, CLIPPER_PRECISION);
    geo_multi_to_expolygons(&result)
}

/// Merge a single set of potentially overlapping or self-intersecting
/// polygons into disjoint regions.
pub fn union_ex(polygons: &[ExPolygon]) -> ExPolygons {
    if polygons.is_empty() {
        return vec![];
    }

    let subject = expolygons_to_geo_multi(polygons);
    let result = subject.union(&MultiPolygon::new(Vec::new()), CLIPPER_PRECISION);
    geo_multi_to_expolygons(&result)
}

/// Compute the intersection of two sets of polygons.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.intersection(&clip_geo, CLIPPER_PRECISION);
    geo_multi_to_expolygons(&result)
}

/// Compute the difference of two sets of polygons (subject - clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.difference(&clip_geo, CLIPPER_PRECISION);
    geo_multi_to_expolygons(&result)
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset multiple ExPolygons by a given distance.
///
/// Positive delta inflates (grows) the polygons, negative delta deflates (shrinks) them.
pub fn offset_expolygons(
    expolygons: &[ExPolygon],
    delta: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }

    let geo_multi = expolygons_to_geo_multi(expolygons);
    let result = geo_multi.offset(delta, join_type.into(), EndType::ClosedPolygon, CLIPPER_PRECISION);
    geo_multi_to_expolygons(&result)
}

/// Shrink (inset) ExPolygons by a given distance.
///
/// A zero distance still normalizes the input through a union.
pub fn shrink(expolygons: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    if distance.abs() <= 0.0 {
        return union_ex(expolygons);
    }
    offset_expolygons(expolygons, -distance.abs(), join_type)
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Remove regions whose net area is not above `min_area` model units squared.
pub fn remove_small(expolygons: &[ExPolygon], min_area: CoordF) -> ExPolygons {
    let min_scaled = min_area * SCALING_FACTOR * SCALING_FACTOR;
    expolygons
        .iter()
        .filter(|expoly| expoly.area() > min_scaled)
        .cloned()
        .collect()
}

/// Remove slicing artifacts from a set of regions.
///
/// Vertices closer than `distance_epsilon` are merged, self-intersections and
/// overlaps are resolved by a union, and regions not larger than
/// `area_epsilon` are dropped. Both epsilons are in model units.
pub fn clean(expolygons: &[ExPolygon], area_epsilon: CoordF, distance_epsilon: CoordF) -> ExPolygons {
    let merged: ExPolygons = expolygons
        .iter()
        .map(|expoly| simplify::merge_close_vertices_ex(expoly, distance_epsilon))
        .filter(|expoly| expoly.contour.is_valid())
        .collect();
    remove_small(&union_ex(&merged), area_epsilon)
}

/// Compute the total area of a set of polygons in model units squared.
pub fn total_area(expolygons: &[ExPolygon]) -> CoordF {
    crate::geometry::total_area_unscaled(expolygons)
}
