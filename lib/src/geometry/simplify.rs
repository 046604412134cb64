//! Vertex simplification for sliced contours.
//!
//! Slicing leaves runs of nearly coincident vertices where mesh triangles meet
//! the cutting plane at shallow angles. These helpers merge such vertices so
//! later boolean operations do not produce slivers.

use super::{ExPolygon, Point, Polygon};
use crate::{scale, Coord, CoordF};

/// Remove consecutive points closer than `tolerance` (scaled units) to the
/// last kept point.
pub fn remove_duplicate_points(points: &[Point], tolerance: Coord) -> Vec<Point> {
    let mut result: Vec<Point> = Vec::with_capacity(points.len());
    let tolerance_sq = tolerance as i128 * tolerance as i128;

    for point in points {
        match result.last() {
            Some(last) if last.distance_squared(point) <= tolerance_sq => {}
            _ => result.push(*point),
        }
    }

    result
}

/// Merge vertices of a closed polygon that lie within `distance` model units
/// of each other, including across the implicit closing edge.
pub fn merge_close_vertices(polygon: &Polygon, distance: CoordF) -> Polygon {
    let tolerance = scale(distance);
    let mut points = remove_duplicate_points(polygon.points(), tolerance);

    let tolerance_sq = tolerance as i128 * tolerance as i128;
    while points.len() > 1 {
        match (points.first(), points.last()) {
            (Some(first), Some(last)) if first.distance_squared(last) <= tolerance_sq => {
                points.pop();
            }
            _ => break,
        }
    }

    Polygon::from_points(points)
}

/// Merge close vertices on every ring of an ExPolygon. Holes that collapse
/// below three vertices are dropped.
pub fn merge_close_vertices_ex(expolygon: &ExPolygon, distance: CoordF) -> ExPolygon {
    let contour = merge_close_vertices(&expolygon.contour, distance);
    let holes = expolygon
        .holes
        .iter()
        .map(|hole| merge_close_vertices(hole, distance))
        .filter(Polygon::is_valid)
        .collect();
    ExPolygon::with_holes(contour, holes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_duplicate_points() {
        let points = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(100, 0),
            Point::new(101, 1),
        ];
        let result = remove_duplicate_points(&points, 2);
        assert_eq!(result, vec![Point::new(0, 0), Point::new(100, 0)]);
    }

    #[test]
    fn test_merge_close_vertices_wraps_closing_edge() {
        // Last vertex sits 1 micron from the first one
        let polygon = Polygon::from_points(vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(10.0, 0.0),
            Point::new_scale(10.0, 10.0),
            Point::new_scale(0.0, 10.0),
            Point::new_scale(0.0, 0.001),
        ]);

        let merged = merge_close_vertices(&polygon, 0.005);
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_merge_collapses_tiny_ring() {
        let sliver = Polygon::from_points(vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(0.001, 0.0),
            Point::new_scale(0.001, 0.001),
        ]);
        assert!(!merge_close_vertices(&sliver, 0.005).is_valid());
    }
}
