//! Scanline polygon fill.
//!
//! A path is a set of closed rings in pixel space. Each pixel row is sampled
//! at its center line; every edge crossing that line contributes +1 (edge
//! going down the image) or -1 (going up) to the winding number, and the
//! [`FillRule`] decides which winding numbers are inside. A pixel is painted
//! when its center lies inside.

use crate::config::FillRule;
use image::{Rgba, RgbaImage};

/// A ring in pixel coordinates.
pub type Ring = Vec<(f64, f64)>;

#[derive(Clone, Copy, Debug)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    winding: i32,
}

impl Edge {
    fn new(a: (f64, f64), b: (f64, f64)) -> Option<Self> {
        if a.1 == b.1 {
            // Horizontal edges never cross a sample line
            return None;
        }
        Some(Self {
            x0: a.0,
            y0: a.1,
            x1: b.0,
            y1: b.1,
            winding: if b.1 > a.1 { 1 } else { -1 },
        })
    }

    /// Crossing with the horizontal line `y`, half-open on the lower end so a
    /// vertex shared by two edges is counted once.
    fn crossing(&self, y: f64) -> Option<f64> {
        let (lo, hi) = if self.y0 < self.y1 {
            (self.y0, self.y1)
        } else {
            (self.y1, self.y0)
        };
        if y < lo || y >= hi {
            return None;
        }
        let t = (y - self.y0) / (self.y1 - self.y0);
        Some(self.x0 + t * (self.x1 - self.x0))
    }
}

/// Paint the inside of a path onto an image.
///
/// All rings form a single path, so overlapping rings resolve through
/// `rule` rather than painting twice. Returns the number of pixels painted.
pub fn fill_path(image: &mut RgbaImage, rings: &[Ring], rule: FillRule, color: Rgba<u8>) -> usize {
    let edges: Vec<Edge> = rings
        .iter()
        .filter(|ring| ring.len() >= 3)
        .flat_map(|ring| {
            ring.iter()
                .zip(ring.iter().cycle().skip(1))
                .filter_map(|(a, b)| Edge::new(*a, *b))
        })
        .collect();
    if edges.is_empty() {
        return 0;
    }

    let (width, height) = image.dimensions();
    let y_min = edges.iter().map(|e| e.y0.min(e.y1)).fold(f64::INFINITY, f64::min);
    let y_max = edges.iter().map(|e| e.y0.max(e.y1)).fold(f64::NEG_INFINITY, f64::max);

    // Rows whose center line y + 0.5 may hit the path
    let first_row = (y_min - 0.5).ceil().max(0.0);
    let last_row = (y_max - 0.5).ceil().min(height as f64);
    if first_row >= last_row {
        return 0;
    }

    let mut painted = 0;
    let mut crossings: Vec<(f64, i32)> = Vec::new();

    for row in first_row as u32..last_row as u32 {
        let sample = row as f64 + 0.5;
        crossings.clear();
        crossings.extend(
            edges
                .iter()
                .filter_map(|e| e.crossing(sample).map(|x| (x, e.winding))),
        );
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        let mut span_start: Option<f64> = None;
        for &(x, w) in &crossings {
            let was_inside = rule.is_inside(winding);
            winding += w;
            let inside = rule.is_inside(winding);
            match (was_inside, inside) {
                (false, true) => span_start = Some(x),
                (true, false) => {
                    if let Some(start) = span_start.take() {
                        painted += paint_span(image, row, start, x, width, color);
                    }
                }
                _ => {}
            }
        }
    }

    painted
}

/// Paint pixels of `row` whose centers lie in `[x0, x1)`.
fn paint_span(image: &mut RgbaImage, row: u32, x0: f64, x1: f64, width: u32, color: Rgba<u8>) -> usize {
    let start = (x0 - 0.5).ceil().max(0.0);
    let end = (x1 - 0.5).ceil().min(width as f64);
    if start >= end {
        return 0;
    }
    let (start, end) = (start as u32, end as u32);
    for x in start..end {
        image.put_pixel(x, row, color);
    }
    (end - start) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([200, 0, 0, 255]);

    fn square(x: f64, y: f64, size: f64) -> Ring {
        vec![(x, y), (x + size, y), (x + size, y + size), (x, y + size)]
    }

    fn painted(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p.0[3] > 0).count()
    }

    #[test]
    fn test_fill_square() {
        let mut image = RgbaImage::new(20, 20);
        let count = fill_path(&mut image, &[square(5.0, 5.0, 10.0)], FillRule::NonZero, RED);
        assert_eq!(count, 100);
        assert_eq!(painted(&image), 100);
        assert_eq!(image.get_pixel(5, 5), &RED);
        assert_eq!(image.get_pixel(14, 14), &RED);
        assert_eq!(image.get_pixel(15, 15).0[3], 0);
        assert_eq!(image.get_pixel(4, 10).0[3], 0);
    }

    #[test]
    fn test_fill_clipped_to_image() {
        let mut image = RgbaImage::new(10, 10);
        let count = fill_path(&mut image, &[square(-5.0, -5.0, 10.0)], FillRule::NonZero, RED);
        assert_eq!(count, 25);
    }

    #[test]
    fn test_overlap_non_zero() {
        // Two squares of the same orientation in one path overlap on a 4x4 area
        let rings = vec![square(0.0, 0.0, 8.0), square(4.0, 4.0, 8.0)];
        let mut image = RgbaImage::new(16, 16);
        fill_path(&mut image, &rings, FillRule::NonZero, RED);
        assert_eq!(painted(&image), 64 + 64 - 16);
        assert_eq!(image.get_pixel(6, 6), &RED);
    }

    #[test]
    fn test_overlap_even_odd() {
        let rings = vec![square(0.0, 0.0, 8.0), square(4.0, 4.0, 8.0)];
        let mut image = RgbaImage::new(16, 16);
        fill_path(&mut image, &rings, FillRule::EvenOdd, RED);
        assert_eq!(painted(&image), 64 + 64 - 32);
        assert_eq!(image.get_pixel(6, 6).0[3], 0);
        assert_eq!(image.get_pixel(2, 2), &RED);
    }

    #[test]
    fn test_hole_with_opposite_winding() {
        let mut hole = square(3.0, 3.0, 4.0);
        hole.reverse();
        let rings = vec![square(0.0, 0.0, 10.0), hole];
        for rule in [FillRule::NonZero, FillRule::EvenOdd] {
            let mut image = RgbaImage::new(10, 10);
            assert_eq!(fill_path(&mut image, &rings, rule, RED), 100 - 16);
            assert_eq!(image.get_pixel(5, 5).0[3], 0);
        }
    }

    #[test]
    fn test_degenerate_rings_ignored() {
        let mut image = RgbaImage::new(4, 4);
        let rings = vec![vec![(0.0, 0.0), (3.0, 3.0)]];
        assert_eq!(fill_path(&mut image, &rings, FillRule::NonZero, RED), 0);
    }
}
