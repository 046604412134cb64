//! Shell generation module.
//!
//! Shells are the walls of a layer, produced by insetting the sliced
//! boundary regions:
//!
//! 1. Validate the boundary rings
//! 2. Inset by `offset * k` for shell `k` (`k = 0` is the outermost shell)
//! 3. Inset once more past the last shell to get the fill area
//!
//! With the SLA defaults (one shell, zero offset) the shell is the boundary
//! itself, normalized through a union, and the fill area is the same region.

use crate::clipper::{shrink, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons};
use crate::{CoordF, Error, Result};

/// Configuration for shell generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    /// Number of shells per layer.
    pub count: usize,
    /// Inset between consecutive shells (model units).
    pub offset: CoordF,
    /// Corner treatment of the insets.
    pub join_type: OffsetJoinType,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            count: 1,
            offset: 0.0,
            join_type: OffsetJoinType::Miter,
        }
    }
}

impl ShellConfig {
    pub fn new(count: usize, offset: CoordF) -> Self {
        Self {
            count,
            offset,
            ..Default::default()
        }
    }
}

/// Shells of one layer.
#[derive(Debug, Clone, Default)]
pub struct ShellResult {
    /// Shell regions per level, outermost first.
    pub levels: Vec<ExPolygons>,
    /// Area enclosed by the innermost shell.
    pub fill_area: ExPolygons,
}

impl ShellResult {
    /// The outermost shell level.
    pub fn outer(&self) -> &[ExPolygon] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Shell generator.
#[derive(Debug, Clone, Default)]
pub struct ShellGenerator {
    config: ShellConfig,
}

impl ShellGenerator {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Generate shells for one layer's boundary regions.
    ///
    /// Returns [`Error::Geometry`] when a boundary ring is degenerate or a
    /// non-empty boundary collapses to nothing.
    pub fn generate(&self, boundary: &[ExPolygon]) -> Result<ShellResult> {
        if boundary.is_empty() {
            return Ok(ShellResult::default());
        }

        for (i, region) in boundary.iter().enumerate() {
            if !region.contour.is_valid() {
                return Err(Error::Geometry(format!(
                    "region {i} contour has {} points",
                    region.contour.len()
                )));
            }
            if let Some(hole) = region.holes.iter().find(|hole| !hole.is_valid()) {
                return Err(Error::Geometry(format!(
                    "region {i} has a hole with {} points",
                    hole.len()
                )));
            }
        }

        let inset = |k: usize| shrink(boundary, self.config.offset * k as CoordF, self.config.join_type);

        let mut levels = Vec::with_capacity(self.config.count);
        for k in 0..self.config.count {
            let level = inset(k);
            if level.is_empty() {
                break;
            }
            levels.push(level);
        }

        if levels.is_empty() && self.config.count > 0 {
            return Err(Error::Geometry(
                "boundary collapsed while generating shells".into(),
            ));
        }

        let fill_area = if self.config.offset > 0.0 {
            inset(self.config.count)
        } else {
            levels.last().cloned().unwrap_or_else(|| inset(0))
        };

        Ok(ShellResult { levels, fill_area })
    }
}
