//! Print configuration types.
//!
//! [`Settings`] is the per-job slicing configuration; [`RasterConfig`]
//! describes the exposure mask surface that layers are drawn onto.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default slice height (model units).
pub const DEFAULT_LAYER_HEIGHT: CoordF = 0.05;

/// Default number of layers solid fill is projected across.
pub const DEFAULT_SOLID_LAYER_SPAN: usize = 5;

/// Default mask resolution.
pub const DEFAULT_WIDTH: u32 = 2560;
pub const DEFAULT_HEIGHT: u32 = 1440;

/// Immutable configuration for one print job.
///
/// Unset values fall back to their documented defaults through the accessors,
/// so a job file that omits them is still valid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Slice height (model units). Defaults to 0.05.
    pub layer_height: Option<CoordF>,
    /// Solid projection span in layers. Defaults to 5.
    pub solid_layer_span: Option<usize>,
}

impl Settings {
    /// Create settings with every value unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set layer height.
    pub fn with_layer_height(mut self, height: CoordF) -> Self {
        self.layer_height = Some(height);
        self
    }

    /// Builder method: set solid layer span.
    pub fn with_solid_layer_span(mut self, span: usize) -> Self {
        self.solid_layer_span = Some(span);
        self
    }

    /// Effective layer height.
    pub fn layer_height(&self) -> CoordF {
        self.layer_height.unwrap_or(DEFAULT_LAYER_HEIGHT)
    }

    /// Effective solid layer span.
    pub fn solid_layer_span(&self) -> usize {
        self.solid_layer_span.unwrap_or(DEFAULT_SOLID_LAYER_SPAN)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let height = self.layer_height();
        if !height.is_finite() || height <= 0.0 {
            return Err(Error::Config(format!(
                "layer height must be positive, got {height}"
            )));
        }
        if self.solid_layer_span() == 0 {
            return Err(Error::Config("solid layer span must be at least 1".into()));
        }
        Ok(())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "layer height {} ({}), solid span {} layers ({})",
            self.layer_height(),
            if self.layer_height.is_some() { "set" } else { "default" },
            self.solid_layer_span(),
            if self.solid_layer_span.is_some() { "set" } else { "default" },
        )
    }
}

/// Rule deciding which pixels are inside a path with overlapping or nested rings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillRule {
    /// Inside when the winding number is non-zero. This is the default rule of
    /// 2D canvas surfaces, so overlapping rings of one path stay filled.
    #[default]
    NonZero,
    /// Inside when an odd number of edges is crossed, so overlaps cancel.
    EvenOdd,
}

impl FillRule {
    /// Check whether a winding number is inside under this rule.
    #[inline]
    pub fn is_inside(&self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FillRule::NonZero => "non-zero",
            FillRule::EvenOdd => "even-odd",
        }
    }
}

/// Exposure mask surface configuration.
///
/// Model coordinates map onto pixels by translation only: a point `(x, y)`
/// lands at pixel `(x + width/2, y + height/2)`, with pixel rows growing
/// downward. There is no scaling or Y flip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Mask width in pixels.
    pub width: u32,
    /// Mask height in pixels.
    pub height: u32,
    /// Fill rule used for each polygon path.
    pub fill_rule: FillRule,
    /// RGBA color of exposed pixels.
    pub fill_color: [u8; 4],
    /// RGBA color of unexposed pixels.
    pub background: [u8; 4],
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fill_rule: FillRule::NonZero,
            fill_color: [200, 0, 0, 255],
            background: [0, 0, 0, 0],
        }
    }
}

impl RasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the mask resolution.
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder method: set the fill rule.
    pub fn fill_rule(mut self, rule: FillRule) -> Self {
        self.fill_rule = rule;
        self
    }

    /// Size in bytes of one RGBA layer buffer, if it fits in memory at all.
    pub fn buffer_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "mask resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RasterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} mask, {} fill",
            self.width,
            self.height,
            self.fill_rule.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(settings.layer_height.is_none());
        assert!((settings.layer_height() - 0.05).abs() < 1e-12);
        assert_eq!(settings.solid_layer_span(), 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_builder() {
        let settings = Settings::new()
            .with_layer_height(0.1)
            .with_solid_layer_span(2);
        assert!((settings.layer_height() - 0.1).abs() < 1e-12);
        assert_eq!(settings.solid_layer_span(), 2);
    }

    #[test]
    fn test_settings_validation() {
        assert!(Settings::new().with_layer_height(0.0).validate().is_err());
        assert!(Settings::new().with_layer_height(f64::NAN).validate().is_err());
        assert!(Settings::new().with_solid_layer_span(0).validate().is_err());
    }

    #[test]
    fn test_settings_deserialize_missing_fields() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());

        let settings: Settings = serde_json::from_str(r#"{"solid_layer_span": 1}"#).unwrap();
        assert_eq!(settings.solid_layer_span(), 1);
        assert!((settings.layer_height() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_fill_rule() {
        assert_eq!(FillRule::default(), FillRule::NonZero);
        assert!(FillRule::NonZero.is_inside(2));
        assert!(!FillRule::EvenOdd.is_inside(2));
        assert!(FillRule::EvenOdd.is_inside(-1));
        assert!(!FillRule::NonZero.is_inside(0));
    }

    #[test]
    fn test_raster_config() {
        let config = RasterConfig::default();
        assert_eq!((config.width, config.height), (2560, 1440));
        assert_eq!(config.buffer_len(), Some(2560 * 1440 * 4));
        assert!(config.validate().is_ok());
        assert!(RasterConfig::new().resolution(0, 10).validate().is_err());

        let rule: FillRule = serde_json::from_str("\"even-odd\"").unwrap();
        assert_eq!(rule, FillRule::EvenOdd);
    }
}
