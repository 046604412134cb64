//! Parameters handed to the slicer engine.

use crate::config::{Settings, DEFAULT_LAYER_HEIGHT};
use crate::CoordF;

/// Slicing parameters for one model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlicingParams {
    /// Distance between cuts (model units).
    pub layer_height: CoordF,
}

impl Default for SlicingParams {
    fn default() -> Self {
        Self {
            layer_height: DEFAULT_LAYER_HEIGHT,
        }
    }
}

impl SlicingParams {
    pub fn new(layer_height: CoordF) -> Self {
        Self { layer_height }
    }

    /// Parameters for a job, falling back to the default height when unset.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.layer_height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_falls_back_to_default() {
        let params = SlicingParams::from_settings(&Settings::default());
        assert!((params.layer_height - 0.05).abs() < 1e-12);

        let params = SlicingParams::from_settings(&Settings::new().with_layer_height(0.025));
        assert!((params.layer_height - 0.025).abs() < 1e-12);
    }
}
