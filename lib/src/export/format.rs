//! Output formats and their layer encoders.
//!
//! [`OutputFormat::Raw`] hands the mask buffers to the consumer unchanged.
//! The photon family formats are named here so hosts can offer and select
//! them, but their encoders report [`Error::Unsupported`] until a container
//! writer exists.

use crate::raster::LayerImage;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw RGBA mask buffers.
    #[default]
    Raw,
    /// Anycubic Photon (`.photon`).
    Photon,
    /// Anycubic Photon S (`.photons`).
    Photons,
    /// Anycubic Photon Workshop (`.pws`).
    Pws,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Raw,
        OutputFormat::Photon,
        OutputFormat::Photons,
        OutputFormat::Pws,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Raw => "raw",
            OutputFormat::Photon => "photon",
            OutputFormat::Photons => "photons",
            OutputFormat::Pws => "pws",
        }
    }

    /// File extension of the container.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Raw => "rgba",
            OutputFormat::Photon => "photon",
            OutputFormat::Photons => "photons",
            OutputFormat::Pws => "pws",
        }
    }

    pub fn is_implemented(&self) -> bool {
        matches!(self, OutputFormat::Raw)
    }

    /// Encoder for this format.
    pub fn encoder(&self) -> Box<dyn LayerEncoder> {
        match self {
            OutputFormat::Raw => Box::new(RawEncoder),
            other => Box::new(PendingEncoder(*other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown output format '{s}'")))
    }
}

/// Turns rasterized layers into the payload streamed to the consumer.
pub trait LayerEncoder: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// Fail early when the encoder cannot produce output at all.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Encode one layer. Takes the buffer by value so it can be passed on
    /// without a copy.
    fn encode(&self, layer: LayerImage) -> Result<LayerImage>;
}

/// Passes mask buffers through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawEncoder;

impl LayerEncoder for RawEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Raw
    }

    fn encode(&self, layer: LayerImage) -> Result<LayerImage> {
        Ok(layer)
    }
}

/// Named format without a container writer yet.
#[derive(Clone, Copy, Debug)]
pub struct PendingEncoder(pub OutputFormat);

impl LayerEncoder for PendingEncoder {
    fn format(&self) -> OutputFormat {
        self.0
    }

    fn check(&self) -> Result<()> {
        Err(Error::Unsupported(self.0.name().to_string()))
    }

    fn encode(&self, _layer: LayerImage) -> Result<LayerImage> {
        Err(Error::Unsupported(self.0.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_parse_format() {
        assert_eq!("raw".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert_eq!("PWS".parse::<OutputFormat>().unwrap(), OutputFormat::Pws);
        assert!("ctb".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_encoders() {
        let layer = LayerImage {
            index: 0,
            image: RgbaImage::new(2, 2),
        };
        assert!(OutputFormat::Raw.encoder().encode(layer.clone()).is_ok());

        for format in [OutputFormat::Photon, OutputFormat::Photons, OutputFormat::Pws] {
            let encoder = format.encoder();
            assert_eq!(encoder.format(), format);
            assert!(!format.is_implemented());
            assert!(matches!(encoder.check(), Err(Error::Unsupported(name)) if name == format.name()));
            assert!(encoder.encode(layer.clone()).is_err());
        }
    }
}
