//! Layer stream export module.
//!
//! Rasterized layers leave the background context one at a time, each buffer
//! moved to the consumer, followed by exactly one completion message with the
//! mask size. Two sinks are supported:
//!
//! - callbacks, via [`LayerStreamExporter::export`]
//! - a bounded channel, via [`LayerStreamExporter::export_to`], where a slow
//!   consumer blocks the producer once `capacity` layers are pending
//!
//! # Example
//!
//! ```rust,ignore
//! let (sender, receiver) = layer_channel(4);
//! std::thread::spawn(move || exporter.export_to(&mut job, &sender));
//! for message in receiver {
//!     match message {
//!         StreamMessage::Layer(layer) => write(layer.into_raw()),
//!         StreamMessage::Complete(summary) => println!("{}x{}", summary.width, summary.height),
//!     }
//! }
//! ```

mod format;

pub use format::{LayerEncoder, OutputFormat, PendingEncoder, RawEncoder};

use crate::print::{PrintJob, PrintOutput};
use crate::raster::LayerImage;
use crate::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Metadata sent once after the last layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub width: u32,
    pub height: u32,
    pub layers: usize,
}

/// Message on a layer stream.
#[derive(Debug)]
pub enum StreamMessage {
    Layer(LayerImage),
    Complete(ExportSummary),
}

pub type LayerSender = SyncSender<StreamMessage>;
pub type LayerReceiver = Receiver<StreamMessage>;

/// Bounded layer stream holding at most `capacity` pending messages.
pub fn layer_channel(capacity: usize) -> (LayerSender, LayerReceiver) {
    sync_channel(capacity)
}

/// Emits rasterized layers to a consumer.
pub struct LayerStreamExporter {
    encoder: Box<dyn LayerEncoder>,
}

impl Default for LayerStreamExporter {
    fn default() -> Self {
        Self::new(OutputFormat::Raw)
    }
}

impl std::fmt::Debug for LayerStreamExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStreamExporter")
            .field("format", &self.encoder.format())
            .finish()
    }
}

impl LayerStreamExporter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            encoder: format.encoder(),
        }
    }

    /// Use a custom encoder.
    pub fn with_encoder(encoder: Box<dyn LayerEncoder>) -> Self {
        Self { encoder }
    }

    pub fn format(&self) -> OutputFormat {
        self.encoder.format()
    }

    /// Emit the job's images, draining `job.images`.
    ///
    /// Each buffer is moved into `on_layer`; `on_complete` runs exactly once
    /// after the last layer. The summary is also stored as the job output.
    pub fn export<L, C>(&self, job: &mut PrintJob, on_layer: L, on_complete: C) -> Result<ExportSummary>
    where
        L: FnMut(LayerImage) -> Result<()>,
        C: FnOnce(ExportSummary),
    {
        let images = std::mem::take(&mut job.images);
        let summary = self.stream(
            images.into_iter().map(Ok),
            job.raster.width,
            job.raster.height,
            on_layer,
            on_complete,
        )?;
        job.output = Some(PrintOutput::Exported(summary));
        Ok(summary)
    }

    /// Emit the job's images on a bounded channel, then a completion message.
    pub fn export_to(&self, job: &mut PrintJob, sender: &LayerSender) -> Result<ExportSummary> {
        let summary = self.export(job, |layer| send(sender, StreamMessage::Layer(layer)), |_| {})?;
        send(sender, StreamMessage::Complete(summary))?;
        Ok(summary)
    }

    /// Emit layers as they are produced, without holding more than one.
    pub fn stream<I, L, C>(
        &self,
        layers: I,
        width: u32,
        height: u32,
        mut on_layer: L,
        on_complete: C,
    ) -> Result<ExportSummary>
    where
        I: IntoIterator<Item = Result<LayerImage>>,
        L: FnMut(LayerImage) -> Result<()>,
        C: FnOnce(ExportSummary),
    {
        self.encoder.check()?;

        let mut count = 0;
        for layer in layers {
            on_layer(self.encoder.encode(layer?)?)?;
            count += 1;
        }

        let summary = ExportSummary {
            width,
            height,
            layers: count,
        };
        debug!(
            "Exported {} layers ({}x{}, {})",
            count,
            width,
            height,
            self.encoder.format()
        );
        on_complete(summary);
        Ok(summary)
    }
}

/// Send on a layer stream, mapping a dropped receiver to [`Error::Disconnected`].
pub fn send(sender: &LayerSender, message: StreamMessage) -> Result<()> {
    sender.send(message).map_err(|_| Error::Disconnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RasterConfig, Settings};
    use image::RgbaImage;
    use std::thread;

    fn job_with_images(count: usize) -> PrintJob {
        let mut job = PrintJob::new(Settings::default()).with_raster(RasterConfig::new().resolution(8, 4));
        job.images = (0..count)
            .map(|index| LayerImage {
                index,
                image: RgbaImage::new(8, 4),
            })
            .collect();
        job
    }

    #[test]
    fn test_export_moves_buffers() {
        let mut job = job_with_images(3);
        let pointers: Vec<*const u8> = job.images.iter().map(|l| l.as_raw().as_ptr()).collect();

        let mut received = Vec::new();
        let mut completions = Vec::new();
        let summary = LayerStreamExporter::default()
            .export(
                &mut job,
                |layer| {
                    received.push((layer.index, layer.into_raw().as_ptr()));
                    Ok(())
                },
                |summary| completions.push(summary),
            )
            .unwrap();

        assert_eq!(received.iter().map(|r| r.0).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(received.iter().map(|r| r.1).collect::<Vec<_>>(), pointers);
        assert_eq!(completions, vec![summary]);
        assert_eq!((summary.width, summary.height, summary.layers), (8, 4, 3));
        assert!(job.images.is_empty());
        assert!(matches!(job.output, Some(PrintOutput::Exported(s)) if s == summary));
    }

    #[test]
    fn test_export_empty_job_completes() {
        let mut job = job_with_images(0);
        let mut completions = 0;
        LayerStreamExporter::default()
            .export(&mut job, |_| Ok(()), |_| completions += 1)
            .unwrap();
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_export_to_channel() {
        let mut job = job_with_images(5);
        let (sender, receiver) = layer_channel(1);

        let producer = thread::spawn(move || LayerStreamExporter::default().export_to(&mut job, &sender));

        let messages: Vec<StreamMessage> = receiver.iter().collect();
        assert_eq!(messages.len(), 6);
        assert!(matches!(messages[4], StreamMessage::Layer(ref l) if l.index == 4));
        assert!(matches!(
            messages[5],
            StreamMessage::Complete(ExportSummary { width: 8, height: 4, layers: 5 })
        ));
        assert!(producer.join().unwrap().is_ok());
    }

    #[test]
    fn test_disconnected_consumer() {
        let mut job = job_with_images(2);
        let (sender, receiver) = layer_channel(0);
        drop(receiver);
        let result = LayerStreamExporter::default().export_to(&mut job, &sender);
        assert!(matches!(result, Err(Error::Disconnected)));
    }

    #[test]
    fn test_unsupported_format() {
        let mut job = job_with_images(1);
        let mut completions = 0;
        let result = LayerStreamExporter::new(OutputFormat::Photons).export(&mut job, |_| Ok(()), |_| {
            completions += 1
        });
        assert!(matches!(result, Err(Error::Unsupported(_))));
        assert_eq!(completions, 0);
    }
}
