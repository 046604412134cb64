//! Background job execution.
//!
//! [`spawn`] moves a [`PrintJob`] onto a worker thread that slices, refines,
//! rasterizes and exports it. The foreground never touches the job while it
//! runs: it reads [`WorkerMessage`]s from a bounded channel and gets the job
//! back from [`JobHandle::join`]. Layer buffers are moved through the channel,
//! so at most `capacity` of them are pending at any time and a slow consumer
//! holds the worker back.

use crate::driver::Driver;
use crate::export::ExportSummary;
use crate::pipeline::CancelToken;
use crate::print::PrintJob;
use crate::raster::LayerImage;
use crate::slice::SliceEngine;
use crate::{Error, Result};
use log::{debug, info};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Which part of the job a progress fraction belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Slicing and refinement, `[0, 1]` across all models.
    Slice,
    /// Rasterization and export, `[0, 1]` across all layers.
    Print,
}

/// Message from the worker to the foreground.
#[derive(Debug)]
pub enum WorkerMessage {
    Progress {
        phase: Phase,
        fraction: f64,
        message: Option<String>,
    },
    Layer(LayerImage),
    /// Sent once, after the last layer.
    Complete(ExportSummary),
}

/// Foreground side of a running job.
pub struct JobHandle {
    receiver: Receiver<WorkerMessage>,
    handle: JoinHandle<Result<PrintJob>>,
    cancel: CancelToken,
}

impl JobHandle {
    /// Blocking iterator over worker messages; ends when the worker is done.
    pub fn messages(&self) -> impl Iterator<Item = WorkerMessage> + '_ {
        self.receiver.iter()
    }

    pub fn receiver(&self) -> &Receiver<WorkerMessage> {
        &self.receiver
    }

    /// Ask the worker to stop at the next layer boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the worker and take the job back.
    ///
    /// Unread messages are discarded; a worker still sending then fails with
    /// [`Error::Disconnected`].
    pub fn join(self) -> Result<PrintJob> {
        let JobHandle {
            receiver, handle, ..
        } = self;
        drop(receiver);
        handle
            .join()
            .map_err(|_| Error::Worker("worker thread panicked".into()))?
    }
}

/// Run a job on a worker thread.
///
/// `capacity` bounds the number of undelivered messages.
pub fn spawn(
    job: PrintJob,
    driver: Arc<dyn Driver>,
    engine: Arc<dyn SliceEngine>,
    capacity: usize,
) -> Result<JobHandle> {
    let (sender, receiver) = sync_channel(capacity);
    let cancel = CancelToken::new();
    let token = cancel.clone();

    let handle = thread::Builder::new()
        .name("sla-worker".into())
        .spawn(move || run(job, driver.as_ref(), engine.as_ref(), &token, &sender))?;

    Ok(JobHandle {
        receiver,
        handle,
        cancel,
    })
}

fn run(
    mut job: PrintJob,
    driver: &dyn Driver,
    engine: &dyn SliceEngine,
    cancel: &CancelToken,
    sender: &SyncSender<WorkerMessage>,
) -> Result<PrintJob> {
    info!(
        "Worker started: driver {}, {} models",
        driver.name(),
        job.models.len()
    );

    // A consumer that went away stops the job at the next layer
    let progress = |phase: Phase, fraction: f64, message: Option<&str>| {
        let message = WorkerMessage::Progress {
            phase,
            fraction,
            message: message.map(str::to_string),
        };
        if sender.send(message).is_err() {
            cancel.cancel();
        }
    };

    let reports = driver.slice(&mut job, engine, cancel, &mut |fraction, message| {
        progress(Phase::Slice, fraction, message)
    })?;
    let degraded: usize = reports.iter().map(|r| r.degraded.len()).sum();
    debug!("Sliced {} models, {} degraded layers", reports.len(), degraded);

    let mut delivered = false;
    let summary = driver.print(
        &mut job,
        cancel,
        &mut |fraction| progress(Phase::Print, fraction, None),
        &mut |layer| {
            sender
                .send(WorkerMessage::Layer(layer))
                .map_err(|_| Error::Disconnected)
        },
        &mut |summary| delivered = sender.send(WorkerMessage::Complete(summary)).is_ok(),
    )?;
    if !delivered {
        return Err(Error::Disconnected);
    }

    info!(
        "Worker finished: {} layers at {}x{}",
        summary.layers, summary.width, summary.height
    );
    Ok(job)
}
