// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Pipeline coordination
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   entropy    ┌──────────────┐   raw bytes   ┌──────────────┐
//! │   Fetcher    │ ────────────>│    Writer    │ ─────────────>│     Sink     │
//! │ (HTTP/JSON)  │   channel    │    (hex)     │               │   (stdout)   │
//! └──────────────┘              └──────────────┘               └──────────────┘
//!        │                             │
//!        └──────── error channel ──────┴──────> Coordinator
//! ```
//!
//! The coordinator waits for the first error from either task, then signals
//! shutdown and closes the error channel. Tasks get [`DRAIN_TIMEOUT`] to
//! stop before they are aborted, so a stalled sink cannot hold the process
//! open. The pipeline has no other exit.

use crate::{
    metrics::{Metrics, MetricsSnapshot},
    protocol::EntropyBlock,
    sink::SinkWriter,
    source::{run_source, EntropySource},
    Error,
};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the entropy channel; one slot approximates a rendezvous
pub const ENTROPY_CHANNEL_CAPACITY: usize = 1;

/// Capacity of the error channel; only the first error is ever read
pub const ERROR_CHANNEL_CAPACITY: usize = 1;

/// Process exit status after the pipeline stops
pub const EXIT_FAILURE: i32 = 1;

/// How long each task may take to stop once shutdown is signalled
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Handles shared by the fetcher and writer tasks
#[derive(Clone)]
pub struct TaskContext {
    errors: mpsc::Sender<Error>,
    shutdown: CancellationToken,
    metrics: Metrics,
}

impl TaskContext {
    pub fn new(errors: mpsc::Sender<Error>, shutdown: CancellationToken, metrics: Metrics) -> Self {
        Self {
            errors,
            shutdown,
            metrics,
        }
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Send an error to the coordinator
    ///
    /// Never blocks past shutdown; an error raised after the coordinator has
    /// stopped listening is dropped.
    pub async fn report(&self, err: Error) {
        warn!(kind = err.kind(), "{}", err);
        self.metrics.record_error();

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!("Shutdown already signalled, dropping error");
            }
            sent = self.errors.send(err) => {
                if sent.is_err() {
                    debug!("Error channel closed, dropping error");
                }
            }
        }
    }
}

/// Result of a finished pipeline run
pub struct PipelineOutcome<W> {
    /// The first error received; always present because the pipeline only
    /// stops on error
    pub error: Error,
    /// The sink, handed back by the writer unless the writer task panicked
    /// or was aborted after [`DRAIN_TIMEOUT`]
    pub sink: Option<W>,
    pub metrics: MetricsSnapshot,
}

impl<W> PipelineOutcome<W> {
    /// Diagnostic line written to standard error
    pub fn diagnostic(&self) -> String {
        format!("Error: {}", self.error)
    }

    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}

/// Composition root wiring an entropy source to a byte sink
pub struct Pipeline<S, W> {
    source: S,
    sink: W,
    metrics: Metrics,
}

impl<S, W> Pipeline<S, W>
where
    S: EntropySource,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(source: S, sink: W) -> Self {
        Self {
            source,
            sink,
            metrics: Metrics::new(),
        }
    }

    /// Use an externally owned metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run until the first error
    ///
    /// Running -> Draining (shutdown signalled, channels closed) -> Terminated.
    pub async fn run(self) -> PipelineOutcome<W> {
        let (entropy_tx, entropy_rx) = mpsc::channel::<EntropyBlock>(ENTROPY_CHANNEL_CAPACITY);
        let (error_tx, mut error_rx) = mpsc::channel::<Error>(ERROR_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        // The coordinator keeps no sender, so the error channel reports
        // closure once both tasks are gone
        let ctx = TaskContext::new(error_tx, shutdown.clone(), self.metrics.clone());

        info!("Pipeline running");
        let source_handle = tokio::spawn(run_source(self.source, entropy_tx, ctx.clone()));
        let sink_handle = tokio::spawn(SinkWriter::new(self.sink).run(entropy_rx, ctx));

        let error = match error_rx.recv().await {
            Some(err) => err,
            None => Error::Internal("pipeline stopped without reporting an error".to_string()),
        };

        info!(kind = error.kind(), "Pipeline draining");
        shutdown.cancel();
        error_rx.close();

        let (_, sink) = tokio::join!(
            join_within(source_handle, "Fetcher"),
            join_within(sink_handle, "Writer"),
        );

        let metrics = self.metrics.snapshot();
        info!(
            requests = metrics.requests_total,
            blocks_published = metrics.blocks_published,
            bytes_written = metrics.bytes_written,
            errors = metrics.errors_reported,
            "Pipeline terminated"
        );

        PipelineOutcome {
            error,
            sink,
            metrics,
        }
    }
}

/// Wait for a task to stop, aborting it after [`DRAIN_TIMEOUT`]
async fn join_within<T>(mut handle: JoinHandle<T>, task: &str) -> Option<T> {
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!("{} task failed: {}", task, e);
            None
        }
        Err(_) => {
            warn!("{} task still busy after {:?}, aborting", task, DRAIN_TIMEOUT);
            handle.abort();
            None
        }
    }
}
