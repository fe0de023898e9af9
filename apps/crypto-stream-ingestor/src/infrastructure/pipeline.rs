//! Ingest Pipeline Supervision
//!
//! Runs the feed client and the ingest worker as tasks joined by the event
//! queue. The client owns the only sender, so the worker drains whatever is
//! queued after the client stops and then ends on its own.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{PointSink, StreamEvent};
use crate::application::services::IngestWorker;
use crate::infrastructure::alpaca::{CryptoStreamClient, StreamClientError};

/// Why the pipeline stopped abnormally.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Feed client gave up.
    #[error("crypto stream client failed: {0}")]
    Client(#[from] StreamClientError),

    /// A pipeline task panicked or was aborted.
    #[error("pipeline task failed: {0}")]
    Task(#[from] JoinError),
}

/// Feed client, worker and the queue between them.
pub struct IngestPipeline<S: PointSink + ?Sized + 'static> {
    client: Arc<CryptoStreamClient>,
    worker: IngestWorker<S>,
    events: mpsc::Receiver<StreamEvent>,
    shutdown: CancellationToken,
}

impl<S: PointSink + ?Sized + 'static> IngestPipeline<S> {
    /// Assemble a pipeline. `shutdown` must be the token the client and
    /// worker were built with.
    pub const fn new(
        client: Arc<CryptoStreamClient>,
        worker: IngestWorker<S>,
        events: mpsc::Receiver<StreamEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            worker,
            events,
            shutdown,
        }
    }

    /// Run until `shutdown_signal` resolves or the client stops, then wait
    /// for the worker to finish the queue.
    ///
    /// # Errors
    ///
    /// Returns the client's error when it stopped on its own (reconnect
    /// budget spent, queue closed), or a task failure.
    pub async fn run<F>(self, shutdown_signal: F) -> Result<(), PipelineError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            client,
            worker,
            events,
            shutdown,
        } = self;

        let worker_handle = tokio::spawn(async move { worker.run(events).await });
        let mut client_handle = tokio::spawn(client.run());

        let finished = tokio::select! {
            () = shutdown_signal => None,
            result = &mut client_handle => Some(result),
        };
        shutdown.cancel();
        let client_result = match finished {
            Some(result) => result,
            None => client_handle.await,
        };

        worker_handle.await?;

        if let Ok(Err(e)) = &client_result {
            tracing::error!(error = %e, "Crypto stream client stopped");
        }
        client_result??;
        Ok(())
    }
}
