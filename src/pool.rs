//! Bounded worker pool for fire-and-forget pipeline runs.
//!
//! The upload path must return as soon as document rows exist; processing
//! happens afterwards, asynchronously. An unsupervised `spawn` per upload
//! would make backpressure and shutdown implicit, so the pool makes both
//! first-class: a bounded queue pushes back on floods of uploads, and
//! [`PipelinePool::shutdown`] drains in-flight runs to their terminal
//! status before returning — no document is ever abandoned in
//! `processing`.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::model::Document;
use crate::process::Processor;

/// One queued pipeline run.
#[derive(Debug)]
pub struct PipelineJob {
    pub document: Document,
    /// Extracted text content of the stored file.
    pub content: String,
}

/// Fixed set of workers draining a bounded queue of pipeline runs.
pub struct PipelinePool {
    tx: mpsc::Sender<PipelineJob>,
    workers: Vec<JoinHandle<()>>,
}

impl PipelinePool {
    /// Start `workers` workers over a queue holding at most `queue_depth`
    /// pending jobs.
    pub fn start(processor: Arc<Processor>, workers: usize, queue_depth: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<PipelineJob>(queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers)
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                let processor = Arc::clone(&processor);
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only while receiving, so workers
                        // drain the queue concurrently.
                        let job = rx.lock().await.recv().await;
                        match job {
                            Some(job) => {
                                debug!(worker_id, document_id = %job.document.id, "job picked up");
                                processor.process(&job.document, &job.content).await;
                            }
                            None => {
                                debug!(worker_id, "queue closed, worker exiting");
                                break;
                            }
                        }
                    }
                })
            })
            .collect();

        info!(workers, "pipeline pool started");
        Self {
            tx,
            workers: handles,
        }
    }

    /// Queue a pipeline run, waiting when the queue is full (backpressure).
    pub async fn submit(&self, job: PipelineJob) -> Result<(), PipelineError> {
        self.tx
            .send(job)
            .await
            .map_err(|_| PipelineError::PoolClosed)
    }

    /// Number of jobs that can be queued without waiting.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    /// Close the queue and wait for every in-flight run to reach a terminal
    /// status.
    ///
    /// Jobs still queued are drained and processed; jobs never submitted
    /// are unaffected (their documents remain `uploaded`). Workers are
    /// awaited, not aborted, so a run is never cancelled mid-flight.
    pub async fn shutdown(self) {
        drop(self.tx);
        for handle in self.workers {
            if let Err(err) = handle.await {
                warn!(error = %err, "pipeline worker terminated abnormally");
            }
        }
        info!("pipeline pool drained and stopped");
    }
}
