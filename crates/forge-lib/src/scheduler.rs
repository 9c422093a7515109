//! The upload scheduler: a sequential, single-worker, cancelable
//! pipeline from a bounded channel of `UploadJob` to a bounded channel of
//! `UploadResult`.

use std::{collections::HashMap, sync::Arc, time::SystemTime};

use forge_errors::ForgeError;
use forge_upload::UploadBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::model::{UploadJob, UploadResult};

/// The producer-side handle: the Task Runner queues jobs through this and
/// calls `close()` once every job for the run has been queued.
pub struct UploadQueue {
    tx: Option<mpsc::Sender<UploadJob>>,
}

impl UploadQueue {
    pub fn new(tx: mpsc::Sender<UploadJob>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Blocks if the channel is full. Panics if called after `close()` —
    /// queuing after close is a programming error.
    pub async fn queue(&self, job: UploadJob) {
        let tx = self.tx.as_ref().expect("UploadQueue::queue called after close()");
        // The scheduler only stops reading on cancellation or its own
        // shutdown; a send failure here would mean the receiver half was
        // dropped out from under a live queue, which is itself a bug.
        tx.send(job).await.expect("upload scheduler is no longer receiving jobs");
    }

    /// Closes the channel, signalling the scheduler that no more jobs are
    /// coming. Idempotent.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

pub struct UploadScheduler {
    backends: HashMap<&'static str, Arc<dyn UploadBackend>>,
    jobs_rx: mpsc::Receiver<UploadJob>,
    results_tx: mpsc::Sender<UploadResult>,
    cancellation: CancellationToken,
}

impl UploadScheduler {
    /// Duplicate scheme registration is a construction error.
    pub fn new(
        backends: Vec<Arc<dyn UploadBackend>>,
        jobs_rx: mpsc::Receiver<UploadJob>,
        results_tx: mpsc::Sender<UploadResult>,
        cancellation: CancellationToken,
    ) -> Result<Self, ForgeError> {
        let mut by_scheme = HashMap::with_capacity(backends.len());
        for backend in backends {
            if by_scheme.insert(backend.uri_scheme(), backend).is_some() {
                return Err(ForgeError::Scheduler {
                    cause: "duplicate upload backend registered for the same URI scheme".to_string(),
                });
            }
        }
        Ok(Self { backends: by_scheme, jobs_rx, results_tx, cancellation })
    }

    /// Spawns the single background worker and returns its handle.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => break,
                job = self.jobs_rx.recv() => {
                    match job {
                        Some(job) => {
                            let result = self.process(job).await;
                            if self.results_tx.send(result).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
        // `self.results_tx` drops here, closing the output channel.
    }

    async fn process(&self, job: UploadJob) -> UploadResult {
        let scheme = job.destination.scheme();
        let start_ts = SystemTime::now();

        let outcome = match self.backends.get(scheme) {
            None => Err(format!("no uploader for scheme {scheme}")),
            Some(backend) => {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => Err("upload was cancelled".to_string()),
                    result = backend.upload(&self.cancellation, job.source_path.as_path(), &job.destination) => {
                        match result {
                            Ok(url) if url.is_empty() => {
                                Err("backend reported success with an empty url".to_string())
                            }
                            Ok(url) => Ok(url),
                            Err(e) => Err(e.to_string()),
                        }
                    }
                }
            }
        };

        let end_ts = SystemTime::now();
        match outcome {
            Ok(url) => UploadResult { job, url: Some(url), error: None, start_ts, end_ts },
            Err(cause) => UploadResult { job, url: None, error: Some(cause), start_ts, end_ts },
        }
    }
}
