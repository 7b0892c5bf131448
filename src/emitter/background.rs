use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use may::sync::mpsc;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::{EmitError, Emitter};

struct Job {
    log_group: String,
    log_stream: String,
    payload: Vec<u8>,
    timestamp_millis: i64,
}

#[derive(Default)]
struct QueueMetrics {
    depth: AtomicUsize,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Non-blocking wrapper around another emitter.
///
/// `submit` copies the event onto an unbounded `may` channel and returns; a
/// dedicated worker thread drains the channel into the inner emitter. The
/// queue depth is capped at `queue_bound`; submissions beyond it are shed with
/// [`EmitError::QueueFull`]. Delivery failures happen on the worker and are
/// only logged.
pub struct BackgroundEmitter {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<QueueMetrics>,
    queue_bound: usize,
}

impl BackgroundEmitter {
    /// Start the worker thread in front of `inner`.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Transport`] if the worker thread cannot be spawned.
    pub fn spawn(inner: Arc<dyn Emitter>, queue_bound: usize) -> Result<Self, EmitError> {
        let (tx, rx) = mpsc::channel::<Job>();
        let metrics = Arc::new(QueueMetrics::default());
        let worker_metrics = Arc::clone(&metrics);

        let worker = std::thread::Builder::new()
            .name("courseapm-emitter".to_string())
            .spawn(move || {
                debug!("Background emitter started");
                for job in rx.iter() {
                    match inner.submit(
                        &job.log_group,
                        &job.log_stream,
                        &job.payload,
                        job.timestamp_millis,
                    ) {
                        Ok(()) => {
                            worker_metrics.delivered.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            worker_metrics.failed.fetch_add(1, Ordering::Relaxed);
                            error!(
                                log_group = %job.log_group,
                                log_stream = %job.log_stream,
                                error = %err,
                                "Background emission failed"
                            );
                        }
                    }
                    worker_metrics.depth.fetch_sub(1, Ordering::Relaxed);
                }
                debug!("Background emitter drained");
            })
            .map_err(|e| EmitError::Transport(format!("failed to spawn emitter thread: {e}")))?;

        info!(queue_bound = queue_bound, "Background emitter ready");
        Ok(Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            metrics,
            queue_bound,
        })
    }

    /// Events accepted but not yet handed to the inner emitter.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.metrics.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.metrics.delivered.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.metrics.failed.load(Ordering::Relaxed)
    }

    /// Stop accepting events, deliver everything already queued and join the worker.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("Background emitter thread panicked");
            }
        }
        info!(
            delivered = self.delivered(),
            failed = self.failed(),
            "Background emitter shut down"
        );
    }
}

impl Emitter for BackgroundEmitter {
    fn submit(
        &self,
        log_group: &str,
        log_stream: &str,
        event: &[u8],
        timestamp_millis: i64,
    ) -> Result<(), EmitError> {
        let pending = self.metrics.depth.fetch_add(1, Ordering::Relaxed);
        if pending >= self.queue_bound {
            self.metrics.depth.fetch_sub(1, Ordering::Relaxed);
            warn!(pending = pending, "Emission queue full - shedding event");
            return Err(EmitError::QueueFull(pending));
        }

        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.metrics.depth.fetch_sub(1, Ordering::Relaxed);
            return Err(EmitError::Closed);
        };
        let job = Job {
            log_group: log_group.to_string(),
            log_stream: log_stream.to_string(),
            payload: event.to_vec(),
            timestamp_millis,
        };
        sender.send(job).map_err(|_| {
            self.metrics.depth.fetch_sub(1, Ordering::Relaxed);
            EmitError::Closed
        })
    }
}

impl Drop for BackgroundEmitter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
