//! Background Write Queue
//!
//! A bounded job queue drained by exactly one worker task. Decorators use it
//! for work the caller must not wait on (back-fill, write-back, metric
//! recording) and call [`WriteBackQueue::close`] as their shutdown barrier.

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default capacity of background queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Handler invoked by the worker for each job
pub type JobHandler<J> = Box<dyn Fn(J) -> BoxFuture<'static, ()> + Send + Sync>;

/// Bounded queue with a single draining worker
pub struct WriteBackQueue<J> {
    /// Queue name, used in logs
    name: &'static str,
    /// Sending half; `None` once closed
    tx: Mutex<Option<mpsc::Sender<J>>>,
    /// Worker handle; held across the join so concurrent closers all wait
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    /// Jobs enqueued and not yet fully handled
    in_flight: Arc<AtomicUsize>,
    /// Jobs dropped because the queue was full
    dropped: AtomicU64,
}

impl<J: Send + 'static> WriteBackQueue<J> {
    /// Create the queue and start its worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(name: &'static str, capacity: usize, handler: JobHandler<J>) -> Self {
        let (tx, mut rx) = mpsc::channel::<J>(capacity.max(1));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let worker_in_flight = in_flight.clone();
        let worker = tokio::spawn(async move {
            debug!(queue = name, "Background worker started");
            while let Some(job) = rx.recv().await {
                handler(job).await;
                worker_in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            debug!(queue = name, "Background worker stopped");
        });

        Self {
            name,
            tx: Mutex::new(Some(tx)),
            worker: tokio::sync::Mutex::new(Some(worker)),
            in_flight,
            dropped: AtomicU64::new(0),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<J>> {
        self.tx.lock().clone()
    }

    /// Enqueue a job, waiting for room when the queue is full
    pub async fn enqueue(&self, job: J) -> Result<()> {
        let tx = self.sender().ok_or(Error::QueueClosed)?;
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if tx.send(job).await.is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(Error::QueueClosed);
        }
        Ok(())
    }

    /// Enqueue a job without waiting; returns false when it was dropped
    pub fn try_enqueue(&self, job: J) -> bool {
        let Some(tx) = self.sender() else {
            debug!(queue = self.name, "Queue closed, dropping job");
            return false;
        };
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        match tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(queue = self.name, "Queue full, dropping job");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                false
            }
        }
    }

    /// Jobs enqueued and not yet handled
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Jobs dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Stop accepting jobs and wait until the worker drained the queue
    ///
    /// Every caller returns only after the worker has exited.
    pub async fn close(&self) {
        drop(self.tx.lock().take());
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            if let Err(e) = handle.await {
                warn!(queue = self.name, error = %e, "Background worker ended abnormally");
            }
        }
    }
}
