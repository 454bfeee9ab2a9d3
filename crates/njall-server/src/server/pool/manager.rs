//! Asynchronous pool of verticle workers.
//!
//! [`WorkerPool`] owns one bounded [`mpsc::Sender`] per worker and routes
//! decoded envelopes round-robin. A worker whose verticle shut down closes
//! its mailbox; the pool skips it and tries the next one. Shutdown is
//! coordinated through a shared [`CancellationToken`].

use crate::server::pool::{request::WorkRequest, worker::worker_loop};
use core::time::Duration;
use njall_core::{Dispatcher, Error, Generator, Result, Subscription, Verticle, proto::Message};
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::{
    sync::{
        mpsc::{self, error::SendError},
        oneshot,
    },
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// A cooperative pool of asynchronous verticle workers.
pub struct WorkerPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Constructs a new [`WorkerPool`] from initialized worker channels and a
    /// shared cancellation token.
    pub const fn new(
        workers: Vec<mpsc::Sender<WorkRequest>>,
        shutdown_token: CancellationToken,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            workers,
            next_worker: AtomicUsize::new(0),
            shutdown_token,
            shutdown_timeout,
        }
    }

    /// Spawns `num_workers` workers, each running a [`Subscription`] around
    /// the verticle built by `make_verticle(worker_id)`.
    ///
    /// All dispatchers share `generator`. Returns the pool and the workers'
    /// join handles.
    pub fn spawn<V, F>(
        num_workers: usize,
        mailbox_size: usize,
        shutdown_timeout: Duration,
        generator: &Arc<Generator>,
        mut make_verticle: F,
    ) -> (Self, Vec<JoinHandle<Subscription<V, Arc<Generator>>>>)
    where
        V: Verticle + Send + 'static,
        F: FnMut(usize) -> V,
    {
        let mut workers = Vec::with_capacity(num_workers);
        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(mailbox_size);
            workers.push(tx);

            let subscription = Subscription::new(
                format!("worker-{worker_id}"),
                make_verticle(worker_id),
                Dispatcher::new(Arc::clone(generator)),
            );
            handles.push(tokio::spawn(worker_loop(worker_id, rx, subscription)));
        }

        let pool = Self::new(workers, CancellationToken::new(), shutdown_timeout);
        (pool, handles)
    }

    /// Token cancelled when the pool starts shutting down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// Number of workers whose mailbox is still open.
    pub fn active_workers(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_closed()).count()
    }

    /// Returns the index of the next worker to receive work (round-robin).
    ///
    /// Uses a relaxed atomic increment to minimize contention.
    pub fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Sends `message` to the next open worker in the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The service is shutting down (`shutdown_token` was cancelled).
    /// - Every worker's mailbox is closed.
    pub async fn send_to_next_worker(&self, message: Message) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let mut request = WorkRequest::Deliver { message };
        for _ in 0..self.workers.len() {
            let worker_idx = self.next_worker_index();
            match self.workers[worker_idx].send(request).await {
                Ok(()) => return Ok(()),
                Err(SendError(returned)) => {
                    tracing::debug!("Worker {worker_idx} mailbox closed, trying next");
                    request = returned;
                }
            }
        }

        Err(Error::ChannelError {
            context: format!("All {} worker mailboxes are closed", self.workers.len()),
        })
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] to refuse new work.
    /// - Sends a [`WorkRequest::Shutdown`] to each open worker.
    /// - Waits (up to the configured timeout per worker) for
    ///   acknowledgements.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Refusing new messages");
        self.shutdown_token.cancel();

        tracing::debug!("Notifying all workers to shut down");
        let mut shutdown_handles = Vec::with_capacity(self.workers.len());

        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if worker.send(WorkRequest::Shutdown { response: tx }).await.is_err() {
                tracing::debug!("Worker {i} already stopped");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        tracing::debug!(
            "Waiting for up to {:?} per worker for shutdown acknowledgements",
            self.shutdown_timeout
        );

        let shutdown_timeout = self.shutdown_timeout;
        let timeout_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(shutdown_timeout, rx).await {
                Ok(Ok(())) => {
                    tracing::trace!("Worker {i} shutdown acknowledged");
                }
                Ok(Err(e)) => {
                    tracing::error!("Worker {i} dropped its acknowledgement: {e}");
                }
                Err(_) => {
                    tracing::warn!("Worker {i} shutdown timed out");
                }
            }
        });

        futures::future::join_all(timeout_futures).await;

        tracing::info!("Worker pool shutdown complete");
        Ok(())
    }
}
