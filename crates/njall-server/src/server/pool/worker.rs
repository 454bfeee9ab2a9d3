use crate::server::pool::request::WorkRequest;
use njall_core::{Generator, Subscription, Verticle};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Worker task that owns one [`Subscription`].
///
/// Processes [`WorkRequest`]s until one of:
///
/// - [`WorkRequest::Shutdown`] arrives (acknowledged, then the loop exits);
/// - the verticle answers `Shutdown` (the subscription closes and the worker
///   exits, which closes its mailbox so the pool stops routing to it);
/// - every sender is dropped.
///
/// Returns the subscription so callers can inspect the verticle.
pub async fn worker_loop<V>(
    worker_id: usize,
    mut rx: mpsc::Receiver<WorkRequest>,
    mut subscription: Subscription<V, Arc<Generator>>,
) -> Subscription<V, Arc<Generator>>
where
    V: Verticle,
{
    tracing::trace!("Worker {worker_id} started");

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Deliver { message } => {
                if subscription.deliver(message).is_some() && !subscription.is_active() {
                    tracing::info!("Worker {worker_id} verticle requested shutdown");
                    break;
                }
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
    subscription
}
