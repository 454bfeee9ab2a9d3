use njall_core::proto::Message;
use tokio::sync::oneshot;

/// A unit of work for a verticle worker.
#[derive(Debug)]
pub enum WorkRequest {
    /// Deliver a decoded envelope to the worker's subscription.
    Deliver { message: Message },
    /// Stop the worker and acknowledge on `response`.
    Shutdown { response: oneshot::Sender<()> },
}
