use super::{DispatchResult, Dispatcher, HandlerResult, SpanId};
use crate::{Random, proto::Message};
use njall::{IdGenerator, RandSource};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// A message-driven unit of execution.
pub trait Verticle {
    /// Handles one message. `span_id` identifies this handling; `message`
    /// carries the resolved trace context.
    ///
    /// # Errors
    ///
    /// Any error is logged by the dispatcher and does not end the
    /// subscription. Return [`MessageResponse::Shutdown`](super::MessageResponse::Shutdown)
    /// to stop receiving messages.
    fn handle_message(&mut self, span_id: SpanId, message: Message) -> HandlerResult;
}

impl<V> Verticle for &mut V
where
    V: Verticle + ?Sized,
{
    fn handle_message(&mut self, span_id: SpanId, message: Message) -> HandlerResult {
        (**self).handle_message(span_id, message)
    }
}

impl<V> Verticle for Box<V>
where
    V: Verticle + ?Sized,
{
    fn handle_message(&mut self, span_id: SpanId, message: Message) -> HandlerResult {
        (**self).handle_message(span_id, message)
    }
}

/// A [`Verticle`] backed by a closure. See [`verticle_fn`].
#[derive(Debug, Clone)]
pub struct VerticleFn<F>(F);

/// Adapts a closure into a [`Verticle`].
///
/// # Example
/// ```rust
/// use njall_core::{MessageResponse, Verticle, proto::Message, verticle_fn};
///
/// let mut seen = 0;
/// let mut verticle = verticle_fn(|_span, _message| {
///     seen += 1;
///     Ok(MessageResponse::Continue)
/// });
/// verticle
///     .handle_message(Default::default(), Message::default())
///     .unwrap();
/// drop(verticle);
/// assert_eq!(seen, 1);
/// ```
pub fn verticle_fn<F>(f: F) -> VerticleFn<F>
where
    F: FnMut(SpanId, Message) -> HandlerResult,
{
    VerticleFn(f)
}

impl<F> Verticle for VerticleFn<F>
where
    F: FnMut(SpanId, Message) -> HandlerResult,
{
    fn handle_message(&mut self, span_id: SpanId, message: Message) -> HandlerResult {
        (self.0)(span_id, message)
    }
}

/// A verticle registered on a channel.
///
/// Every delivery goes through the [`Dispatcher`]. Once the verticle answers
/// [`MessageResponse::Shutdown`](super::MessageResponse::Shutdown) the
/// subscription closes and never invokes it again.
#[derive(Debug)]
pub struct Subscription<V, G, R = Random> {
    channel: String,
    verticle: V,
    dispatcher: Dispatcher<G, R>,
    active: bool,
}

impl<V, G, R> Subscription<V, G, R>
where
    V: Verticle,
    G: IdGenerator,
    R: RandSource<u64>,
{
    pub fn new(channel: impl Into<String>, verticle: V, dispatcher: Dispatcher<G, R>) -> Self {
        Self {
            channel: channel.into(),
            verticle,
            dispatcher,
            active: true,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Dispatches `message` to the verticle.
    ///
    /// Returns `None` without invoking the verticle once the subscription has
    /// closed.
    pub fn deliver(&mut self, message: Message) -> Option<DispatchResult> {
        if !self.active {
            trace!(channel = %self.channel, "dropping message for closed subscription");
            return None;
        }

        let verticle = &mut self.verticle;
        let result = self
            .dispatcher
            .dispatch(message, |span_id, message| verticle.handle_message(span_id, message));

        if result.is_shutdown() {
            self.active = false;
            info!(channel = %self.channel, "subscription closed by verticle");
        }
        Some(result)
    }

    /// Delivers messages from `mailbox` until the verticle shuts down or every
    /// sender is dropped, then returns the subscription.
    ///
    /// Messages still queued after a shutdown are never delivered.
    pub async fn run(mut self, mut mailbox: mpsc::Receiver<Message>) -> Self {
        while let Some(message) = mailbox.recv().await {
            if let Some(DispatchResult::Shutdown) = self.deliver(message) {
                mailbox.close();
                break;
            }
        }
        debug!(channel = %self.channel, active = self.active, "mailbox drained");
        self
    }

    pub fn verticle(&self) -> &V {
        &self.verticle
    }

    pub fn into_verticle(self) -> V {
        self.verticle
    }
}
