//! # Trace-correlated dispatch
//!
//! [`Dispatcher::dispatch`] wraps a single handler invocation:
//!
//! 1. Mint a fresh 8-byte [`SpanId`].
//! 2. Reuse the envelope's trace id, or derive one from a new identifier.
//! 3. Reuse the envelope's span id as the parent, or use [`SpanId::SENTINEL`].
//! 4. Bind the three ids into the [`AmbientContext`] and a `dispatch` tracing
//!    span, invoke the handler, then unbind on every exit path.
//!
//! Handler failures (errors and panics) are logged here and reported as
//! [`DispatchResult::Failed`]; they never reach the transport.

mod subscription;
#[cfg(test)]
mod tests;

pub use subscription::*;

use crate::{
    AmbientContext, HandlerError, Random,
    proto::{Message, Observability},
};
use core::fmt;
use njall::{IdGenerator, RandSource};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};
use tracing::{debug, error, info_span, warn};

/// An 8-byte span identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpanId([u8; 8]);

impl SpanId {
    /// Stand-in parent for messages that arrive without a span.
    pub const SENTINEL: Self = Self([0x11; 8]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Lowercase hex, 16 characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<[u8; 8]> for SpanId {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({self})")
    }
}

/// What a handler asks of its subscription after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageResponse {
    /// Keep delivering messages.
    Continue,
    /// Stop delivering messages to this subscription.
    Shutdown,
}

/// The result a handler returns for one message.
pub type HandlerResult = Result<MessageResponse, HandlerError>;

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// The handler succeeded and wants more messages.
    Continue,
    /// The handler asked to stop; deliver nothing further.
    Shutdown,
    /// The handler returned an error or panicked. The failure has been
    /// logged and the subscription stays active.
    Failed,
}

impl DispatchResult {
    #[must_use]
    pub const fn is_shutdown(self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

/// Resolves trace correlation around handler invocations.
///
/// Cheap to share: a dispatcher only holds the identifier generator (usually
/// an `Arc` shared by every verticle in the process) and a random source.
#[derive(Debug, Clone)]
pub struct Dispatcher<G, R = Random> {
    generator: G,
    rng: R,
}

impl<G> Dispatcher<G, Random>
where
    G: IdGenerator,
{
    /// Creates a dispatcher that draws span ids from the thread-local RNG.
    pub fn new(generator: G) -> Self {
        Self::with_rng(generator, Random::default())
    }
}

impl<G, R> Dispatcher<G, R>
where
    G: IdGenerator,
    R: RandSource<u64>,
{
    pub fn with_rng(generator: G, rng: R) -> Self {
        Self { generator, rng }
    }

    /// Invokes `handler` exactly once with a fresh span id and `message`
    /// carrying its resolved trace context.
    ///
    /// The ambient context and tracing span are active only while `handler`
    /// runs and are unbound before this returns, including when the handler
    /// fails or panics.
    pub fn dispatch<F>(&self, mut message: Message, handler: F) -> DispatchResult
    where
        F: FnOnce(SpanId, Message) -> HandlerResult,
    {
        let span_id = SpanId::from(self.rng.rand());
        let traceparent = self.resolve_traceparent(message.traceparent.take());

        let context = AmbientContext {
            trace_id: hex::encode(&traceparent.trace_id),
            parent_span_id: hex::encode(&traceparent.span_id),
            span_id: span_id.to_hex(),
        };
        message.traceparent = Some(traceparent);

        let span = info_span!(
            "dispatch",
            message_type = %message.message_type,
            trace_id = %context.trace_id,
            parent_span_id = %context.parent_span_id,
            span_id = %context.span_id,
        );
        let _entered = span.enter();
        let _guard = context.bind();

        match panic::catch_unwind(AssertUnwindSafe(|| handler(span_id, message))) {
            Ok(Ok(MessageResponse::Continue)) => DispatchResult::Continue,
            Ok(Ok(MessageResponse::Shutdown)) => {
                debug!("handler requested shutdown");
                DispatchResult::Shutdown
            }
            Ok(Err(err)) => {
                warn!(error = %err, "handler failed");
                DispatchResult::Failed
            }
            Err(payload) => {
                error!(panic = panic_message(payload.as_ref()), "handler panicked");
                DispatchResult::Failed
            }
        }
    }

    fn resolve_traceparent(&self, inbound: Option<Observability>) -> Observability {
        let mut traceparent = inbound.unwrap_or_default();
        if traceparent.trace_id.is_empty() {
            traceparent.trace_id = self.generator.next_id().to_bytes().to_vec();
        }
        if traceparent.span_id.is_empty() {
            traceparent.span_id = SpanId::SENTINEL.to_bytes().to_vec();
        }
        traceparent
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
