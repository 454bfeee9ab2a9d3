use njall_core::{HandlerResult, MessageResponse, SpanId, Verticle, proto::Message};

/// A verticle that logs every envelope it receives.
///
/// The log event is emitted inside the dispatcher's span, so it carries the
/// resolved `trace_id`, `parent_span_id` and `span_id`.
#[derive(Debug, Default)]
pub struct LogVerticle {
    worker_id: usize,
    handled: u64,
}

impl LogVerticle {
    pub const fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            handled: 0,
        }
    }

    pub const fn handled(&self) -> u64 {
        self.handled
    }
}

impl Verticle for LogVerticle {
    fn handle_message(&mut self, span_id: SpanId, message: Message) -> HandlerResult {
        self.handled += 1;

        let payload_bytes = message.message.as_ref().map_or(0, |any| any.value.len());

        tracing::info!(
            worker = self.worker_id,
            %span_id,
            message_type = %message.message_type,
            proto = message.proto_name().unwrap_or_default(),
            mime = message.mime_type().unwrap_or_default(),
            payload_bytes,
            handled = self.handled(),
            "received envelope"
        );

        Ok(MessageResponse::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use njall_core::{AmbientContext, DispatchResult, Dispatcher, new_generator};
    use std::sync::Arc;

    #[test]
    fn logs_and_continues() {
        let dispatcher = Dispatcher::new(Arc::new(new_generator()));
        let mut verticle = LogVerticle::new(7);

        for _ in 0..3 {
            let result = dispatcher.dispatch(Message::default(), |span_id, message| {
                assert!(AmbientContext::is_bound());
                verticle.handle_message(span_id, message)
            });
            assert_eq!(result, DispatchResult::Continue);
        }

        assert_eq!(verticle.handled(), 3);
    }
}
