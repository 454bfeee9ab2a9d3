use super::*;
use crate::{AmbientContext, Generator, new_generator};
use njall::Uuid;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct FixedGenerator(Uuid);

impl IdGenerator for FixedGenerator {
    fn next_id(&self) -> Uuid {
        self.0
    }
}

struct MockRand {
    rand: u64,
}

impl RandSource<u64> for MockRand {
    fn rand(&self) -> u64 {
        self.rand
    }
}

const FIXED_TRACE: u128 = 0x1234_5678_1234_1234_1234_1234_5678_9abc;

fn fixed_dispatcher() -> Dispatcher<FixedGenerator, MockRand> {
    Dispatcher::with_rng(
        FixedGenerator(Uuid::from_raw(FIXED_TRACE)),
        MockRand {
            rand: 0x0102_0304_0506_0708,
        },
    )
}

fn traced(trace_id: Vec<u8>, span_id: Vec<u8>) -> Message {
    Message {
        message_type: "test".to_owned(),
        traceparent: Some(Observability { trace_id, span_id }),
        ..Message::default()
    }
}

/// What the handler saw while it ran.
#[derive(Debug, Default, Clone)]
struct Observed {
    span_id: Option<SpanId>,
    context: Option<AmbientContext>,
    traceparent: Option<Observability>,
}

fn observe(seen: &mut Observed) -> impl FnOnce(SpanId, Message) -> HandlerResult + '_ {
    move |span_id, message| {
        seen.span_id = Some(span_id);
        seen.context = AmbientContext::current();
        seen.traceparent = message.traceparent;
        Ok(MessageResponse::Continue)
    }
}

#[test]
fn span_id_renders_as_lowercase_hex() {
    assert_eq!(SpanId::from(0x0102_0304_0506_0708).to_string(), "0102030405060708");
    assert_eq!(SpanId::SENTINEL.to_hex(), "1111111111111111");
    assert_eq!(
        format!("{:?}", SpanId::from([0xab; 8])),
        "SpanId(abababababababab)"
    );
}

#[test]
fn span_id_display_matches_hex_form() {
    for span in [
        SpanId::default(),
        SpanId::SENTINEL,
        SpanId::from(u64::MAX),
        SpanId::from(0xfe),
    ] {
        assert_eq!(span.to_string(), span.to_hex());
        assert_eq!(span.to_string().len(), 16);
    }
}

#[test]
fn missing_trace_context_is_minted() {
    let dispatcher = fixed_dispatcher();
    let mut seen = Observed::default();

    let result = dispatcher.dispatch(Message::default(), observe(&mut seen));

    assert_eq!(result, DispatchResult::Continue);
    let context = seen.context.expect("context bound during handler");
    assert_eq!(context.trace_id, "12345678123412341234123456789abc");
    assert_eq!(context.parent_span_id, "1111111111111111");
    assert_eq!(context.span_id, "0102030405060708");
    assert_eq!(seen.span_id, Some(SpanId::from(0x0102_0304_0506_0708)));

    for key in AmbientContext::KEYS {
        assert_eq!(AmbientContext::get(key), None, "{key} leaked");
    }
}

#[test]
fn empty_trace_fields_are_minted() {
    let dispatcher = fixed_dispatcher();
    let mut seen = Observed::default();

    dispatcher.dispatch(traced(Vec::new(), Vec::new()), observe(&mut seen));

    let traceparent = seen.traceparent.expect("traceparent set");
    assert_eq!(
        traceparent.trace_id,
        Uuid::from_raw(FIXED_TRACE).to_bytes().to_vec()
    );
    assert_eq!(traceparent.span_id, vec![0x11; 8]);
    assert_eq!(
        seen.context.map(|c| c.parent_span_id).as_deref(),
        Some("1111111111111111")
    );
    assert!(!AmbientContext::is_bound());
}

#[test]
fn inbound_trace_context_is_reused() {
    let dispatcher = Dispatcher::with_rng(
        FixedGenerator(Uuid::NIL),
        MockRand {
            rand: 0x0303_0303_0303_0303,
        },
    );
    let mut seen = Observed::default();

    dispatcher.dispatch(traced(vec![0x01; 16], vec![0x02; 8]), observe(&mut seen));

    let context = seen.context.expect("context bound during handler");
    assert_eq!(context.trace_id, "01010101010101010101010101010101");
    assert_eq!(context.parent_span_id, "0202020202020202");
    assert_eq!(context.span_id, "0303030303030303");
    assert_ne!(context.span_id, context.parent_span_id);

    let traceparent = seen.traceparent.expect("traceparent set");
    assert_eq!(traceparent.trace_id, vec![0x01; 16]);
    assert_eq!(traceparent.span_id, vec![0x02; 8]);
}

#[test]
fn trace_and_span_resolve_independently() {
    let dispatcher = fixed_dispatcher();

    let mut seen = Observed::default();
    dispatcher.dispatch(traced(vec![0xaa; 16], Vec::new()), observe(&mut seen));
    let context = seen.context.expect("bound");
    assert_eq!(context.trace_id, "aa".repeat(16));
    assert_eq!(context.parent_span_id, "1111111111111111");

    let mut seen = Observed::default();
    dispatcher.dispatch(traced(Vec::new(), vec![0xbb; 8]), observe(&mut seen));
    let context = seen.context.expect("bound");
    assert_eq!(context.trace_id, "12345678123412341234123456789abc");
    assert_eq!(context.parent_span_id, "bb".repeat(8));
}

#[test]
fn fresh_span_minted_for_every_dispatch() {
    let dispatcher = Dispatcher::new(Arc::new(new_generator()));
    let mut spans = Vec::new();
    for _ in 0..64 {
        let mut seen = Observed::default();
        dispatcher.dispatch(traced(vec![0x01; 16], vec![0x02; 8]), observe(&mut seen));
        spans.push(seen.span_id.expect("span id"));
    }
    spans.sort();
    spans.dedup();
    assert_eq!(spans.len(), 64);
}

#[test]
fn fresh_trace_ids_come_from_the_generator() {
    let generator: Arc<Generator> = Arc::new(new_generator());
    let dispatcher = Dispatcher::new(Arc::clone(&generator));

    let mut traces = Vec::new();
    for _ in 0..2 {
        let mut seen = Observed::default();
        dispatcher.dispatch(Message::default(), observe(&mut seen));
        let bytes: [u8; 16] = seen.traceparent.expect("set").trace_id.try_into().unwrap();
        traces.push(Uuid::from_bytes(bytes));
    }

    assert!(traces.iter().all(Uuid::is_valid));
    assert!(traces[0] < traces[1]);
}

#[test]
fn handler_error_is_contained_and_context_cleared() {
    let dispatcher = fixed_dispatcher();

    let result = dispatcher.dispatch(Message::default(), |_, _| {
        assert!(AmbientContext::is_bound());
        Err("boom".into())
    });
    assert_eq!(result, DispatchResult::Failed);
    assert!(!AmbientContext::is_bound());

    let mut seen = Observed::default();
    let result = dispatcher.dispatch(Message::default(), observe(&mut seen));
    assert_eq!(result, DispatchResult::Continue);
    assert!(seen.context.is_some());
    assert!(!AmbientContext::is_bound());
}

#[test]
fn handler_panic_is_contained_and_context_cleared() {
    let dispatcher = fixed_dispatcher();

    let result = dispatcher.dispatch(Message::default(), |_, _| panic!("handler exploded"));
    assert_eq!(result, DispatchResult::Failed);
    assert!(!AmbientContext::is_bound());

    let result = dispatcher.dispatch(Message::default(), |_, _| Ok(MessageResponse::Continue));
    assert_eq!(result, DispatchResult::Continue);
}

#[test]
fn outer_context_is_restored_after_dispatch() {
    let outer = AmbientContext {
        trace_id: "outer".to_owned(),
        ..AmbientContext::default()
    };
    let _guard = outer.clone().bind();

    fixed_dispatcher().dispatch(Message::default(), |_, _| {
        assert_ne!(AmbientContext::current().as_ref(), Some(&outer));
        Ok(MessageResponse::Continue)
    });

    assert_eq!(AmbientContext::current(), Some(outer));
}

#[test]
fn concurrent_dispatches_see_only_their_own_context() {
    let dispatcher = Dispatcher::new(Arc::new(new_generator()));

    std::thread::scope(|s| {
        for i in 0u8..8 {
            let dispatcher = &dispatcher;
            s.spawn(move || {
                for _ in 0..100 {
                    let trace = vec![i; 16];
                    let expected = hex::encode(&trace);
                    dispatcher.dispatch(traced(trace, vec![i; 8]), |_, _| {
                        std::thread::yield_now();
                        assert_eq!(AmbientContext::get("trace_id"), Some(expected.clone()));
                        Ok(MessageResponse::Continue)
                    });
                    assert!(!AmbientContext::is_bound());
                }
            });
        }
    });
}

#[test]
fn shutdown_stops_delivery() {
    let mut calls = 0;
    let verticle = verticle_fn(|_, _| {
        calls += 1;
        Ok(MessageResponse::Shutdown)
    });
    let mut subscription = Subscription::new("test", verticle, fixed_dispatcher());

    assert_eq!(
        subscription.deliver(Message::default()),
        Some(DispatchResult::Shutdown)
    );
    assert!(!subscription.is_active());
    assert_eq!(subscription.deliver(Message::default()), None);

    drop(subscription);
    assert_eq!(calls, 1);
}

#[test]
fn failures_keep_subscription_active() {
    let mut calls = 0;
    let verticle = verticle_fn(|_, message: Message| {
        calls += 1;
        if message.message_type == "bad" {
            return Err("rejected".into());
        }
        Ok(MessageResponse::Continue)
    });
    let mut subscription = Subscription::new("test", verticle, fixed_dispatcher());

    let bad = Message {
        message_type: "bad".to_owned(),
        ..Message::default()
    };
    assert_eq!(subscription.deliver(bad), Some(DispatchResult::Failed));
    assert!(subscription.is_active());
    assert_eq!(
        subscription.deliver(Message::default()),
        Some(DispatchResult::Continue)
    );

    drop(subscription);
    assert_eq!(calls, 2);
}

/// Counts messages and shuts down on the one named `"stop"`.
#[derive(Debug, Default)]
struct CountingVerticle {
    handled: Vec<String>,
}

impl Verticle for CountingVerticle {
    fn handle_message(&mut self, _span_id: SpanId, message: Message) -> HandlerResult {
        let stop = message.message_type == "stop";
        self.handled.push(message.message_type);
        Ok(if stop {
            MessageResponse::Shutdown
        } else {
            MessageResponse::Continue
        })
    }
}

fn named(name: &str) -> Message {
    Message {
        message_type: name.to_owned(),
        ..Message::default()
    }
}

#[tokio::test]
async fn run_stops_at_shutdown() {
    let (tx, rx) = mpsc::channel(8);
    for name in ["a", "stop", "never"] {
        tx.send(named(name)).await.unwrap();
    }

    let subscription = Subscription::new(
        "mailbox",
        CountingVerticle::default(),
        Dispatcher::new(Arc::new(new_generator())),
    );
    let subscription = subscription.run(rx).await;

    assert!(!subscription.is_active());
    assert_eq!(subscription.verticle().handled, vec!["a", "stop"]);
    assert!(tx.send(named("late")).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_ends_when_senders_drop() {
    let (tx, rx) = mpsc::channel(8);
    let subscription = Subscription::new(
        "mailbox",
        CountingVerticle::default(),
        Dispatcher::new(Arc::new(new_generator())),
    );
    let handle = tokio::spawn(subscription.run(rx));

    for name in ["a", "b", "c"] {
        tx.send(named(name)).await.unwrap();
    }
    drop(tx);

    let subscription = handle.await.unwrap();
    assert!(subscription.is_active());
    assert_eq!(subscription.into_verticle().handled, vec!["a", "b", "c"]);
}

#[test]
fn verticles_compose_through_references() {
    let seen = Mutex::new(Vec::new());
    let mut inner = verticle_fn(|span_id, _| {
        seen.lock().unwrap().push(span_id);
        Ok(MessageResponse::Continue)
    });
    let mut boxed: Box<dyn Verticle + '_> = Box::new(&mut inner);

    let mut subscription = Subscription::new("ref", &mut boxed, fixed_dispatcher());
    subscription.deliver(Message::default());
    drop(subscription);
    drop(boxed);
    drop(inner);

    assert_eq!(
        seen.into_inner().unwrap(),
        vec![SpanId::from(0x0102_0304_0506_0708)]
    );
}
