//! Frame service: accepts connections and feeds their envelopes to workers.
//!
//! ## Responsibilities
//!
//! - Spawn the verticle worker pool sharing one identifier generator.
//! - Split each connection's byte stream into frames with [`FrameCodec`].
//! - Skip frames whose payload is malformed; close the connection on
//!   oversized frames, truncation at EOF or I/O errors.
//! - Stop reading from every connection once shutdown begins.

use crate::server::{
    config::ServerConfig,
    pool::manager::WorkerPool,
    service::verticle::LogVerticle,
};
use core::future::Future;
use futures::{Stream, StreamExt};
use njall_core::{Error, FrameCodec, Generator, new_generator};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::Instrument;

/// Per-connection counters, returned when the connection ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Envelopes handed to the pool.
    pub delivered: u64,
    /// Frames skipped because their payload was malformed.
    pub skipped: u64,
}

/// Accepts connections and routes their envelopes to the worker pool.
#[derive(Clone)]
pub struct FrameService {
    config: ServerConfig,
    worker_pool: Arc<WorkerPool>,
    next_connection: Arc<AtomicU64>,
}

impl FrameService {
    /// Creates the service and spawns one [`LogVerticle`] worker per
    /// configured worker.
    pub fn new(config: ServerConfig) -> Self {
        let generator: Arc<Generator> = Arc::new(new_generator());
        let (worker_pool, _handles) = WorkerPool::spawn(
            config.num_workers,
            config.mailbox_size,
            config.shutdown_timeout,
            &generator,
            LogVerticle::new,
        );
        Self::with_pool(config, worker_pool)
    }

    /// Creates the service around an existing pool.
    pub fn with_pool(config: ServerConfig, worker_pool: WorkerPool) -> Self {
        Self {
            config,
            worker_pool: Arc::new(worker_pool),
            next_connection: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Accepts connections from `incoming` until `signal` resolves or the
    /// listener ends. Each connection is served on its own task.
    pub async fn serve_with_shutdown<I, IO, IE, F>(&self, incoming: I, signal: F)
    where
        I: Stream<Item = Result<IO, IE>>,
        IO: AsyncRead + Unpin + Send + 'static,
        IE: std::error::Error,
        F: Future<Output = ()>,
    {
        tokio::pin!(incoming);
        tokio::pin!(signal);

        loop {
            tokio::select! {
                () = &mut signal => break,
                conn = incoming.next() => match conn {
                    Some(Ok(io)) => {
                        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
                        let service = self.clone();
                        let span = tracing::info_span!("connection", id);
                        tokio::spawn(async move { service.handle_connection(io).await }.instrument(span));
                    }
                    Some(Err(e)) => tracing::warn!("Failed to accept connection: {e}"),
                    None => break,
                },
            }
        }
    }

    /// Reads frames from `io` until the peer closes, a fatal decode error
    /// occurs or shutdown begins.
    pub async fn handle_connection<IO>(&self, io: IO) -> ConnectionStats
    where
        IO: AsyncRead + Unpin,
    {
        let codec = FrameCodec::with_max_frame_len(self.config.max_frame_bytes);
        let mut frames = FramedRead::new(io, codec);
        let shutdown = self.worker_pool.shutdown_token().clone();
        let mut stats = ConnectionStats::default();

        tracing::debug!("Connection opened");
        loop {
            let frame = tokio::select! {
                () = shutdown.cancelled() => break,
                frame = frames.next() => frame,
            };

            let frame = match frame {
                None => break,
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::warn!("Closing connection: {e}");
                    break;
                }
            };

            let message = match frame.into_message() {
                Ok(message) => message,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Skipping frame: {e}");
                    stats.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Closing connection: {e}");
                    break;
                }
            };

            match self.worker_pool.send_to_next_worker(message).await {
                Ok(()) => stats.delivered += 1,
                Err(Error::ServiceShutdown) => break,
                Err(e) => {
                    tracing::error!("Dropping envelope: {e}");
                    break;
                }
            }
        }

        tracing::debug!(
            delivered = stats.delivered,
            skipped = stats.skipped,
            "Connection closed"
        );
        stats
    }

    /// Initiates a graceful shutdown of the worker pool.
    ///
    /// Open connections stop reading, and the call waits until each worker
    /// acknowledges termination or the timeout elapses.
    pub async fn shutdown(&self) -> njall_core::Result<()> {
        tracing::debug!(
            active_workers = self.worker_pool.active_workers(),
            "Shutting down frame service"
        );
        self.worker_pool.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::LogFormat;
    use bytes::{BufMut, BytesMut};
    use core::time::Duration;
    use njall_core::{
        HandlerResult, MessageResponse, SpanId, Verticle, WireCodec, proto::Message,
    };
    use tokio::{io::AsyncWriteExt, sync::mpsc};

    struct Forward(mpsc::UnboundedSender<Message>);

    impl Verticle for Forward {
        fn handle_message(&mut self, _span_id: SpanId, message: Message) -> HandlerResult {
            let _ = self.0.send(message);
            Ok(MessageResponse::Continue)
        }
    }

    fn config(max_frame_bytes: usize) -> ServerConfig {
        ServerConfig {
            server_addr: "127.0.0.1:0".to_owned(),
            uds: false,
            num_workers: 2,
            mailbox_size: 8,
            max_frame_bytes,
            shutdown_timeout: Duration::from_secs(1),
            log_format: LogFormat::Pretty,
        }
    }

    fn forwarding_service(max_frame_bytes: usize) -> (FrameService, mpsc::UnboundedReceiver<Message>) {
        let config = config(max_frame_bytes);
        let (tx, rx) = mpsc::unbounded_channel();
        let (pool, _handles) = WorkerPool::spawn(
            config.num_workers,
            config.mailbox_size,
            config.shutdown_timeout,
            &Arc::new(new_generator()),
            |_| Forward(tx.clone()),
        );
        (FrameService::with_pool(config, pool), rx)
    }

    fn named(name: &str) -> Message {
        Message {
            message_type: name.to_owned(),
            ..Message::default()
        }
    }

    fn malformed_frame(dst: &mut BytesMut) {
        dst.put_u16(WireCodec::WIRE_VERSION);
        dst.put_u32(3);
        dst.put_slice(&[0, 0, 0]);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let (service, mut delivered) = forwarding_service(1024);

        let mut wire = BytesMut::new();
        WireCodec.encode_into(&named("first"), &mut wire);
        malformed_frame(&mut wire);
        WireCodec.encode_into(&named("second"), &mut wire);

        let stats = service.handle_connection(&wire[..]).await;
        assert_eq!(
            stats,
            ConnectionStats {
                delivered: 2,
                skipped: 1
            }
        );

        let mut names = vec![
            delivered.recv().await.unwrap().message_type,
            delivered.recv().await.unwrap().message_type,
        ];
        names.sort();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn delivered_envelopes_carry_trace_context() {
        let (service, mut delivered) = forwarding_service(1024);
        let wire = WireCodec.encode(&named("traced"));

        service.handle_connection(&wire[..]).await;

        let message = delivered.recv().await.unwrap();
        let traceparent = message.traceparent.expect("resolved by dispatcher");
        assert_eq!(traceparent.trace_id.len(), 16);
        assert_eq!(traceparent.span_id, vec![0x11; 8]);
    }

    #[tokio::test]
    async fn oversized_frame_closes_connection() {
        let (service, mut delivered) = forwarding_service(16);

        let mut wire = BytesMut::new();
        WireCodec.encode_into(&named("ok"), &mut wire);
        wire.put_u16(WireCodec::WIRE_VERSION);
        wire.put_u32(17);
        wire.put_slice(&[0; 17]);
        WireCodec.encode_into(&named("never"), &mut wire);

        let stats = service.handle_connection(&wire[..]).await;
        assert_eq!(stats.delivered, 1);
        assert_eq!(delivered.recv().await.unwrap().message_type, "ok");
    }

    #[tokio::test]
    async fn truncated_stream_closes_connection() {
        let (service, _delivered) = forwarding_service(1024);
        let wire = WireCodec.encode(&named("cut"));

        let stats = service.handle_connection(&wire[..wire.len() - 1]).await;
        assert_eq!(stats, ConnectionStats::default());
    }

    #[tokio::test]
    async fn shutdown_stops_open_connections() {
        let (service, mut delivered) = forwarding_service(1024);
        let (mut client, server) = tokio::io::duplex(1024);

        let reader = {
            let service = service.clone();
            tokio::spawn(async move { service.handle_connection(server).await })
        };

        client
            .write_all(&WireCodec.encode(&named("before")))
            .await
            .unwrap();
        assert_eq!(delivered.recv().await.unwrap().message_type, "before");

        service.shutdown().await.unwrap();
        let stats = reader.await.unwrap();
        assert_eq!(stats.delivered, 1);
        drop(client);
    }

    #[tokio::test]
    async fn serve_stops_on_signal() {
        let (service, mut delivered) = forwarding_service(1024);
        let (mut client, server) = tokio::io::duplex(1024);
        let incoming = futures::stream::iter(vec![Ok::<_, std::io::Error>(server)]);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let serve = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .serve_with_shutdown(incoming.chain(futures::stream::pending()), async {
                        let _ = stop_rx.await;
                    })
                    .await;
            })
        };

        client
            .write_all(&WireCodec.encode(&named("served")))
            .await
            .unwrap();
        assert_eq!(delivered.recv().await.unwrap().message_type, "served");

        stop_tx.send(()).unwrap();
        serve.await.unwrap();
        service.shutdown().await.unwrap();
    }
}
