//! Error types for framing, decoding and the message service.
//!
//! - [`DecodeError`] describes why bytes could not be turned into an
//!   envelope. It is surfaced to the caller and never retried here.
//! - [`HandlerError`] is what a verticle returns when it fails to handle a
//!   message. Dispatch logs it and keeps the subscription alive.
//! - [`Error`] covers service-level failures between tasks and workers.
//!   Decode failures stay per-connection and never become an [`Error`].

pub type Result<T> = core::result::Result<T, Error>;

/// A failure raised by a verticle while handling one message.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a wire frame could not be decoded.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// The buffer ends before the header or the declared payload does.
    #[error("truncated frame: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// The declared payload length exceeds the configured limit.
    #[error("frame length {length} exceeds limit {limit}")]
    FrameTooLarge { length: usize, limit: usize },

    /// The payload is not a valid protobuf envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] prost::DecodeError),

    /// The underlying byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Whether the byte stream is still positioned on a frame boundary.
    ///
    /// Only a malformed payload leaves the stream usable: the whole frame was
    /// consumed before protobuf decoding failed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Unified error type for the message service.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Internal channel send/receive failure (e.g., closed or full channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}
