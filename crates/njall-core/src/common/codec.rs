//! # Wire Codec
//!
//! Envelopes travel as versioned, length-prefixed frames:
//!
//! ```text
//! +----------------+------------------+---------------------------+
//! | version: u16   | length: u32      | payload: [u8; length]     |
//! | big-endian     | big-endian       | protobuf `Message`        |
//! +----------------+------------------+---------------------------+
//! ```
//!
//! There is no checksum, and the version is written but not checked on
//! decode. Decoding qualifies a [`ProtoDef`](crate::proto::ProtoDef) type name
//! with [`WireCodec::TYPE_NAMESPACE`], so `decode(encode(m))` differs from `m`
//! by that prefix. Local delivery skips the wire and therefore the prefix (see
//! [`WireCodec::transform`]).
//!
//! [`WireCodec`] works on whole buffers. [`FrameCodec`] splits a byte stream
//! into frames for use with `tokio_util::codec::{FramedRead, FramedWrite}`.

use crate::{
    DecodeError,
    proto::{Message, message::Descriptor},
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message as _;
use tokio_util::codec::{Decoder, Encoder};

/// Encodes and decodes envelopes as single wire frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCodec;

impl WireCodec {
    /// Registry name of this codec.
    pub const NAME: &'static str = "protobuf";

    /// Version written into every frame header.
    pub const WIRE_VERSION: u16 = 0x0001;

    /// Size of the `version | length` header in bytes.
    pub const HEADER_LEN: usize = 6;

    /// Prefix added to protobuf type names on decode.
    pub const TYPE_NAMESPACE: &'static str = "com.larpconnect.njall.proto.";

    #[must_use]
    pub const fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Encodes `message` into a new frame.
    #[must_use]
    pub fn encode(&self, message: &Message) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode_into(message, &mut dst);
        dst.freeze()
    }

    /// Appends the frame for `message` to `dst`.
    pub fn encode_into(&self, message: &Message, dst: &mut BytesMut) {
        let payload = message.encode_to_vec();
        debug_assert!(u32::try_from(payload.len()).is_ok());
        dst.reserve(Self::HEADER_LEN + payload.len());
        dst.put_u16(Self::WIRE_VERSION);
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);
    }

    /// Decodes one frame from the start of `src`.
    ///
    /// Bytes after the declared payload are ignored.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Truncated`] if `src` is shorter than the header or
    ///   than the declared payload.
    /// - [`DecodeError::Malformed`] if the payload is not a valid envelope.
    pub fn decode(&self, src: &[u8]) -> Result<Message, DecodeError> {
        let header = read_header(src).ok_or(DecodeError::Truncated {
            needed: Self::HEADER_LEN,
            available: src.len(),
        })?;
        let end = Self::HEADER_LEN.saturating_add(header.length);
        let payload = src
            .get(Self::HEADER_LEN..end)
            .ok_or(DecodeError::Truncated {
                needed: end,
                available: src.len(),
            })?;
        self.decode_payload(payload)
    }

    /// Decodes a frame payload (the bytes after the header).
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if the payload is not a valid
    /// envelope.
    pub fn decode_payload(&self, payload: &[u8]) -> Result<Message, DecodeError> {
        let mut message = Message::decode(payload)?;
        qualify_type_name(&mut message);
        Ok(message)
    }

    /// Delivers an envelope to a co-located consumer.
    ///
    /// No wire hop happens, so the envelope is handed over untouched.
    #[must_use]
    pub const fn transform<'a>(&self, message: &'a Message) -> &'a Message {
        message
    }
}

fn qualify_type_name(message: &mut Message) {
    if let Some(Descriptor::Proto(def)) = &mut message.descriptor {
        def.protobuf_name.insert_str(0, WireCodec::TYPE_NAMESPACE);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    version: u16,
    length: usize,
}

fn read_header(src: &[u8]) -> Option<Header> {
    let header = src.get(..WireCodec::HEADER_LEN)?;
    let version = u16::from_be_bytes([header[0], header[1]]);
    let length = u32::from_be_bytes([header[2], header[3], header[4], header[5]]);
    Some(Header {
        version,
        length: length as usize,
    })
}

/// One frame split off a byte stream, payload not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The version from the frame header.
    pub version: u16,
    /// The protobuf payload.
    pub payload: Bytes,
}

impl Frame {
    /// Decodes the payload into an envelope, qualifying its type name.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if the payload is not a valid
    /// envelope. The stream the frame came from stays usable.
    pub fn into_message(self) -> Result<Message, DecodeError> {
        WireCodec.decode_payload(&self.payload)
    }
}

/// Stream framing for [`WireCodec`] frames.
///
/// The decoder yields [`Frame`]s and waits for more input on partial frames.
/// Declared lengths above the configured maximum are rejected before any
/// payload is buffered. The encoder writes envelopes as frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    /// Default payload limit: 4 MiB.
    pub const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_frame_len(Self::DEFAULT_MAX_FRAME_LEN)
    }

    /// Creates a codec that rejects payloads longer than `max_frame_len`.
    #[must_use]
    pub const fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    #[must_use]
    pub const fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, DecodeError> {
        let Some(header) = read_header(src) else {
            return Ok(None);
        };
        if header.length > self.max_frame_len {
            return Err(DecodeError::FrameTooLarge {
                length: header.length,
                limit: self.max_frame_len,
            });
        }

        let frame_len = WireCodec::HEADER_LEN + header.length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(WireCodec::HEADER_LEN);
        let payload = src.split_to(header.length).freeze();
        Ok(Some(Frame {
            version: header.version,
            payload,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, DecodeError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                let needed = read_header(src)
                    .map_or(WireCodec::HEADER_LEN, |h| WireCodec::HEADER_LEN + h.length);
                Err(DecodeError::Truncated {
                    needed,
                    available: src.len(),
                })
            }
        }
    }
}

impl Encoder<&Message> for FrameCodec {
    type Error = DecodeError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), DecodeError> {
        WireCodec.encode_into(item, dst);
        Ok(())
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = DecodeError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), DecodeError> {
        WireCodec.encode_into(&item, dst);
        Ok(())
    }
}
