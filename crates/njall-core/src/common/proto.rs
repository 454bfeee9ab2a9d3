//! Protobuf schema of the message envelope exchanged between verticles.
//!
//! The types are declared with `prost` derives rather than generated at build
//! time, so no `protoc` is needed to build the workspace. Field numbers are
//! part of the wire contract and must not change.
//!
//! ```text
//! message Message {
//!   string message_type = 1;
//!   Observability traceparent = 2;
//!   oneof descriptor {
//!     ProtoDef proto = 3;
//!     MimeType mime = 4;
//!   }
//!   google.protobuf.Any message = 5;
//! }
//! ```

/// The envelope: an opaque payload plus routing and correlation metadata.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    /// Application-level name of the message.
    #[prost(string, tag = "1")]
    pub message_type: ::prost::alloc::string::String,
    /// Trace correlation carried across hops.
    #[prost(message, optional, tag = "2")]
    pub traceparent: ::core::option::Option<Observability>,
    /// How to interpret the payload.
    #[prost(oneof = "message::Descriptor", tags = "3, 4")]
    pub descriptor: ::core::option::Option<message::Descriptor>,
    /// The payload.
    #[prost(message, optional, tag = "5")]
    pub message: ::core::option::Option<::prost_types::Any>,
}

/// Nested types for [`Message`].
pub mod message {
    /// Type descriptor for the payload.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Descriptor {
        /// The payload is a protobuf message with the given type name.
        #[prost(message, tag = "3")]
        Proto(super::ProtoDef),
        /// The payload is opaque data of the given media type.
        #[prost(message, tag = "4")]
        Mime(super::MimeType),
    }
}

/// Trace context: a 16-byte trace id and the 8-byte id of the sending span.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Observability {
    #[prost(bytes = "vec", tag = "1")]
    pub trace_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub span_id: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDef {
    #[prost(string, tag = "1")]
    pub protobuf_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MimeType {
    #[prost(string, tag = "1")]
    pub r#type: ::prost::alloc::string::String,
}

impl Message {
    /// The protobuf type name of the payload, if the envelope declares one.
    pub fn proto_name(&self) -> Option<&str> {
        match &self.descriptor {
            Some(message::Descriptor::Proto(def)) => Some(&def.protobuf_name),
            _ => None,
        }
    }

    /// The media type of the payload, if the envelope declares one.
    pub fn mime_type(&self) -> Option<&str> {
        match &self.descriptor {
            Some(message::Descriptor::Mime(mime)) => Some(&mime.r#type),
            _ => None,
        }
    }
}
