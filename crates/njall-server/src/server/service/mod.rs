//! Connection handling and the verticle that consumes envelopes.
//!
//! ## Structure
//!
//! - [`handler`] - Accept loop and per-connection frame reading
//!   (`FrameService`).
//! - [`verticle`] - `LogVerticle`, which logs each envelope.

pub mod handler;
pub mod verticle;
