//! Server-side components of the `njall` frame server.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration and validation.
//! - [`pool`] - Verticle workers and round-robin delivery.
//! - [`service`] - Connection handling and the logging verticle.
//! - [`telemetry`] - `tracing` subscriber initialization.

pub mod config;
pub mod pool;
pub mod service;
pub mod telemetry;
