//! Verticle workers and the pool that feeds them.
//!
//! - [`request`] - Messages sent from connections to workers.
//! - [`worker`] - The per-worker delivery loop.
//! - [`manager`] - Round-robin routing and coordinated shutdown.

pub mod manager;
pub mod request;
pub mod worker;
