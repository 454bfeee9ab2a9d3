#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can access `njall` via
// `njall_core::njall`
pub use njall;
