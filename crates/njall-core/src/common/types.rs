//! # Shared Identifier Types and Constants
//!
//! The concrete clock, random source and generator every verticle in a
//! process shares. Keeping them in one place fixes the identifier layout and
//! its epoch for all components that mint trace identifiers.

use njall::{AtomicUuidGenerator, MonotonicClock, ThreadRandom, UNIX_EPOCH};

/// The system clock used by the generator for timestamp embedding.
pub type Clock = MonotonicClock;

/// The random source used for counter seeds, random tails and span ids.
pub type Random = ThreadRandom;

/// The epoch identifier timestamps count from.
///
/// Version 8 identifiers embed Unix milliseconds, so this is the Unix epoch.
pub const EPOCH: core::time::Duration = UNIX_EPOCH;

/// The generator shared (behind an `Arc`) by every dispatcher in a process.
pub type Generator = AtomicUuidGenerator<Clock, Random>;

/// Builds a [`Generator`] anchored at [`EPOCH`].
#[must_use]
pub fn new_generator() -> Generator {
    Generator::new(Clock::with_epoch(EPOCH), Random::default())
}
