//! Process-wide identifier generation.
//!
//! Provides a lazily constructed generator shared by every thread in the
//! process, for callers that have no generator wired in.
//!
//! # Example
//! ```rust
//! let a = njall::uuid_v8();
//! let b = njall::uuid_v8();
//! assert!(a < b);
//! ```

use crate::{AtomicUuidGenerator, MonotonicClock, ThreadRandom, UNIX_EPOCH, Uuid};
use std::sync::LazyLock;

/// The process-wide generator, anchored to the Unix epoch.
static GLOBAL_GENERATOR: LazyLock<AtomicUuidGenerator<MonotonicClock, ThreadRandom>> =
    LazyLock::new(|| {
        AtomicUuidGenerator::new(MonotonicClock::with_epoch(UNIX_EPOCH), ThreadRandom)
    });

/// Generates an identifier from the process-wide generator.
///
/// Identifiers returned by successive calls are strictly increasing across
/// the whole process.
#[must_use]
pub fn uuid_v8() -> Uuid {
    GLOBAL_GENERATOR.next_id()
}
