use crate::Uuid;

/// Represents the result of a single attempt to generate a new identifier.
///
/// This type models the outcome of
/// [`AtomicUuidGenerator::poll_id`](crate::AtomicUuidGenerator::poll_id):
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means another thread updated the generator
///   between the read and the compare-and-swap, or the counter is exhausted
///   and the clock must advance before another ID can be issued; retry.
///
/// This allows callers to choose their own spin or yield strategy.
///
/// # Example
///
/// ```
/// use njall::{AtomicUuidGenerator, IdGenStatus, MonotonicClock, ThreadRandom};
///
/// let generator = AtomicUuidGenerator::new(MonotonicClock::default(), ThreadRandom);
/// let id = loop {
///     match generator.poll_id() {
///         IdGenStatus::Ready { id } => break id,
///         IdGenStatus::Pending => std::thread::yield_now(),
///     }
/// };
/// assert!(id.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated identifier.
        id: Uuid,
    },
    /// The compare-and-swap lost a race with a concurrent caller, or the
    /// generator is waiting for the clock.
    Pending,
}
