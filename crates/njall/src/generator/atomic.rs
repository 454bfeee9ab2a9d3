use core::cmp;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{IdGenStatus, IdGenerator, RandSource, TimeSource, Uuid};

const COUNTER_SEED_MIN: u16 = 3;
const COUNTER_SEED_MAX: u16 = 1024;

/// A lock-free *monotonic* generator of version 8 [`Uuid`]s.
///
/// The last issued `(timestamp, counter)` pair is packed into a single
/// [`AtomicU64`] as `(timestamp << 12) | counter`, so every caller agrees on
/// one linear history through compare-and-swap alone.
///
/// On each call:
/// - If the clock has moved past the stored timestamp, the counter is reseeded
///   with a random value in `[3, 1024)`.
/// - Otherwise (same millisecond, or the clock went backwards) the stored
///   timestamp is kept and the counter advances by [`Self::COUNTER_STEP`].
/// - If the step would overflow the 12-bit counter, the generator borrows the
///   next millisecond and reseeds, so identifiers stay strictly increasing.
///   A borrowed timestamp never leads the clock by more than
///   [`Self::MAX_CLOCK_LEAD_MS`]; past that the generator reports
///   [`IdGenStatus::Pending`] until the clock catches up.
///
/// The low 62 bits are drawn fresh from the random source on every call and
/// never participate in ordering.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Never fails; only spins while a millisecond's counter is exhausted
/// - ✅ Strictly increasing for every identifier issued by one generator
///
/// ## See Also
/// - [`uuid_v8`](crate::uuid_v8) for a process-wide instance
pub struct AtomicUuidGenerator<T, R>
where
    T: TimeSource<u64>,
    R: RandSource<u64>,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    time: T,
    rng: R,
}

impl<T, R> AtomicUuidGenerator<T, R>
where
    T: TimeSource<u64>,
    R: RandSource<u64>,
{
    /// Smallest counter value a fresh millisecond may start from.
    pub const COUNTER_SEED_MIN: u16 = COUNTER_SEED_MIN;
    /// Exclusive upper bound for a freshly seeded counter.
    pub const COUNTER_SEED_MAX: u16 = COUNTER_SEED_MAX;
    /// Amount the counter advances within a single millisecond.
    pub const COUNTER_STEP: u16 = 7;
    /// How far a borrowed timestamp may run ahead of the clock.
    pub const MAX_CLOCK_LEAD_MS: u64 = 1;

    /// Creates a new generator seeded from the current time and a random
    /// counter.
    ///
    /// # Example
    /// ```
    /// use njall::{AtomicUuidGenerator, MonotonicClock, ThreadRandom};
    ///
    /// let generator = AtomicUuidGenerator::new(MonotonicClock::default(), ThreadRandom);
    /// let a = generator.next_id();
    /// let b = generator.next_id();
    /// assert!(a < b);
    /// ```
    pub fn new(time: T, rng: R) -> Self {
        let timestamp = time.current_millis();
        let counter = seed_counter(&rng);
        Self::from_components(timestamp, counter, time, rng)
    }

    /// Creates a generator whose last issued state is `(timestamp, counter)`.
    ///
    /// Useful for restoring a generator or pinning its starting point in
    /// tests. Values wider than their fields are truncated.
    pub fn from_components(timestamp: u64, counter: u16, time: T, rng: R) -> Self {
        let state = pack(timestamp & Uuid::TIMESTAMP_MASK, counter & Uuid::COUNTER_MASK);
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(state),
            time,
            rng,
        }
    }

    /// Returns the `(timestamp, counter)` pair of the most recently issued
    /// identifier (or the seeded state if none was issued yet).
    pub fn last_state(&self) -> (u64, u16) {
        unpack(self.state.load(Ordering::Relaxed))
    }

    /// Generates a new identifier, retrying until the compare-and-swap
    /// succeeds and the clock permits another identifier.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Uuid {
        loop {
            match self.poll_id() {
                IdGenStatus::Ready { id } => break id,
                IdGenStatus::Pending => core::hint::spin_loop(),
            }
        }
    }

    /// Makes a single attempt to generate an identifier.
    ///
    /// Returns [`IdGenStatus::Pending`] when another caller advanced the
    /// generator between the load and the compare-and-swap, or when the
    /// counter is exhausted and borrowing another millisecond would lead the
    /// clock by more than [`Self::MAX_CLOCK_LEAD_MS`]. Either way the caller
    /// should retry.
    pub fn poll_id(&self) -> IdGenStatus {
        let now = self.time.current_millis() & Uuid::TIMESTAMP_MASK;

        let current = self.state.load(Ordering::Relaxed);
        let (last_ts, last_counter) = unpack(current);

        let (timestamp, counter) = match now.cmp(&last_ts) {
            cmp::Ordering::Greater => (now, seed_counter(&self.rng)),
            cmp::Ordering::Equal | cmp::Ordering::Less => {
                match last_counter.checked_add(Self::COUNTER_STEP) {
                    Some(next) if next <= Uuid::COUNTER_MASK => (last_ts, next),
                    _ => match Self::cold_counter_overflow(now, last_ts) {
                        Some(timestamp) => (timestamp, seed_counter(&self.rng)),
                        None => return IdGenStatus::Pending,
                    },
                }
            }
        };

        if self
            .state
            .compare_exchange(
                current,
                pack(timestamp, counter),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            IdGenStatus::Ready {
                id: Uuid::from_components(timestamp, counter, self.rng.rand()),
            }
        } else {
            IdGenStatus::Pending
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_counter_overflow(now: u64, last_ts: u64) -> Option<u64> {
        let borrowed = last_ts + 1;
        if borrowed > now.saturating_add(Self::MAX_CLOCK_LEAD_MS) {
            return None;
        }
        Some(borrowed & Uuid::TIMESTAMP_MASK)
    }
}

impl<T, R> IdGenerator for AtomicUuidGenerator<T, R>
where
    T: TimeSource<u64>,
    R: RandSource<u64>,
{
    fn next_id(&self) -> Uuid {
        self.next_id()
    }
}

impl<T, R> core::fmt::Debug for AtomicUuidGenerator<T, R>
where
    T: TimeSource<u64>,
    R: RandSource<u64>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (timestamp, counter) = self.last_state();
        f.debug_struct("AtomicUuidGenerator")
            .field("timestamp", &timestamp)
            .field("counter", &counter)
            .finish_non_exhaustive()
    }
}

fn seed_counter<R: RandSource<u64>>(rng: &R) -> u16 {
    const SPAN: u64 = (COUNTER_SEED_MAX - COUNTER_SEED_MIN) as u64;
    // Bounded by the seed span, so the narrowing is lossless.
    #[allow(clippy::cast_possible_truncation)]
    let offset = (rng.rand() % SPAN) as u16;
    COUNTER_SEED_MIN + offset
}

const fn pack(timestamp: u64, counter: u16) -> u64 {
    (timestamp << Uuid::COUNTER_BITS) | counter as u64
}

#[allow(clippy::cast_possible_truncation)]
const fn unpack(state: u64) -> (u64, u16) {
    (
        state >> Uuid::COUNTER_BITS,
        (state & Uuid::COUNTER_MASK as u64) as u16,
    )
}
