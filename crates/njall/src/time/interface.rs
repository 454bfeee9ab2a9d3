use core::time::Duration;

/// Standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC.
///
/// Identifier timestamps are milliseconds since this epoch.
pub const UNIX_EPOCH: Duration = Duration::from_millis(0);

/// A trait for time sources that return a monotonic or wall-clock timestamp.
///
/// This abstraction allows you to plug in a real system clock, a monotonic
/// timer, or a mocked time source in tests.
///
/// The timestamp type `T` is generic (the generator uses `u64`), and the unit
/// is expected to be **milliseconds** relative to a configurable origin.
///
/// # Example
///
/// ```
/// use njall::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource<u64> for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource<T> {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> T;
}

impl<T, S> TimeSource<T> for &S
where
    S: TimeSource<T> + ?Sized,
{
    fn current_millis(&self) -> T {
        (**self).current_millis()
    }
}
