/// A trait for random sources that return random integers.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests. The generator draws counter seeds and random tails
/// from it; the dispatch layer draws span identifiers from it.
///
/// # Example
/// ```
/// use njall::RandSource;
///
/// struct FixedRand;
/// impl RandSource<u64> for FixedRand {
///     fn rand(&self) -> u64 {
///         1234
///     }
/// }
///
/// let rng = FixedRand;
/// assert_eq!(rng.rand(), 1234);
/// ```
pub trait RandSource<T> {
    /// Returns a random integer.
    fn rand(&self) -> T;
}

impl<T, R> RandSource<T> for &R
where
    R: RandSource<T> + ?Sized,
{
    fn rand(&self) -> T {
        (**self).rand()
    }
}
