use crate::Uuid;

/// A minimal interface for generating identifiers.
///
/// This is the seam consumers (such as the dispatch layer) depend on, so a
/// fixed or scripted generator can be substituted in tests.
///
/// # Example
///
/// ```
/// use njall::{IdGenerator, Uuid};
///
/// struct FixedId;
/// impl IdGenerator for FixedId {
///     fn next_id(&self) -> Uuid {
///         Uuid::from_components(1, 2, 3)
///     }
/// }
///
/// assert_eq!(FixedId.next_id().timestamp(), 1);
/// ```
pub trait IdGenerator {
    /// Returns the next identifier. Generation never fails.
    fn next_id(&self) -> Uuid;
}

impl<G> IdGenerator for &G
where
    G: IdGenerator + ?Sized,
{
    fn next_id(&self) -> Uuid {
        (**self).next_id()
    }
}

#[cfg(feature = "std")]
impl<G> IdGenerator for std::sync::Arc<G>
where
    G: IdGenerator + ?Sized,
{
    fn next_id(&self) -> Uuid {
        (**self).next_id()
    }
}

#[cfg(feature = "std")]
impl<G> IdGenerator for Box<G>
where
    G: IdGenerator + ?Sized,
{
    fn next_id(&self) -> Uuid {
        (**self).next_id()
    }
}
