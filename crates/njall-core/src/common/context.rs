//! Thread-scoped trace correlation for the duration of one dispatch.
//!
//! The dispatcher binds an [`AmbientContext`] before invoking a handler and
//! the returned [`ContextGuard`] restores the previous binding when dropped,
//! whether the handler returns, fails or panics. Bindings are thread-local,
//! so a dispatch on one thread never observes another thread's context.
//!
//! # Example
//! ```rust
//! use njall_core::AmbientContext;
//!
//! let ctx = AmbientContext {
//!     trace_id: "0101".into(),
//!     parent_span_id: "1111111111111111".into(),
//!     span_id: "0202".into(),
//! };
//!
//! {
//!     let _guard = ctx.bind();
//!     assert_eq!(AmbientContext::get("trace_id").as_deref(), Some("0101"));
//! }
//! assert_eq!(AmbientContext::get("trace_id"), None);
//! ```

use core::{cell::RefCell, marker::PhantomData};

thread_local! {
    static CURRENT: RefCell<Option<AmbientContext>> = const { RefCell::new(None) };
}

/// The correlation identifiers of the message being handled, as lowercase
/// hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AmbientContext {
    pub trace_id: String,
    pub parent_span_id: String,
    pub span_id: String,
}

impl AmbientContext {
    pub const TRACE_ID: &'static str = "trace_id";
    pub const PARENT_SPAN_ID: &'static str = "parent_span_id";
    pub const SPAN_ID: &'static str = "span_id";

    /// The keys under which the identifiers are exposed.
    pub const KEYS: [&'static str; 3] = [Self::TRACE_ID, Self::PARENT_SPAN_ID, Self::SPAN_ID];

    /// Makes `self` the current context of this thread until the guard drops.
    #[must_use = "the context is unbound as soon as the guard is dropped"]
    pub fn bind(self) -> ContextGuard {
        let previous = CURRENT.with_borrow_mut(|current| current.replace(self));
        ContextGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// A copy of the context bound on this thread, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.with_borrow(Clone::clone)
    }

    /// Looks up one identifier of the current context by key.
    ///
    /// Returns `None` outside a dispatch or for an unknown key.
    #[must_use]
    pub fn get(key: &str) -> Option<String> {
        CURRENT.with_borrow(|current| {
            current
                .as_ref()
                .and_then(|ctx| ctx.field(key))
                .map(str::to_owned)
        })
    }

    /// Whether any context is bound on this thread.
    #[must_use]
    pub fn is_bound() -> bool {
        CURRENT.with_borrow(Option::is_some)
    }

    /// The identifier stored under `key`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            Self::TRACE_ID => Some(&self.trace_id),
            Self::PARENT_SPAN_ID => Some(&self.parent_span_id),
            Self::SPAN_ID => Some(&self.span_id),
            _ => None,
        }
    }
}

/// Restores the previously bound context when dropped.
///
/// Guards must be dropped on the thread that created them, in reverse order
/// of creation.
#[derive(Debug)]
pub struct ContextGuard {
    previous: Option<AmbientContext>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // `try_with` tolerates guards dropped during thread teardown.
        let _ = CURRENT.try_with(|current| *current.borrow_mut() = previous);
    }
}
