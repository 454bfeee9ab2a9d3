mod interface;
#[cfg(feature = "std")]
mod mono_clock;

pub use interface::*;
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
#[cfg(feature = "std")]
pub use mono_clock::*;
