mod codec;
mod context;
mod dispatch;
mod error;
pub mod proto;
mod types;

pub use codec::*;
pub use context::*;
pub use dispatch::*;
pub use error::*;
pub use types::*;
