//! Trait surface for constructed instances.

mod dispose;
mod injectable;

pub use dispose::{AsyncDispose, Dispose};
pub use injectable::Injectable;
