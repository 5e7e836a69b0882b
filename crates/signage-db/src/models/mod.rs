//! Database models.

mod registry;
mod sign;

pub use registry::*;
pub use sign::*;
