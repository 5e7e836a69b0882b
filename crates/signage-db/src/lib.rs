//! Signage DB - Database layer using native_db
//!
//! Provides persistent storage for:
//! - The registry (every record, one bincode snapshot)
//! - Group grants
//! - Per-sign rows indexed by zone

mod error;
mod models;
mod queries;
mod store;

pub use error::{Error, Result};
pub use store::Store;
