//! Signage Hub - the sign save pipeline
//!
//! The [`Hub`] owns the registry and runs every sign mutation through an
//! explicit, ordered pipeline: derived fields, conflict flags, phase mandates,
//! permission sync, cache invalidation, delayed artwork generation and
//! domain events.
//!
//! ```text
//! Hub
//!  ├── Registry (Arc<RwLock>)     records, single writer per save
//!  ├── InMemoryGrants             group permissions
//!  ├── RenderCache / Renderer     labels, message HTML, PNG artwork
//!  ├── ArtworkJobs                sign:generate_artwork after the settle delay
//!  └── EventBus                   tag sort, orphan position cleanup
//! ```

pub mod artwork;
mod config;
mod error;
mod hub;
pub mod jobs;

pub use artwork::{ArtworkConverter, ImageConverter};
pub use config::HubConfig;
pub use error::{Error, Result};
pub use hub::{Highlights, Hub, SaveReport};
pub use jobs::{ArtworkJobs, Job, JobReport};
