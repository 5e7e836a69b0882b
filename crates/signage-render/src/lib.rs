//! Signage Render - sign artwork generation
//!
//! - [`RenderInput`] captures what a render needs from the registry
//! - [`ArtworkRenderer`] decides between remote expansion and local substitution
//! - [`HttpRenderService`] talks to the expansion/conversion service
//! - [`RenderCache`] holds labels, PNGs and message HTML per sign

pub mod cache;
pub mod client;
mod config;
pub mod context;
mod error;
pub mod renderer;
pub mod template;
pub mod urls;

pub use cache::{CachedArtifact, RenderCache};
pub use client::{ConvertRequest, ExpandPayload, HttpRenderService, RenderService};
pub use config::RenderConfig;
pub use context::{Layout, RenderInput};
pub use error::{Error, Result};
pub use renderer::{ArtworkRenderer, RenderScope};
pub use template::SvgInspector;
