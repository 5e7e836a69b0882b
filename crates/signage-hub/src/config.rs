//! Hub configuration
//!
//! Loaded from RON. Every field has a default, so `()` is a valid file.
//!
//! ```
//! use signage_hub::HubConfig;
//!
//! let config = HubConfig::from_ron("(settle_delay_secs: 5)").unwrap();
//! assert_eq!(config.settle_delay().as_secs(), 5);
//! assert_eq!(config.render.min_response_len, 150);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use signage_render::RenderConfig;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Seconds between a save and its artwork regeneration
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    #[serde(default)]
    pub render: RenderConfig,
}

fn default_settle_delay_secs() -> u64 {
    30
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: default_settle_delay_secs(),
            render: RenderConfig::default(),
        }
    }
}

impl HubConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.settle_delay_secs, 30);
        assert_eq!(config.render.service_url, "http://localhost:8081");
    }

    #[test]
    fn test_load_nested_render() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
                settle_delay_secs: 0,
                render: (public_domain: "https://signs.example.org", min_response_len: 64),
            )"#
        )
        .unwrap();

        let config = HubConfig::load(file.path()).unwrap();
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.render.public_domain, "https://signs.example.org");
        assert_eq!(config.render.min_response_len, 64);
        assert_eq!(config.render.cache_capacity, 10_000);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            HubConfig::load("/nonexistent/hub.ron"),
            Err(Error::Io(_))
        ));
    }
}
