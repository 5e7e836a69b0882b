//! RON configuration for the rendering service connection

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Rendering service and render cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Base URL of the expansion/conversion service
    #[serde(default = "default_service_url")]
    pub service_url: String,
    /// Public base URL the conversion service fetches raw SVG from
    #[serde(default = "default_public_domain")]
    pub public_domain: String,
    /// Extra headers sent with every service request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Responses this long or shorter count as failed
    #[serde(default = "default_min_response_len")]
    pub min_response_len: usize,
    /// Request timeout in milliseconds (none by default)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// PNG returned while artwork is still being generated
    #[serde(default)]
    pub placeholder_png: Option<String>,
    /// Maximum cached entries across all signs
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_service_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_public_domain() -> String {
    "http://localhost:8000".to_string()
}

fn default_min_response_len() -> usize {
    150
}

fn default_cache_capacity() -> u64 {
    10_000
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            public_domain: default_public_domain(),
            headers: HashMap::new(),
            min_response_len: default_min_response_len(),
            timeout_ms: None,
            placeholder_png: None,
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl RenderConfig {
    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_ron(&content)
    }

    /// Parse configuration from RON text
    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// `{service_url}/expand/`
    pub fn expand_url(&self) -> String {
        format!("{}/expand/", self.service_url.trim_end_matches('/'))
    }

    /// `{service_url}/convert_png/`
    pub fn convert_url(&self) -> String {
        format!("{}/convert_png/", self.service_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::from_ron("()").unwrap();
        assert_eq!(config.min_response_len, 150);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.expand_url(), "http://localhost:8081/expand/");
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
                service_url: "http://render:9000/",
                headers: {{"X-Token": "secret"}},
                timeout_ms: Some(2500),
            )"#
        )
        .unwrap();

        let config = RenderConfig::load(file.path()).unwrap();
        assert_eq!(config.convert_url(), "http://render:9000/convert_png/");
        assert_eq!(config.headers["X-Token"], "secret");
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.cache_capacity, 10_000);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            RenderConfig::from_ron("(service_url: 3)"),
            Err(Error::Config(_))
        ));
    }
}
