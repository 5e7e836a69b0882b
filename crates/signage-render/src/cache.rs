//! In-memory render cache using moka
//!
//! Entries never expire on their own; a sign's entries are dropped together
//! whenever the sign is saved.

use crate::config::RenderConfig;
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use moka::future::Cache;
use signage_core::SignId;
use std::fs;
use std::sync::Arc;

/// 1x1 transparent PNG served when no placeholder file is configured
const BUILTIN_PLACEHOLDER: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Cached render output
#[derive(Debug, Clone)]
pub enum CachedArtifact {
    Text(Arc<String>),
    Bytes(Arc<Vec<u8>>),
}

/// Cache key of a sign's label
pub fn label_key(sign: SignId) -> String {
    format!("sign_unicode:{}", sign.raw())
}

/// Cache key of a sign's rendered PNG
pub fn png_key(sign: SignId) -> String {
    format!("sign_svg_as_png:{}", sign.raw())
}

/// Cache key of a sign's message HTML
pub fn message_html_key(sign: SignId) -> String {
    format!("sign_message_html:{}", sign.raw())
}

/// Shared render cache
#[derive(Clone)]
pub struct RenderCache {
    cache: Cache<String, CachedArtifact>,
    placeholder: Arc<Vec<u8>>,
}

impl RenderCache {
    pub fn new(max_entries: u64, placeholder: Vec<u8>) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
            placeholder: Arc::new(placeholder),
        }
    }

    /// Build from config, reading the placeholder PNG if one is configured
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let placeholder = match &config.placeholder_png {
            Some(path) => fs::read(path)?,
            None => builtin_placeholder(),
        };
        Ok(Self::new(config.cache_capacity, placeholder))
    }

    /// PNG served while artwork is still pending
    pub fn placeholder(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.placeholder)
    }

    pub async fn get_text(&self, key: &str) -> Option<Arc<String>> {
        match self.cache.get(key).await? {
            CachedArtifact::Text(text) => Some(text),
            CachedArtifact::Bytes(_) => None,
        }
    }

    pub async fn insert_text(&self, key: String, text: String) -> Arc<String> {
        let text = Arc::new(text);
        self.cache
            .insert(key, CachedArtifact::Text(Arc::clone(&text)))
            .await;
        text
    }

    pub async fn get_png(&self, sign: SignId) -> Option<Arc<Vec<u8>>> {
        match self.cache.get(&png_key(sign)).await? {
            CachedArtifact::Bytes(png) => Some(png),
            CachedArtifact::Text(_) => None,
        }
    }

    /// Store a rendered PNG; bodies of `min_len` bytes or fewer are not cached
    pub async fn insert_png(&self, sign: SignId, png: Vec<u8>, min_len: usize) -> Arc<Vec<u8>> {
        let png = Arc::new(png);
        if png.len() > min_len {
            self.cache
                .insert(png_key(sign), CachedArtifact::Bytes(Arc::clone(&png)))
                .await;
        } else {
            tracing::warn!(sign = sign.raw(), len = png.len(), "not caching short PNG");
        }
        png
    }

    /// Drop every cached artifact of a sign
    pub async fn invalidate_sign(&self, sign: SignId) {
        for key in [label_key(sign), png_key(sign), message_html_key(sign)] {
            self.cache.invalidate(&key).await;
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

fn builtin_placeholder() -> Vec<u8> {
    STANDARD.decode(BUILTIN_PLACEHOLDER).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_text_roundtrip_and_kinds() {
        let cache = RenderCache::new(100, Vec::new());
        let sign = SignId::new(7);
        cache.insert_text(label_key(sign), "A - B - 1".into()).await;

        assert_eq!(
            cache.get_text(&label_key(sign)).await.as_deref().map(String::as_str),
            Some("A - B - 1")
        );
        assert!(cache.get_text(&message_html_key(sign)).await.is_none());
        assert!(cache.get_png(sign).await.is_none());
    }

    #[tokio::test]
    async fn test_short_png_not_cached() {
        let cache = RenderCache::new(100, Vec::new());
        let sign = SignId::new(3);
        let returned = cache.insert_png(sign, vec![1; 10], 150).await;
        assert_eq!(returned.len(), 10);
        assert!(cache.get_png(sign).await.is_none());

        cache.insert_png(sign, vec![1; 151], 150).await;
        assert_eq!(cache.get_png(sign).await.map(|p| p.len()), Some(151));
    }

    #[tokio::test]
    async fn test_invalidate_sign_drops_all_keys() {
        let cache = RenderCache::new(100, Vec::new());
        let sign = SignId::new(5);
        let other = SignId::new(6);
        cache.insert_text(label_key(sign), "label".into()).await;
        cache.insert_text(message_html_key(sign), "<table/>".into()).await;
        cache.insert_png(sign, vec![0; 200], 150).await;
        cache.insert_text(label_key(other), "other".into()).await;

        cache.invalidate_sign(sign).await;
        assert!(cache.get_text(&label_key(sign)).await.is_none());
        assert!(cache.get_text(&message_html_key(sign)).await.is_none());
        assert!(cache.get_png(sign).await.is_none());
        assert!(cache.get_text(&label_key(other)).await.is_some());
    }

    #[test]
    fn test_placeholder_sources() {
        let cache = RenderCache::from_config(&RenderConfig::default()).unwrap();
        assert!(cache.placeholder().starts_with(b"\x89PNG"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"custom").unwrap();
        let config = RenderConfig {
            placeholder_png: Some(file.path().display().to_string()),
            ..RenderConfig::default()
        };
        let cache = RenderCache::from_config(&config).unwrap();
        assert_eq!(cache.placeholder().as_slice(), b"custom");
    }

    #[test]
    fn test_keys() {
        assert_eq!(label_key(SignId::new(12)), "sign_unicode:12");
        assert_eq!(png_key(SignId::new(12)), "sign_svg_as_png:12");
        assert_eq!(message_html_key(SignId::new(12)), "sign_message_html:12");
    }
}
