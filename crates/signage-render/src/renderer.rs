//! Artwork rendering
//!
//! Templates containing a `<g id="repeat">` group, or a group whose id is an
//! attribute key, are expanded remotely. Everything else is rendered by
//! literal `{key}` substitution.

use crate::cache::RenderCache;
use crate::client::{ConvertRequest, ExpandPayload, RenderService};
use crate::config::RenderConfig;
use crate::context::RenderInput;
use crate::template::{has_placeholders, substitute, to_ascii_refs, SvgInspector};
use crate::urls::svg_direct_url;
use crate::Result;
use signage_core::SignId;
use std::collections::HashMap;
use std::sync::Arc;

/// Rendered SVG memo for the duration of one request or job
#[derive(Debug, Default)]
pub struct RenderScope {
    rendered: HashMap<(SignId, bool), Arc<String>>,
}

impl RenderScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }
}

/// Renders sign artwork through a [`RenderService`]
pub struct ArtworkRenderer<S> {
    service: S,
    inspector: SvgInspector,
    min_response_len: usize,
    public_domain: String,
}

impl<S: RenderService> ArtworkRenderer<S> {
    pub fn new(service: S, config: &RenderConfig) -> Result<Self> {
        Ok(Self {
            service,
            inspector: SvgInspector::compile()?,
            min_response_len: config.min_response_len,
            public_domain: config.public_domain.clone(),
        })
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Whether the input's template needs the expansion service
    pub fn is_dynamic(&self, input: &RenderInput) -> bool {
        input.svg.as_deref().is_some_and(|svg| {
            self.inspector
                .is_dynamic(svg, input.keys.iter().map(String::as_str))
        })
    }

    /// Render the sign's SVG; empty when the sign has no artwork template
    pub async fn render(&self, input: &RenderInput, text_to_vector: bool) -> Result<String> {
        let Some(template) = input.svg.as_deref() else {
            return Ok(String::new());
        };

        let mut working = template.to_string();
        if self.is_dynamic(input) {
            let payload = ExpandPayload::new(&input.context(text_to_vector), template)?;
            let expanded = self.service.expand(&payload).await?;
            if expanded.len() > self.min_response_len {
                working = expanded;
            } else {
                tracing::warn!(
                    sign = input.sign.raw(),
                    len = expanded.len(),
                    "expansion response too short, using the raw template"
                );
            }
        }

        let mut working = to_ascii_refs(&working);
        if has_placeholders(&working) {
            for (key, value) in input.substitution_map() {
                working = substitute(&working, key, &to_ascii_refs(value));
            }
        }
        Ok(working)
    }

    /// [`render`](Self::render) memoized in `scope`
    pub async fn render_in(
        &self,
        scope: &mut RenderScope,
        input: &RenderInput,
        text_to_vector: bool,
    ) -> Result<Arc<String>> {
        let key = (input.sign, text_to_vector);
        if let Some(svg) = scope.rendered.get(&key) {
            return Ok(Arc::clone(svg));
        }
        let svg = Arc::new(self.render(input, text_to_vector).await?);
        scope.rendered.insert(key, Arc::clone(&svg));
        Ok(svg)
    }

    /// PNG artwork of a sign
    ///
    /// A cached PNG is returned as is. On a miss with `generate` unset the
    /// placeholder is returned; otherwise the SVG is rendered and converted.
    pub async fn svg_as_png(
        &self,
        cache: &RenderCache,
        input: &RenderInput,
        generate: bool,
    ) -> Result<Arc<Vec<u8>>> {
        if let Some(png) = cache.get_png(input.sign).await {
            return Ok(png);
        }
        if !generate {
            return Ok(cache.placeholder());
        }
        self.generate_png(cache, input).await
    }

    /// Render and convert the sign's PNG, replacing any cached one
    pub async fn generate_png(
        &self,
        cache: &RenderCache,
        input: &RenderInput,
    ) -> Result<Arc<Vec<u8>>> {
        let svg = self.render(input, false).await?;
        let (width, height) = self.inspector.dimensions(&svg).unwrap_or_else(|| {
            tracing::warn!(sign = input.sign.raw(), "SVG has no readable dimensions");
            (0.0, 0.0)
        });
        let request = ConvertRequest {
            width,
            height,
            svg_url: svg_direct_url(&self.public_domain, input.sign),
        };
        let png = self.service.convert_png(&request).await?;
        tracing::debug!(sign = input.sign.raw(), len = png.len(), "converted artwork");
        Ok(cache.insert_png(input.sign, png, self.min_response_len).await)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::context::tests::sample;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Stand-in for the remote service that records requests
    #[derive(Default)]
    pub(crate) struct FakeService {
        pub expanded: String,
        pub png: Vec<u8>,
        pub expand_calls: AtomicUsize,
        pub convert_calls: AtomicUsize,
        pub last_payload: Mutex<Option<ExpandPayload>>,
        pub last_convert: Mutex<Option<ConvertRequest>>,
    }

    impl RenderService for FakeService {
        async fn expand(&self, payload: &ExpandPayload) -> Result<String> {
            self.expand_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_payload.lock().unwrap() = Some(payload.clone());
            Ok(self.expanded.clone())
        }

        async fn convert_png(&self, request: &ConvertRequest) -> Result<Vec<u8>> {
            self.convert_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_convert.lock().unwrap() = Some(request.clone());
            Ok(self.png.clone())
        }
    }

    fn renderer(service: FakeService) -> ArtworkRenderer<FakeService> {
        let config = RenderConfig {
            public_domain: "https://signs.test".into(),
            ..RenderConfig::default()
        };
        ArtworkRenderer::new(service, &config).unwrap()
    }

    fn expanded_svg() -> String {
        format!("<svg width=\"300\" height=\"100\">{}</svg>", "<rect/>".repeat(40))
    }

    #[tokio::test]
    async fn test_static_substitution() {
        let (registry, sign) = sample("<svg><text>{number}</text><text>{ title }</text></svg>");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let r = renderer(FakeService::default());

        let svg = r.render(&input, false).await.unwrap();
        assert_eq!(svg, "<svg><text>42</text><text>Caf&#233;</text></svg>");
        assert_eq!(r.service().expand_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_message_rows_substituted() {
        let (registry, sign) =
            sample("<svg><text>{message.line}</text><text>{message_2.line}</text></svg>");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let svg = renderer(FakeService::default()).render(&input, false).await.unwrap();
        assert_eq!(svg, "<svg><text>North</text><text>South</text></svg>");
    }

    #[tokio::test]
    async fn test_repeat_group_expands() {
        let (registry, sign) = sample("<svg><g id=\"repeat\"><text>line</text></g></svg>");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let r = renderer(FakeService {
            expanded: expanded_svg(),
            ..FakeService::default()
        });

        let svg = r.render(&input, true).await.unwrap();
        assert_eq!(svg, expanded_svg());
        assert_eq!(r.service().expand_calls.load(Ordering::SeqCst), 1);
        let payload = r.service().last_payload.lock().unwrap().clone().unwrap();
        assert!(payload.json_data.starts_with("base64:"));
    }

    #[tokio::test]
    async fn test_short_response_falls_back() {
        let template = "<svg><g id='title'><text>{number}</text></g></svg>";
        let (registry, sign) = sample(template);
        let input = RenderInput::build(&registry, &sign).unwrap();
        let r = renderer(FakeService {
            expanded: "<svg/>".into(),
            ..FakeService::default()
        });

        let svg = r.render(&input, false).await.unwrap();
        assert_eq!(svg, "<svg><g id='title'><text>42</text></g></svg>");
        assert_eq!(r.service().expand_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_template_renders_empty() {
        let (registry, sign) = sample("");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let svg = renderer(FakeService::default()).render(&input, false).await.unwrap();
        assert!(svg.is_empty());
    }

    #[tokio::test]
    async fn test_render_scope_memoizes() {
        let (registry, sign) = sample("<svg><g id=\"repeat\"/></svg>");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let r = renderer(FakeService {
            expanded: expanded_svg(),
            ..FakeService::default()
        });
        let mut scope = RenderScope::new();

        r.render_in(&mut scope, &input, false).await.unwrap();
        r.render_in(&mut scope, &input, false).await.unwrap();
        assert_eq!(r.service().expand_calls.load(Ordering::SeqCst), 1);

        r.render_in(&mut scope, &input, true).await.unwrap();
        assert_eq!(r.service().expand_calls.load(Ordering::SeqCst), 2);
        assert_eq!(scope.len(), 2);
    }

    #[tokio::test]
    async fn test_svg_as_png_caches_and_placeholder() {
        let (registry, sign) = sample("<svg width=\"600px\" height=\"200px\">{number}</svg>");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let r = renderer(FakeService {
            png: vec![7; 400],
            ..FakeService::default()
        });
        let cache = RenderCache::new(100, b"placeholder".to_vec());

        let pending = r.svg_as_png(&cache, &input, false).await.unwrap();
        assert_eq!(pending.as_slice(), b"placeholder");
        assert_eq!(r.service().convert_calls.load(Ordering::SeqCst), 0);

        let png = r.svg_as_png(&cache, &input, true).await.unwrap();
        assert_eq!(png.len(), 400);
        let request = r.service().last_convert.lock().unwrap().clone().unwrap();
        assert_eq!((request.width, request.height), (600.0, 200.0));
        assert_eq!(
            request.svg_url,
            format!("https://signs.test/sign/{}/svg/?direct=1", sign.id.raw())
        );

        let again = r.svg_as_png(&cache, &input, false).await.unwrap();
        assert_eq!(again.len(), 400);
        assert_eq!(r.service().convert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_png_is_not_cached() {
        let (registry, sign) = sample("<svg width=\"10\" height=\"10\"/>");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let r = renderer(FakeService {
            png: vec![1; 20],
            ..FakeService::default()
        });
        let cache = RenderCache::new(100, Vec::new());

        r.svg_as_png(&cache, &input, true).await.unwrap();
        r.svg_as_png(&cache, &input, true).await.unwrap();
        assert_eq!(r.service().convert_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generate_png_replaces_cached() {
        let (registry, sign) = sample("<svg width=\"10\" height=\"10\"/>");
        let input = RenderInput::build(&registry, &sign).unwrap();
        let r = renderer(FakeService {
            png: vec![2; 400],
            ..FakeService::default()
        });
        let cache = RenderCache::new(100, Vec::new());
        cache.insert_png(sign.id, vec![1; 400], 150).await;

        let png = r.generate_png(&cache, &input).await.unwrap();
        assert_eq!(png[0], 2);
        assert_eq!(cache.get_png(sign.id).await.unwrap()[0], 2);
        assert_eq!(r.service().convert_calls.load(Ordering::SeqCst), 1);
    }
}
