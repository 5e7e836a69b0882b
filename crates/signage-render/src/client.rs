//! Client for the SVG expansion and PNG conversion service

use crate::config::RenderConfig;
use crate::template::decode_dropping_invalid;
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// Form body of an expansion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandPayload {
    pub json_data: String,
    pub svg_template: String,
}

impl ExpandPayload {
    /// Base64-encode the pretty-printed context and the template
    pub fn new(context: &Value, svg_template: &str) -> Result<Self> {
        let json = serde_json::to_string_pretty(context)?;
        Ok(Self {
            json_data: format!("base64:{}", STANDARD.encode(json)),
            svg_template: format!("base64:{}", STANDARD.encode(svg_template)),
        })
    }
}

/// Form body of a PNG conversion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertRequest {
    pub width: f64,
    pub height: f64,
    /// Public URL the service downloads the SVG from
    pub svg_url: String,
}

/// Remote rendering operations
pub trait RenderService: Send + Sync {
    /// Expand a data-driven template, returning the rendered SVG
    fn expand(&self, payload: &ExpandPayload) -> impl Future<Output = Result<String>> + Send;

    /// Convert the SVG behind a URL to PNG bytes
    fn convert_png(&self, request: &ConvertRequest)
        -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// [`RenderService`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpRenderService {
    client: Client,
    expand_url: String,
    convert_url: String,
}

impl HttpRenderService {
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            expand_url: config.expand_url(),
            convert_url: config.convert_url(),
        })
    }
}

impl RenderService for HttpRenderService {
    #[tracing::instrument(skip(self, payload), err)]
    async fn expand(&self, payload: &ExpandPayload) -> Result<String> {
        let response = self.client.post(&self.expand_url).form(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "expansion service returned an error status");
        }
        let body = response.bytes().await?;
        Ok(decode_dropping_invalid(&body))
    }

    #[tracing::instrument(skip(self), fields(svg_url = %request.svg_url), err)]
    async fn convert_png(&self, request: &ConvertRequest) -> Result<Vec<u8>> {
        let response = self.client.post(&self.convert_url).form(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "conversion service returned an error status");
        }
        Ok(response.bytes().await?.to_vec())
    }
}
