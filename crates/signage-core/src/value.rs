//! Attribute values and their per-type preparation for rendering

use crate::identity::{ColorId, IconId};
use crate::model::{Color, Icon};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Attribute values keyed by attribute slug
///
/// Uses IndexMap to preserve declaration order (snapshots and JSON payloads rely on it)
pub type AttributeValues = IndexMap<String, String>;

/// Placeholder stored for values that could not be resolved upstream
pub const UNKNOWN_VALUE: &str = "-unknown-";

/// How an attribute's raw value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text
    #[default]
    Text,
    /// Hex color without the leading `#`
    Color,
    /// Reference to a named project color (raw value is the color ID)
    ColorChoice,
    /// Reference to an icon (raw value is the icon ID)
    Icon,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Color => "color",
            FieldType::ColorChoice => "color_x",
            FieldType::Icon => "icon",
        }
    }
}

/// Which part of a sign an attribute describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributeGroup {
    /// Printed on the sign
    #[default]
    Message,
    /// Fabrication metadata (material, mounting, ...)
    Meta,
}

/// Lookup of referenced colors and icons
pub trait Palette {
    fn color(&self, id: ColorId) -> Option<&Color>;
    fn icon(&self, id: IconId) -> Option<&Icon>;
}

fn parse_ref(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

impl FieldType {
    /// Value injected by literal `{slug}` substitution
    pub fn prep_for_svg(&self, value: &str, palette: &impl Palette) -> String {
        match self {
            FieldType::Text => value.to_string(),
            FieldType::Color => {
                if value.is_empty() {
                    String::new()
                } else {
                    format!("#{}", value.trim_start_matches('#'))
                }
            }
            FieldType::ColorChoice => parse_ref(value)
                .and_then(|id| palette.color(ColorId::new(id)))
                .map(|c| c.hex())
                .unwrap_or_default(),
            FieldType::Icon => parse_ref(value)
                .and_then(|id| palette.icon(IconId::new(id)))
                .map(|i| i.svg.clone())
                .unwrap_or_default(),
        }
    }

    /// Value placed in the expansion-service context; `None` when there is nothing to draw
    pub fn prep_for_dynamic_svg(
        &self,
        value: &str,
        palette: &impl Palette,
    ) -> Option<serde_json::Value> {
        if value.is_empty() {
            return None;
        }
        match self {
            FieldType::Text => Some(json!(value)),
            FieldType::Color => Some(json!(format!("#{}", value.trim_start_matches('#')))),
            FieldType::ColorChoice => parse_ref(value)
                .and_then(|id| palette.color(ColorId::new(id)))
                .map(|c| json!({ "name": c.name, "color": c.hex() })),
            FieldType::Icon => parse_ref(value)
                .and_then(|id| palette.icon(IconId::new(id)))
                .map(|i| json!({ "name": i.name, "svg": i.svg })),
        }
    }

    /// Human readable form of a raw value
    pub fn display_text(&self, value: &str, palette: &impl Palette) -> String {
        match self {
            FieldType::Text | FieldType::Color => value.to_string(),
            FieldType::ColorChoice => parse_ref(value)
                .and_then(|id| palette.color(ColorId::new(id)))
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            FieldType::Icon => parse_ref(value)
                .and_then(|id| palette.icon(IconId::new(id)))
                .map(|i| i.name.clone())
                .unwrap_or_default(),
        }
    }
}
