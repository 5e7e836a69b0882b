//! Render inputs captured from the registry
//!
//! Rendering talks to a remote service, so everything it needs is copied out
//! of the registry first. [`RenderInput::build`] runs under the registry lock;
//! the renderer then works on the owned input without holding it.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use signage_core::attributes::message_prefixes;
use signage_core::{AttributeGroup, AttributeResolver, Registry, Sign, SignId, SignTemplate};

/// Identity fields copied into every render context
const IDENTITY_KEYS: [&str; 7] = [
    "type.short_code_combo",
    "location.short_code_combo",
    "sign_id",
    "last_modified_date",
    "last_modified_year",
    "last_modified_month",
    "last_modified_day",
];

/// Message rows per side/column cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub sides: u32,
    pub columns: u32,
    pub messages: u32,
}

impl Layout {
    fn of(template: &SignTemplate) -> Self {
        Self {
            sides: template.number_of_sides,
            columns: template.number_of_columns,
            messages: template.number_of_messages,
        }
    }

    /// Row index of message `k` in side `i`, column `j` (all 0-based)
    pub fn row_index(&self, i: u32, j: u32, k: u32) -> usize {
        (i * self.columns * self.messages + j * self.messages + k) as usize
    }
}

/// Owned snapshot of everything needed to render one sign
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInput {
    pub sign: SignId,
    /// Template markup with fonts, `None` when the sign has no artwork template
    pub svg: Option<String>,
    pub fonts: Vec<String>,
    pub layout: Option<Layout>,
    /// Every resolved attribute key, used to detect dynamic templates
    pub keys: Vec<String>,
    /// Context entries except `svg_options`
    pub context: Map<String, Value>,
    /// `{key}` replacements for static substitution, in application order
    pub substitutions: Vec<(String, String)>,
}

impl RenderInput {
    pub fn build(registry: &Registry, sign: &Sign) -> signage_core::Result<Self> {
        let resolver = AttributeResolver::new(registry);
        let resolved = resolver.resolve(sign)?;
        let template = sign
            .template
            .map(|id| registry.require_template(id))
            .transpose()?;

        let mut context = Map::new();
        context.insert("number".into(), json!(sign.number));
        for key in IDENTITY_KEYS {
            let value = resolved.get(key).map(|a| json!(a.value)).unwrap_or(Value::Null);
            context.insert(key.into(), value);
        }

        let mut substitutions: Vec<(String, String)> =
            resolver.prepped_for_svg(sign)?.into_iter().collect();

        let Some(template) = template.filter(|t| t.has_svg()) else {
            return Ok(Self {
                sign: sign.id,
                svg: None,
                fonts: template.map(|t| t.fonts_list()).unwrap_or_default(),
                layout: None,
                keys: resolved.keys().cloned().collect(),
                context,
                substitutions,
            });
        };

        for attribute in registry.template_attributes(template, false) {
            if attribute.group != AttributeGroup::Message {
                continue;
            }
            let raw = resolved
                .get(&attribute.slug)
                .map(|a| a.value.as_str())
                .unwrap_or_default();
            if let Some(value) = attribute.field_type.prep_for_dynamic_svg(raw, registry) {
                context.insert(attribute.slug.clone(), value);
            }
        }

        let repeating = registry.template_attributes(template, true);
        let mut rows = Vec::with_capacity(sign.messages.len());
        for (i, message) in sign.messages.iter().enumerate() {
            let mut row = Map::new();
            for attribute in &repeating {
                let raw = message
                    .values
                    .get(&attribute.slug)
                    .map(String::as_str)
                    .unwrap_or_default();
                if let Some(value) = attribute.field_type.prep_for_dynamic_svg(raw, registry) {
                    row.insert(attribute.slug.clone(), value);
                }
                let prepped = attribute.field_type.prep_for_svg(raw, registry);
                for prefix in message_prefixes(i) {
                    substitutions.push((format!("{}.{}", prefix, attribute.slug), prepped.clone()));
                }
            }
            rows.push(Value::Object(row));
        }

        let layout = Layout::of(template);
        for i in 0..layout.sides {
            let mut side = Map::new();
            for j in 0..layout.columns {
                let repeat: Vec<Value> = (0..layout.messages)
                    .filter_map(|k| rows.get(layout.row_index(i, j, k)).cloned())
                    .collect();
                side.insert(format!("column_{}", j + 1), json!({ "repeat": repeat }));
            }
            context.insert(format!("side_{}", i + 1), Value::Object(side));
        }

        Ok(Self {
            sign: sign.id,
            svg: Some(template.svg_code_with_fonts()),
            fonts: template.fonts_list(),
            layout: Some(layout),
            keys: resolved.keys().cloned().collect(),
            context,
            substitutions,
        })
    }

    /// Context document sent to the expansion service
    pub fn context(&self, text_to_vector: bool) -> Value {
        let mut context = self.context.clone();
        context.insert(
            "svg_options".into(),
            json!({
                "text_to_vector": text_to_vector,
                "embed_svg": true,
                "fonts_list": self.fonts,
            }),
        );
        Value::Object(context)
    }

    /// Replacement values keyed by placeholder, last write wins
    pub fn substitution_map(&self) -> IndexMap<&str, &str> {
        self.substitutions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}
