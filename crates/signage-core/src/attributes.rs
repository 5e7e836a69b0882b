//! Attribute inheritance
//!
//! A sign's attributes are resolved by merging an ordered list of [`Layer`]s,
//! each a plain key-value mapping owned by one record. Later layers override
//! earlier ones:
//!
//! ```text
//! template defaults -> zone ancestors (root first) -> zone -> position -> sign
//! ```
//!
//! Every resolved value remembers which record supplied it ([`SourceRef`]), so
//! the sign form can show where an inherited value is edited.

use crate::identity::SourceRef;
use crate::model::{Position, Sign, SignTemplate, Zone};
use crate::registry::Registry;
use crate::value::AttributeGroup;
use crate::Result;
use indexmap::IndexMap;

/// A value together with the record that supplied it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttribute {
    pub value: String,
    pub source: SourceRef,
}

/// Resolved attributes keyed by slug
pub type ResolvedAttributes = IndexMap<String, ResolvedAttribute>;

/// One scope of attribute ownership
#[derive(Debug, Clone)]
pub struct Layer {
    pub source: SourceRef,
    pub values: Vec<(String, String)>,
}

impl Layer {
    pub fn new(source: SourceRef) -> Self {
        Self {
            source,
            values: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((key.into(), value.into()));
        self
    }

    pub fn extend<'a>(mut self, values: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// Merge layers in order; a key in a later layer replaces the earlier value
pub fn merge(layers: impl IntoIterator<Item = Layer>) -> ResolvedAttributes {
    let mut resolved = ResolvedAttributes::new();
    for layer in layers {
        for (key, value) in layer.values {
            resolved.insert(
                key,
                ResolvedAttribute {
                    value,
                    source: layer.source,
                },
            );
        }
    }
    resolved
}

/// Resolves sign attributes against the registry
pub struct AttributeResolver<'a> {
    registry: &'a Registry,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Declared defaults of a template plus its identifying codes
    pub fn template_layer(&self, template: &SignTemplate) -> Layer {
        let mut layer = Layer::new(SourceRef::template(template.id));
        for ta in &template.attributes {
            let Some(attribute) = self.registry.attribute(ta.attribute) else {
                continue;
            };
            if let Some(default) = &attribute.default_value {
                layer = layer.with(attribute.slug.clone(), default.clone());
            }
        }
        layer
            .with("type.name", template.name.clone())
            .with(
                "type.short_code_combo",
                self.registry.template_full_short_code(template.id),
            )
    }

    /// One layer per zone, root first; the innermost zone also supplies its codes
    pub fn zone_layers(&self, zone: &Zone) -> Vec<Layer> {
        let mut layers: Vec<Layer> = self
            .registry
            .zone_ancestry(zone.id)
            .into_iter()
            .rev()
            .map(|z| Layer::new(SourceRef::zone(z.id)).extend(&z.attributes))
            .collect();
        let own = Layer::new(SourceRef::zone(zone.id))
            .with("location.name", zone.name.clone())
            .with(
                "location.short_code_combo",
                self.registry.zone_full_short_code(zone.id),
            );
        layers.push(own);
        layers
    }

    pub fn position_layer(&self, position: &Position) -> Layer {
        Layer::new(SourceRef::position(position.id)).extend(&position.attributes)
    }

    pub fn sign_layer(&self, sign: &Sign) -> Layer {
        Layer::new(SourceRef::sign(sign.id)).extend(&sign.values)
    }

    fn inherited_layers(&self, sign: &Sign) -> Result<Vec<Layer>> {
        let mut layers = Vec::new();
        if let Some(template) = sign.template {
            layers.push(self.template_layer(self.registry.require_template(template)?));
        }
        let position = self.registry.require_position(sign.position)?;
        layers.extend(self.zone_layers(self.registry.require_zone(position.zone)?));
        layers.push(self.position_layer(position));
        Ok(layers)
    }

    fn identity_layer(&self, sign: &Sign) -> Result<Layer> {
        let mut layer = Layer::new(SourceRef::sign(sign.id));
        if let Some(template) = sign.template {
            layer = layer.with("sign_template", self.registry.require_template(template)?.name.clone());
        }
        Ok(layer.with("number", sign.number.clone()))
    }

    /// Fully inherited attributes of a sign
    pub fn resolve(&self, sign: &Sign) -> Result<ResolvedAttributes> {
        let mut layers = self.inherited_layers(sign)?;
        layers.push(self.sign_layer(sign));
        layers.push(self.identity_layer(sign)?);

        let mut resolved = merge(layers);
        let code = |key: &str| {
            resolved
                .get(key)
                .map(|a| a.value.clone())
                .unwrap_or_default()
        };
        let sign_id = format!(
            "{} - {} - {}",
            code("type.short_code_combo"),
            code("location.short_code_combo"),
            sign.number
        );
        let modified = sign.last_modified_date;
        let computed = Layer::new(SourceRef::sign(sign.id))
            .with("sign_id", sign_id)
            .with("last_modified_date", modified.format("%Y-%m-%d").to_string())
            .with("last_modified_year", modified.format("%Y").to_string())
            .with("last_modified_month", modified.format("%m").to_string())
            .with("last_modified_day", modified.format("%d").to_string());
        for (key, value) in computed.values {
            resolved.insert(
                key,
                ResolvedAttribute {
                    value,
                    source: computed.source,
                },
            );
        }
        Ok(resolved)
    }

    /// Sign-local values only, no inheritance
    pub fn resolve_local(&self, sign: &Sign) -> Result<ResolvedAttributes> {
        Ok(merge([
            self.sign_layer(sign),
            self.identity_layer(sign)?,
        ]))
    }

    /// Repeating values per message row as `message_N.slug`, row 1 also as `message.slug`
    pub fn resolve_repeating(&self, sign: &Sign) -> Result<ResolvedAttributes> {
        let mut resolved = ResolvedAttributes::new();
        let Some(template) = sign.template else {
            return Ok(resolved);
        };
        let template = self.registry.require_template(template)?;
        let attributes = self.registry.template_attributes(template, true);
        for (i, message) in sign.messages.iter().enumerate() {
            for attribute in &attributes {
                let value = message
                    .values
                    .get(&attribute.slug)
                    .cloned()
                    .unwrap_or_default();
                for prefix in message_prefixes(i) {
                    resolved.insert(
                        format!("{}.{}", prefix, attribute.slug),
                        ResolvedAttribute {
                            value: value.clone(),
                            source: SourceRef::sign(sign.id),
                        },
                    );
                }
            }
        }
        Ok(resolved)
    }

    /// Plain values with single message attributes prepared for literal SVG substitution
    pub fn prepped_for_svg(&self, sign: &Sign) -> Result<IndexMap<String, String>> {
        let resolved = self.resolve(sign)?;
        let mut prepped: IndexMap<String, String> = resolved
            .into_iter()
            .map(|(k, a)| (k, a.value))
            .collect();
        if let Some(template) = sign.template {
            let template = self.registry.require_template(template)?;
            for attribute in self.registry.template_attributes(template, false) {
                if attribute.group != AttributeGroup::Message {
                    continue;
                }
                let raw = prepped.get(&attribute.slug).cloned().unwrap_or_default();
                prepped.insert(
                    attribute.slug.clone(),
                    attribute.field_type.prep_for_svg(&raw, self.registry),
                );
            }
        }
        Ok(prepped)
    }
}

/// Substitution prefixes for message row `index` (0-based)
pub fn message_prefixes(index: usize) -> Vec<String> {
    let mut prefixes = vec![format!("message_{}", index + 1)];
    if index == 0 {
        prefixes.push("message".to_string());
    }
    prefixes
}
