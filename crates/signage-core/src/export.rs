//! Payloads derived from a sign: snapshot, API JSON, search text and HTML summaries

use crate::attributes::AttributeResolver;
use crate::model::{Attribute, Sign, SignTemplate};
use crate::registry::Registry;
use crate::value::{AttributeGroup, FieldType, Palette, UNKNOWN_VALUE};
use crate::Result;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ValueEntry {
    #[serde(rename = "type")]
    field_type: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct ValuesEntry {
    #[serde(rename = "type")]
    field_type: &'static str,
    values: Vec<String>,
}

fn template_of<'a>(registry: &'a Registry, sign: &Sign) -> Result<Option<&'a SignTemplate>> {
    sign.template
        .map(|id| registry.require_template(id))
        .transpose()
}

fn single_attributes<'a>(
    registry: &'a Registry,
    template: &SignTemplate,
    group: AttributeGroup,
) -> Vec<&'a Attribute> {
    registry
        .template_attributes(template, false)
        .into_iter()
        .filter(|a| a.group == group)
        .collect()
}

fn escape(value: &str) -> String {
    html_escape::encode_quoted_attribute(value).into_owned()
}

fn linebreaksbr(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\n', "<br>")
}

fn pretty<T: Serialize>(map: &IndexMap<String, T>) -> Result<Option<String>> {
    if map.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string_pretty(map)?))
}

/// Rows that hold real data: never more than the template allows
fn real_message_count(sign: &Sign, template: &SignTemplate) -> usize {
    sign.messages.len().min(template.number_of_repeating())
}

/// Message attributes keyed by name as `{type, value}`, inherited values included
pub fn message_json(registry: &Registry, sign: &Sign) -> Result<Option<String>> {
    let mut entries = IndexMap::new();
    if let Some(template) = template_of(registry, sign)? {
        let resolved = AttributeResolver::new(registry).resolve(sign)?;
        for attribute in single_attributes(registry, template, AttributeGroup::Message) {
            let value = resolved
                .get(&attribute.slug)
                .map(|a| a.value.as_str())
                .unwrap_or_default();
            if value == UNKNOWN_VALUE {
                continue;
            }
            entries.insert(
                attribute.name.clone(),
                ValueEntry {
                    field_type: attribute.field_type.as_str(),
                    value: escape(value),
                },
            );
        }
    }
    pretty(&entries)
}

/// Meta attributes keyed by name as `{type, value}`, sign-local values only
pub fn meta_json(registry: &Registry, sign: &Sign) -> Result<Option<String>> {
    let mut entries = IndexMap::new();
    if let Some(template) = template_of(registry, sign)? {
        for attribute in single_attributes(registry, template, AttributeGroup::Meta) {
            let value = sign
                .values
                .get(&attribute.slug)
                .map(String::as_str)
                .unwrap_or_default();
            if value == UNKNOWN_VALUE {
                continue;
            }
            entries.insert(
                attribute.name.clone(),
                ValueEntry {
                    field_type: attribute.field_type.as_str(),
                    value: escape(value),
                },
            );
        }
    }
    pretty(&entries)
}

/// Repeating attributes keyed by name as `{type, values}`, one value per row
///
/// Every list is padded with empty strings up to the template's row count.
pub fn repeating_message_json(registry: &Registry, sign: &Sign) -> Result<Option<String>> {
    let mut entries = IndexMap::new();
    if let Some(template) = template_of(registry, sign)? {
        let total = template.number_of_repeating();
        let real = real_message_count(sign, template);
        for attribute in registry.template_attributes(template, true) {
            let mut values: Vec<String> = sign.messages[..real]
                .iter()
                .map(|m| m.values.get(&attribute.slug).cloned().unwrap_or_default())
                .collect();
            values.resize(total, String::new());
            entries.insert(
                attribute.name.clone(),
                ValuesEntry {
                    field_type: attribute.field_type.as_str(),
                    values,
                },
            );
        }
    }
    pretty(&entries)
}

/// Free text index: local single values, then every real row's repeating values
pub fn combined_search_text(registry: &Registry, sign: &Sign) -> Result<String> {
    let mut text = String::new();
    let Some(template) = template_of(registry, sign)? else {
        return Ok(text);
    };
    for attribute in registry.template_attributes(template, false) {
        if attribute.is_inheritable {
            continue;
        }
        text.push(' ');
        text.push_str(sign.values.get(&attribute.slug).map(String::as_str).unwrap_or_default());
    }

    let repeating: Vec<&Attribute> = registry
        .template_attributes(template, true)
        .into_iter()
        .filter(|a| !a.is_inheritable && a.group == AttributeGroup::Message)
        .collect();
    let rows = sign.messages.len().min(template.number_of_messages as usize);
    for message in &sign.messages[..rows] {
        for attribute in &repeating {
            text.push(' ');
            text.push_str(message.values.get(&attribute.slug).map(String::as_str).unwrap_or_default());
        }
    }
    Ok(text)
}

/// Flat display mapping of a sign for audit payloads
pub fn snapshot(registry: &Registry, sign: &Sign) -> Result<IndexMap<String, String>> {
    let template = template_of(registry, sign)?;
    let mut data = IndexMap::new();
    data.insert(
        "sign_template".to_string(),
        template.map(|t| t.name.clone()).unwrap_or_default(),
    );
    data.insert(
        "state".to_string(),
        sign.state
            .and_then(|s| registry.state(s))
            .map(|s| s.name.clone())
            .unwrap_or_default(),
    );
    data.insert("facing_direction".to_string(), sign.facing_direction.to_string());
    data.insert("number".to_string(), sign.number.clone());
    data.insert("quantity".to_string(), sign.quantity.to_string());
    let custom_artwork = match &sign.override_artwork {
        Some(artwork) => format!("<a href='{}'>{}</a>", artwork.url, artwork.file_name),
        None => String::new(),
    };
    data.insert("custom_artwork".to_string(), custom_artwork);
    data.insert("tags".to_string(), crate::sort::tags_sort(registry, sign));

    if let Some(template) = template {
        let repeating: Vec<&Attribute> = registry
            .template_attributes(template, true)
            .into_iter()
            .filter(|a| !a.is_inheritable && a.group == AttributeGroup::Message)
            .collect();
        for (i, message) in sign.messages.iter().enumerate() {
            for attribute in &repeating {
                let raw = message.values.get(&attribute.slug).map(String::as_str).unwrap_or_default();
                data.insert(
                    format!("message_{}.{}", i + 1, attribute.slug),
                    attribute.field_type.display_text(raw, registry),
                );
            }
        }
    }

    for (slug, value) in &sign.values {
        data.insert(slug.clone(), value.clone());
    }
    Ok(data)
}

/// Black or white, whichever reads better on `hex`
fn contrast_color(hex: &str) -> &'static str {
    let hex = hex.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0) as u32
    };
    let yiq = (channel(0) * 299 + channel(2) * 587 + channel(4) * 114) / 1000;
    if yiq >= 128 {
        "000000"
    } else {
        "ffffff"
    }
}

fn color_style(selector: &str, hex: &str) -> String {
    format!(
        "<style>@media all{{{}.color_{hex}{{background-color: #{hex} !important;color: #{} !important;padding: 3px !important;}}}}</style>",
        selector,
        contrast_color(hex),
    )
}

fn icon_img(id: &str, alt: &str) -> String {
    format!(
        "<img height='15px' src='/sign_message/icon/{}/thumbnail_url/40/' alt='{}'>",
        escape(id),
        escape(alt)
    )
}

/// `<b>name</b>` plus the value rendered for its field type
fn attribute_block(attribute: &Attribute, raw: &str, palette: &impl Palette) -> String {
    let value = escape(raw);
    let mut html = format!("<b>{}</b>", escape(&attribute.name));
    match attribute.field_type {
        FieldType::Color => {
            html.push_str(&color_style("", &value));
            html.push_str(&format!("<p class='color_{0}'>{0}</p>", value));
        }
        FieldType::ColorChoice => {
            let hex = FieldType::ColorChoice.prep_for_svg(raw, palette);
            let hex = hex.trim_start_matches('#');
            html.push_str(&color_style("", hex));
            html.push_str(&format!(
                "<p class='color_{}'>{}</p>",
                hex,
                escape(&attribute.field_type.display_text(raw, palette))
            ));
        }
        FieldType::Icon => {
            let name = attribute.field_type.display_text(raw, palette);
            html.push_str(&format!("<p>{}</p>", icon_img(raw, &name)));
        }
        FieldType::Text => html.push_str(&format!("<p>{}</p>", linebreaksbr(&value))),
    }
    html
}

fn repeating_cell(attribute: &Attribute, raw: &str, palette: &impl Palette) -> String {
    match attribute.field_type {
        FieldType::Color => {
            let value = escape(raw);
            format!(
                "{}<td class='color_{1}'>{1}</td>",
                color_style("td", &value),
                value
            )
        }
        FieldType::ColorChoice => {
            let hex = FieldType::ColorChoice.prep_for_svg(raw, palette);
            if hex.is_empty() {
                return "<td></td>".to_string();
            }
            let hex = hex.trim_start_matches('#');
            format!(
                "{}<td class='color_{}'>{}</td>",
                color_style("td", hex),
                hex,
                escape(&attribute.field_type.display_text(raw, palette))
            )
        }
        FieldType::Icon => {
            let name = attribute.field_type.display_text(raw, palette);
            if name.is_empty() {
                return "<td></td>".to_string();
            }
            format!("<td style='text-align:center'>{}</td>", icon_img(raw, &name))
        }
        FieldType::Text => format!("<td>{}</td>", linebreaksbr(&escape(raw))),
    }
}

fn repeating_table(registry: &Registry, sign: &Sign, template: &SignTemplate) -> String {
    let attributes = registry.template_attributes(template, true);
    if attributes.is_empty() {
        return String::new();
    }
    let mut rows = real_message_count(sign, template);
    while rows > 0 {
        let last = &sign.messages[rows - 1];
        let filled = attributes
            .iter()
            .any(|a| last.values.get(&a.slug).is_some_and(|v| !v.is_empty()));
        if filled {
            break;
        }
        rows -= 1;
    }
    if rows == 0 {
        return String::new();
    }

    let span = attributes.len();
    let sides: IndexMap<usize, u32> = template.side_starts().into_iter().collect();
    let columns: IndexMap<usize, u32> = template.column_starts().into_iter().collect();
    let mut html = String::from("<table class='attributes_repeating_table'><thead><tr>");
    for attribute in &attributes {
        html.push_str(&format!("<th>{}</th>", escape(&attribute.name)));
    }
    html.push_str("</tr></thead><tbody>");
    for (k, message) in sign.messages[..rows].iter().enumerate() {
        if let Some(side) = sides.get(&k) {
            html.push_str(&format!(
                "<tr class=\"tr_side_number_expanded_list\"><td colspan=\"{}\"><b>Side {}</b></td></tr>",
                span, side
            ));
        }
        if let Some(column) = columns.get(&k) {
            html.push_str(&format!(
                "<tr class=\"tr_column_number_expanded_list\"><td colspan=\"{}\">Column {}</td></tr>",
                span, column
            ));
        }
        html.push_str("<tr>");
        for attribute in &attributes {
            let raw = message.values.get(&attribute.slug).map(String::as_str).unwrap_or_default();
            html.push_str(&repeating_cell(attribute, raw, registry));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// Summary of the printed message for hover cards and expanded lists
pub fn message_html(registry: &Registry, sign: &Sign) -> Result<String> {
    let Some(template) = template_of(registry, sign)? else {
        return Ok(String::new());
    };
    let resolved = AttributeResolver::new(registry).resolve(sign)?;
    let mut html = String::new();
    for attribute in single_attributes(registry, template, AttributeGroup::Message) {
        let value = resolved
            .get(&attribute.slug)
            .map(|a| a.value.as_str())
            .unwrap_or_default();
        if value.is_empty() || value == UNKNOWN_VALUE {
            continue;
        }
        html.push_str(&attribute_block(attribute, value, registry));
    }
    html.push_str(&repeating_table(registry, sign, template));
    Ok(html)
}

/// Summary of fabrication metadata (sign-local values)
pub fn meta_html(registry: &Registry, sign: &Sign) -> Result<String> {
    let Some(template) = template_of(registry, sign)? else {
        return Ok(String::new());
    };
    let mut html = String::new();
    for attribute in single_attributes(registry, template, AttributeGroup::Meta) {
        let value = sign
            .values
            .get(&attribute.slug)
            .map(String::as_str)
            .unwrap_or_default();
        if value.is_empty() || value == UNKNOWN_VALUE {
            continue;
        }
        html.push_str(&attribute_block(attribute, value, registry));
    }
    Ok(html)
}
