//! SVG template inspection and static substitution

use crate::Result;
use regex::Regex;

/// Group id that always marks a data-driven template
pub const REPEAT_ID: &str = "repeat";

/// Compiled patterns used to inspect SVG templates
#[derive(Debug, Clone)]
pub struct SvgInspector {
    group_id: Regex,
    svg_tag: Regex,
    attribute: Regex,
}

impl SvgInspector {
    pub fn compile() -> Result<Self> {
        Ok(Self {
            group_id: Regex::new(r#"<g\s[^>]*?\bid\s*=\s*['"]([^'"]*)['"][^>]*>"#)?,
            svg_tag: Regex::new(r"(?s)<svg\b[^>]*>")?,
            attribute: Regex::new(r#"\b(width|height|viewBox)\s*=\s*['"]([^'"]*)['"]"#)?,
        })
    }

    /// A template is dynamic when a `<g>` element's id is `repeat` or an attribute key
    pub fn is_dynamic<'a>(&self, svg: &str, keys: impl IntoIterator<Item = &'a str>) -> bool {
        let ids: Vec<&str> = self
            .group_id
            .captures_iter(svg)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if ids.contains(&REPEAT_ID) {
            return true;
        }
        keys.into_iter().any(|key| ids.contains(&key))
    }

    /// Width and height of the first `<svg>` element, units stripped
    ///
    /// Falls back to the `viewBox` size when either attribute is missing or
    /// not numeric.
    pub fn dimensions(&self, svg: &str) -> Option<(f64, f64)> {
        let tag = self.svg_tag.find(svg)?.as_str();
        let mut width = None;
        let mut height = None;
        let mut view_box = None;
        for caps in self.attribute.captures_iter(tag) {
            let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            match caps.get(1).map(|m| m.as_str()) {
                Some("width") => width = parse_length(value),
                Some("height") => height = parse_length(value),
                Some("viewBox") => view_box = parse_view_box(value),
                _ => {}
            }
        }
        match (width, height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => view_box,
        }
    }
}

fn parse_length(value: &str) -> Option<f64> {
    let numeric: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    numeric.parse().ok()
}

fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [_, _, w, h] => Some((*w, *h)),
        _ => None,
    }
}

/// Decode UTF-8, dropping invalid byte sequences
pub fn decode_dropping_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Replace every non-ASCII character with its numeric character reference
pub fn to_ascii_refs(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push_str(&format!("&#{};", c as u32));
        }
    }
    out
}

/// Replace `{key}` and `{ key }` with `value`
pub fn substitute(template: &str, key: &str, value: &str) -> String {
    template
        .replace(&format!("{{{}}}", key), value)
        .replace(&format!("{{ {} }}", key), value)
}

/// Whether the markup still carries placeholder braces
pub fn has_placeholders(template: &str) -> bool {
    template.contains('{') || template.contains('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inspector() -> SvgInspector {
        SvgInspector::compile().unwrap()
    }

    #[test]
    fn test_repeat_group_is_dynamic() {
        let svg = r#"<svg><g class="rows" id="repeat"><text>{line}</text></g></svg>"#;
        assert!(inspector().is_dynamic(svg, []));
        let svg = "<svg><g id='repeat'></g></svg>";
        assert!(inspector().is_dynamic(svg, ["unrelated"]));
    }

    #[test]
    fn test_slug_group_is_dynamic() {
        let svg = r#"<svg><g id="room_name"><text/></g></svg>"#;
        assert!(inspector().is_dynamic(svg, ["room_name"]));
        assert!(!inspector().is_dynamic(svg, ["room"]));
    }

    #[test]
    fn test_static_template() {
        let svg = r#"<svg><text id="repeat">{number}</text><g id="frame"/></svg>"#;
        assert!(!inspector().is_dynamic(svg, ["number"]));
    }

    #[test]
    fn test_dimensions() {
        let i = inspector();
        assert_eq!(
            i.dimensions(r#"<svg xmlns="x" width="600px" height="300.5px">"#),
            Some((600.0, 300.5))
        );
        assert_eq!(
            i.dimensions(r#"<svg viewBox="0 0 1200 400" width="100%">"#),
            Some((1200.0, 400.0))
        );
        assert_eq!(
            i.dimensions("<style></style>\n<svg\n  width='10mm'\n  height='20mm'>"),
            Some((10.0, 20.0))
        );
        assert_eq!(i.dimensions("<div/>"), None);
    }

    #[test]
    fn test_decode_dropping_invalid() {
        let bytes = b"caf\xc3\xa9 \xff ok";
        assert_eq!(decode_dropping_invalid(bytes), "café  ok");
    }

    #[test]
    fn test_to_ascii_refs() {
        assert_eq!(to_ascii_refs("Café →"), "Caf&#233; &#8594;");
        assert_eq!(to_ascii_refs("plain"), "plain");
    }

    #[test]
    fn test_substitute_both_forms() {
        let out = substitute("<t>{number}</t><t>{ number }</t><t>{numbers}</t>", "number", "42");
        assert_eq!(out, "<t>42</t><t>42</t><t>{numbers}</t>");
    }
}
