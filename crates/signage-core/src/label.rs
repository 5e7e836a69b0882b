//! Human readable sign labels

use crate::model::Sign;
use crate::registry::Registry;
use crate::Result;

/// Label of a sign that has no template or zone yet
pub const NEW_SIGN_LABEL: &str = "New Sign";

/// Format the project's sign id template for `sign`
///
/// `{type}` is the template's full short code, `{location}` the zone's and
/// `{number}` the sign number. Unknown placeholders are left as written.
pub fn label(registry: &Registry, sign: &Sign) -> Result<String> {
    let (Some(template), Some(zone)) = (sign.template, sign.zone) else {
        return Ok(NEW_SIGN_LABEL.to_string());
    };
    let project = registry.require_project(registry.require_zone(zone)?.project)?;
    Ok(project
        .sign_id_template
        .replace("{type}", &registry.template_full_short_code(template))
        .replace("{location}", &registry.zone_full_short_code(zone))
        .replace("{number}", &sign.number))
}
