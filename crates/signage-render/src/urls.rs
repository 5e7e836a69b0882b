//! Derived sign URLs
//!
//! `ts` is a caller-supplied cache buster, usually the current unix time.

use signage_core::{PositionId, Sign, SignId, SignTemplate};

pub fn update_url(sign: SignId) -> String {
    format!("/sign/{}/update/", sign.raw())
}

pub fn svg_url(sign: SignId) -> String {
    format!("/sign/{}/svg/", sign.raw())
}

pub fn svg_as_png_url(sign: SignId, ts: u64, generate: bool) -> String {
    format!("/sign/{}/svg_as_png/?t={}&generate={}", sign.raw(), ts, generate)
}

pub fn pdf_as_png_url(sign: SignId, ts: u64) -> String {
    format!("/sign/{}/pdf_as_png/?t={}", sign.raw(), ts)
}

/// Artwork URL, only when there is uploaded or generated artwork to show
pub fn artwork_url(sign: &Sign, template: Option<&SignTemplate>, ts: u64) -> Option<String> {
    let has_artwork =
        sign.override_artwork.is_some() || template.is_some_and(SignTemplate::has_svg);
    has_artwork.then(|| format!("/sign/{}/artwork/?t={}", sign.id.raw(), ts))
}

pub fn position_url(position: PositionId) -> String {
    format!("/sign/position/{}/", position.raw())
}

/// Absolute URL the conversion service fetches the raw SVG from
pub fn svg_direct_url(public_domain: &str, sign: SignId) -> String {
    format!(
        "{}{}?direct=1",
        public_domain.trim_end_matches('/'),
        svg_url(sign)
    )
}
