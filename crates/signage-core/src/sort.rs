//! Denormalized sort fields

use crate::model::{Sign, SortKeys};
use crate::number::encode_sort_key;
use crate::registry::Registry;

/// Tag names in the sign's tag order, joined with `", "`
pub fn tags_sort(registry: &Registry, sign: &Sign) -> String {
    sign.tags
        .iter()
        .filter_map(|t| registry.tag(*t))
        .map(|t| t.tag.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Recompute every sort key of `sign` from its current relations
pub fn sort_keys(registry: &Registry, sign: &Sign) -> SortKeys {
    SortKeys {
        phase: sign
            .phase
            .map(|id| registry.phase_global_order_id(id))
            .unwrap_or_default(),
        state: sign
            .state
            .map(|id| registry.state_global_order_id(id))
            .unwrap_or_default(),
        zone: sign
            .zone
            .map(|id| registry.zone_global_order_id(id))
            .unwrap_or_default(),
        template: sign
            .template
            .map(|id| registry.template_global_order_id(id))
            .unwrap_or_default(),
        number: encode_sort_key(&sign.number),
        tags: tags_sort(registry, sign),
    }
}
