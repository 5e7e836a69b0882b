//! Duplicate numbering detection
//!
//! Three independent flags mark signs that share an identifying tuple with at
//! least one other sign of the same project. The flags are a derived index,
//! maintained eagerly on save and release rather than recomputed on read.

use crate::identity::{ProjectId, SignId, TemplateId, ZoneId};
use crate::model::{ConflictFlags, NumberingMode, Project, Sign};
use crate::registry::Registry;

/// Identifying tuple a sign had at some point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingKey {
    pub project: Option<ProjectId>,
    pub template: Option<TemplateId>,
    pub zone: Option<ZoneId>,
    pub number: String,
}

impl NumberingKey {
    pub fn of(sign: &Sign) -> Self {
        Self {
            project: sign.project,
            template: sign.template,
            zone: sign.zone,
            number: sign.number.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    TypeLocationNumber,
    LocationNumber,
    TypeNumber,
}

impl ConflictScope {
    pub const ALL: [ConflictScope; 3] = [
        ConflictScope::TypeLocationNumber,
        ConflictScope::LocationNumber,
        ConflictScope::TypeNumber,
    ];

    /// Whether `key` carries every part this scope compares
    pub fn applies_to(&self, key: &NumberingKey) -> bool {
        if key.project.is_none() {
            return false;
        }
        match self {
            ConflictScope::TypeLocationNumber => key.template.is_some() && key.zone.is_some(),
            ConflictScope::LocationNumber => key.zone.is_some(),
            ConflictScope::TypeNumber => key.template.is_some(),
        }
    }

    fn matches(&self, key: &NumberingKey, sign: &Sign) -> bool {
        if sign.project != key.project || sign.number != key.number {
            return false;
        }
        match self {
            ConflictScope::TypeLocationNumber => {
                sign.template == key.template && sign.zone == key.zone
            }
            ConflictScope::LocationNumber => sign.zone == key.zone,
            ConflictScope::TypeNumber => sign.template == key.template,
        }
    }

    pub fn flag(&self, flags: &ConflictFlags) -> bool {
        match self {
            ConflictScope::TypeLocationNumber => flags.type_location_number,
            ConflictScope::LocationNumber => flags.location_number,
            ConflictScope::TypeNumber => flags.type_number,
        }
    }

    pub fn set_flag(&self, flags: &mut ConflictFlags, value: bool) {
        match self {
            ConflictScope::TypeLocationNumber => flags.type_location_number = value,
            ConflictScope::LocationNumber => flags.location_number = value,
            ConflictScope::TypeNumber => flags.type_number = value,
        }
    }
}

fn siblings(
    registry: &Registry,
    scope: ConflictScope,
    key: &NumberingKey,
    exclude: SignId,
) -> Vec<SignId> {
    registry
        .signs()
        .filter(|s| s.id != exclude && scope.matches(key, s))
        .map(|s| s.id)
        .collect()
}

/// Write a sibling's flag; returns true when the stored value changed
fn write_flag(registry: &mut Registry, id: SignId, scope: ConflictScope, value: bool) -> bool {
    match registry.sign_mut(id) {
        Some(other) if scope.flag(&other.conflicts) != value => {
            scope.set_flag(&mut other.conflicts, value);
            true
        }
        _ => false,
    }
}

/// Clear the flag of a lone sibling left behind by `previous`
fn release_scope(
    registry: &mut Registry,
    scope: ConflictScope,
    previous: &NumberingKey,
    exclude: SignId,
    touched: &mut Vec<SignId>,
) {
    if !scope.applies_to(previous) {
        return;
    }
    let remaining = siblings(registry, scope, previous, exclude);
    if let [only] = remaining.as_slice() {
        if write_flag(registry, *only, scope, false) && !touched.contains(only) {
            touched.push(*only);
        }
    }
}

/// Whether a save needs a conflict rescan
pub fn needs_rescan(previous: Option<&NumberingKey>, sign: &Sign) -> bool {
    match previous {
        None => true,
        Some(prev) => {
            prev.number != sign.number || prev.template != sign.template || prev.zone != sign.zone
        }
    }
}

/// Recompute the flags of `sign` (not yet written) and its siblings
///
/// `previous` is the stored tuple of the sign before this save, `None` for a new
/// sign. Returns the siblings whose flags were written. The sibling reads and
/// writes are not isolated from concurrent saves in other processes.
pub fn rescan(
    registry: &mut Registry,
    sign: &mut Sign,
    previous: Option<&NumberingKey>,
) -> Vec<SignId> {
    let current = NumberingKey::of(sign);
    let mut touched = Vec::new();

    for scope in ConflictScope::ALL {
        scope.set_flag(&mut sign.conflicts, false);

        if let Some(previous) = previous {
            release_scope(registry, scope, previous, sign.id, &mut touched);
        }

        if !scope.applies_to(&current) {
            continue;
        }
        let clashing = siblings(registry, scope, &current, sign.id);
        if clashing.is_empty() {
            continue;
        }
        for id in clashing {
            if write_flag(registry, id, scope, true) && !touched.contains(&id) {
                touched.push(id);
            }
        }
        scope.set_flag(&mut sign.conflicts, true);
    }

    if !touched.is_empty() {
        tracing::debug!(sign = %sign.id, touched = touched.len(), "Conflict flags updated");
    }
    touched
}

/// Release the flags a deleted sign held on its siblings
pub fn release(registry: &mut Registry, sign: &Sign) -> Vec<SignId> {
    let key = NumberingKey::of(sign);
    let mut touched = Vec::new();
    for scope in ConflictScope::ALL {
        release_scope(registry, scope, &key, sign.id, &mut touched);
    }
    touched
}

/// Highlight the sign's type on the sign form
pub fn should_highlight_type(project: &Project, flags: &ConflictFlags) -> bool {
    project.highlight_duplication
        && match project.numbering {
            NumberingMode::ByTypeLocation => flags.type_location_number,
            NumberingMode::ByType => flags.type_number,
            _ => false,
        }
}

/// Highlight the sign's location on the sign form
pub fn should_highlight_location(project: &Project, flags: &ConflictFlags) -> bool {
    project.highlight_duplication
        && match project.numbering {
            NumberingMode::ByTypeLocation => flags.type_location_number,
            NumberingMode::ByLocation => flags.location_number,
            _ => false,
        }
}

pub fn should_highlight_number(project: &Project, flags: &ConflictFlags) -> bool {
    should_highlight_type(project, flags) || should_highlight_location(project, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::*;
    use crate::model::*;

    struct Setup {
        registry: Registry,
        project: ProjectId,
        position: PositionId,
        zone_a: ZoneId,
        zone_b: ZoneId,
        template_a: TemplateId,
        template_b: TemplateId,
    }

    fn setup() -> Setup {
        let mut registry = Registry::new();
        let project = ProjectId::new(registry.allocate());
        registry.insert_project(Project::new(project, "Stadium"));
        let zone_a = ZoneId::new(registry.allocate());
        registry.insert_zone(Zone::new(zone_a, project, "East"));
        let zone_b = ZoneId::new(registry.allocate());
        registry.insert_zone(Zone::new(zone_b, project, "West"));
        let template_a = TemplateId::new(registry.allocate());
        registry.insert_template(SignTemplate::new(template_a, project, "Exit"));
        let template_b = TemplateId::new(registry.allocate());
        registry.insert_template(SignTemplate::new(template_b, project, "Toilet"));
        let position = PositionId::new(registry.allocate());
        registry
            .save_position(Position::new(position, zone_a, 0.0, 0.0))
            .unwrap();
        Setup {
            registry,
            project,
            position,
            zone_a,
            zone_b,
            template_a,
            template_b,
        }
    }

    /// Save a sign the way the pipeline does: rescan, then write
    fn save(s: &mut Setup, mut sign: Sign) -> SignId {
        let previous = s.registry.sign(sign.id).map(NumberingKey::of);
        if needs_rescan(previous.as_ref(), &sign) {
            rescan(&mut s.registry, &mut sign, previous.as_ref());
        }
        let id = sign.id;
        s.registry.insert_sign(sign);
        id
    }

    fn sign(s: &mut Setup, template: TemplateId, zone: ZoneId, number: &str) -> Sign {
        let mut sign = s.registry.new_sign(s.position);
        sign.project = Some(s.project);
        sign.template = Some(template);
        sign.zone = Some(zone);
        sign.number = number.into();
        sign
    }

    fn flags(s: &Setup, id: SignId) -> ConflictFlags {
        s.registry.sign(id).unwrap().conflicts
    }

    #[test]
    fn test_duplicate_flags_both_signs() {
        let mut s = setup();
        let (ta, za) = (s.template_a, s.zone_a);
        let a = sign(&mut s, ta, za, "1");
        let a = save(&mut s, a);
        assert!(!flags(&s, a).type_location_number);

        let b = sign(&mut s, ta, za, "1");
        let b = save(&mut s, b);
        for id in [a, b] {
            let f = flags(&s, id);
            assert!(f.type_location_number && f.location_number && f.type_number);
        }
    }

    #[test]
    fn test_three_way_renumber() {
        let mut s = setup();
        let (ta, za) = (s.template_a, s.zone_a);
        let a = sign(&mut s, ta, za, "7");
        let a = save(&mut s, a);
        let b = sign(&mut s, ta, za, "7");
        let b = save(&mut s, b);
        let c = sign(&mut s, ta, za, "7");
        let c = save(&mut s, c);
        for id in [a, b, c] {
            assert!(flags(&s, id).type_location_number);
        }

        // C leaves; A and B still share the tuple
        let mut moved = s.registry.sign(c).unwrap().clone();
        moved.number = "8".into();
        save(&mut s, moved);
        assert!(!flags(&s, c).type_location_number);
        assert!(flags(&s, a).type_location_number);
        assert!(flags(&s, b).type_location_number);

        // B leaves; A is alone
        let mut moved = s.registry.sign(b).unwrap().clone();
        moved.number = "9".into();
        save(&mut s, moved);
        assert!(!flags(&s, a).type_location_number);
        assert!(!flags(&s, b).type_location_number);
    }

    #[test]
    fn test_scopes_are_independent() {
        let mut s = setup();
        let (ta, tb, za, zb) = (s.template_a, s.template_b, s.zone_a, s.zone_b);
        let a = sign(&mut s, ta, za, "3");
        let a = save(&mut s, a);
        // same zone and number, other template
        let b = sign(&mut s, tb, za, "3");
        let b = save(&mut s, b);
        let f = flags(&s, b);
        assert!(f.location_number);
        assert!(!f.type_location_number);
        assert!(!f.type_number);
        assert!(flags(&s, a).location_number);

        // same template and number, other zone
        let c = sign(&mut s, ta, zb, "3");
        let c = save(&mut s, c);
        let f = flags(&s, c);
        assert!(f.type_number);
        assert!(!f.location_number);
        assert!(!f.type_location_number);
        assert!(flags(&s, a).type_number);
    }

    #[test]
    fn test_release_on_delete() {
        let mut s = setup();
        let (ta, za) = (s.template_a, s.zone_a);
        let a = sign(&mut s, ta, za, "5");
        let a = save(&mut s, a);
        let b = sign(&mut s, ta, za, "5");
        let b = save(&mut s, b);

        let removed = s.registry.remove_sign(b).unwrap();
        let touched = release(&mut s.registry, &removed);
        assert_eq!(touched, vec![a]);
        assert_eq!(flags(&s, a), ConflictFlags::default());
    }

    #[test]
    fn test_unchanged_tuple_skips_rescan() {
        let mut s = setup();
        let (ta, za) = (s.template_a, s.zone_a);
        let a = sign(&mut s, ta, za, "5");
        let a = save(&mut s, a);
        let stored = s.registry.sign(a).unwrap();
        let previous = NumberingKey::of(stored);
        let mut edited = stored.clone();
        edited.quantity = 4;
        assert!(!needs_rescan(Some(&previous), &edited));
        edited.number = "6".into();
        assert!(needs_rescan(Some(&previous), &edited));
        assert!(needs_rescan(None, &edited));
    }

    #[test]
    fn test_empty_numbers_conflict() {
        let mut s = setup();
        let (ta, za) = (s.template_a, s.zone_a);
        let a = sign(&mut s, ta, za, "");
        let a = save(&mut s, a);
        let b = sign(&mut s, ta, za, "");
        let b = save(&mut s, b);
        let both = ConflictFlags {
            type_location_number: true,
            location_number: true,
            type_number: true,
        };
        assert_eq!(flags(&s, a), both);
        assert_eq!(flags(&s, b), both);
    }

    #[test]
    fn test_highlight_predicates() {
        let mut project = Project::new(ProjectId::new(1), "P");
        let flags = ConflictFlags {
            type_location_number: false,
            location_number: true,
            type_number: false,
        };

        project.numbering = NumberingMode::ByLocation;
        assert!(should_highlight_location(&project, &flags));
        assert!(!should_highlight_type(&project, &flags));
        assert!(should_highlight_number(&project, &flags));

        project.numbering = NumberingMode::ByType;
        assert!(!should_highlight_number(&project, &flags));

        project.numbering = NumberingMode::ByLocation;
        project.highlight_duplication = false;
        assert!(!should_highlight_number(&project, &flags));
    }
}
