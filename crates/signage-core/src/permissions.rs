//! Object permissions tied to workflow state
//!
//! A sign's state decides which groups may change, view or review it. A
//! position is visible to the union of the groups of its signs, so position
//! grants only shrink once no other sign at the position still needs them.

use crate::identity::{GroupId, PositionId, SignId, StateId};
use crate::model::{Phase, Sign, State};
use crate::registry::Registry;
use crate::{Error, Result};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ChangeSign,
    ViewSign,
    ReviewSign,
    ChangePosition,
    ViewPosition,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ChangeSign => "change_sign",
            Permission::ViewSign => "view_sign",
            Permission::ReviewSign => "review_sign",
            Permission::ChangePosition => "change_position",
            Permission::ViewPosition => "view_position",
        }
    }
}

/// Object a permission is held on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectRef {
    Sign(SignId),
    Position(PositionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub group: GroupId,
    pub permission: Permission,
    pub object: ObjectRef,
}

/// Per-object group permission storage
///
/// Granting a held permission and revoking a missing one are both no-ops.
pub trait GrantStore {
    fn grant(&mut self, group: GroupId, permission: Permission, object: ObjectRef);
    fn revoke(&mut self, group: GroupId, permission: Permission, object: ObjectRef);
    fn has(&self, group: GroupId, permission: Permission, object: ObjectRef) -> bool;
}

/// Grant set kept in memory (persisted by the db crate)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryGrants {
    grants: IndexSet<Grant>,
}

impl InMemoryGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Grant> {
        self.grants.iter()
    }

    /// Permissions a group holds on one object
    pub fn perms(&self, group: GroupId, object: ObjectRef) -> Vec<Permission> {
        self.grants
            .iter()
            .filter(|g| g.group == group && g.object == object)
            .map(|g| g.permission)
            .collect()
    }
}

impl GrantStore for InMemoryGrants {
    fn grant(&mut self, group: GroupId, permission: Permission, object: ObjectRef) {
        self.grants.insert(Grant {
            group,
            permission,
            object,
        });
    }

    fn revoke(&mut self, group: GroupId, permission: Permission, object: ObjectRef) {
        self.grants.shift_remove(&Grant {
            group,
            permission,
            object,
        });
    }

    fn has(&self, group: GroupId, permission: Permission, object: ObjectRef) -> bool {
        self.grants.contains(&Grant {
            group,
            permission,
            object,
        })
    }
}

/// The three groups a state hands permissions to
#[derive(Debug, Clone, Copy)]
struct StateGroups {
    phase_member: GroupId,
    phase_viewer: GroupId,
    state_viewer: GroupId,
}

impl StateGroups {
    fn of(state: &State, phase: &Phase) -> Self {
        Self {
            phase_member: phase.member_group,
            phase_viewer: phase.viewer_group,
            state_viewer: state.viewer_group,
        }
    }

    fn sign_grants(&self) -> [(GroupId, Permission); 5] {
        [
            (self.phase_member, Permission::ChangeSign),
            (self.phase_member, Permission::ViewSign),
            (self.phase_viewer, Permission::ViewSign),
            (self.state_viewer, Permission::ViewSign),
            (self.state_viewer, Permission::ReviewSign),
        ]
    }

    /// Position grant paired with the sign grant that justifies it
    fn position_grants(&self) -> [(GroupId, Permission, Permission); 4] {
        [
            (self.phase_member, Permission::ChangeSign, Permission::ChangePosition),
            (self.phase_member, Permission::ViewSign, Permission::ViewPosition),
            (self.phase_viewer, Permission::ViewSign, Permission::ViewPosition),
            (self.state_viewer, Permission::ViewSign, Permission::ViewPosition),
        ]
    }
}

fn state_groups(registry: &Registry, state: StateId) -> Result<StateGroups> {
    let state = registry.require_state(state)?;
    let phase = registry.require_phase(state.phase)?;
    Ok(StateGroups::of(state, phase))
}

/// Move a sign's grants from `old_state` to its current state
///
/// Run after the sign is written. An old state that no longer exists is
/// treated as no previous state.
pub fn resync(
    registry: &Registry,
    grants: &mut impl GrantStore,
    sign: &Sign,
    old_state: Option<StateId>,
) -> Result<()> {
    let new_state = sign.state.ok_or(Error::MissingState(sign.id.raw()))?;
    let new = state_groups(registry, new_state)?;
    let sign_ref = ObjectRef::Sign(sign.id);
    let position_ref = ObjectRef::Position(sign.position);

    if let Some(old) = old_state.filter(|id| registry.state(*id).is_some()) {
        let old = state_groups(registry, old)?;
        for (group, permission) in old.sign_grants() {
            grants.revoke(group, permission, sign_ref);
        }

        let others: Vec<SignId> = registry
            .signs_at_position(sign.position)
            .filter(|s| s.id != sign.id)
            .map(|s| s.id)
            .collect();
        for (group, sign_perm, position_perm) in old.position_grants() {
            let still_needed = others
                .iter()
                .any(|other| grants.has(group, sign_perm, ObjectRef::Sign(*other)));
            if !still_needed {
                grants.revoke(group, position_perm, position_ref);
            }
        }
    }

    for (group, permission) in new.sign_grants() {
        grants.grant(group, permission, sign_ref);
    }
    for (group, _, permission) in new.position_grants() {
        grants.grant(group, permission, position_ref);
    }

    tracing::debug!(sign = %sign.id, state = %new_state, "Permissions synced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::*;
    use crate::model::*;

    struct Fixture {
        registry: Registry,
        position: PositionId,
        design_s1: StateId,
        design_s2: StateId,
        build: StateId,
    }

    fn group(n: u64) -> GroupId {
        GroupId::new(n)
    }

    fn fixture() -> Fixture {
        let mut registry = Registry::new();
        let project = ProjectId::new(registry.allocate());
        let zone = ZoneId::new(registry.allocate());
        registry.insert_zone(Zone::new(zone, project, "Ground"));
        let position = PositionId::new(registry.allocate());
        registry
            .save_position(Position::new(position, zone, 0.0, 0.0))
            .unwrap();

        let flow = WorkflowId::new(registry.allocate());
        registry.insert_workflow(Workflow {
            id: flow,
            project,
            name: "Default".into(),
            order: 1,
        });

        let phase = |registry: &mut Registry, member: u64, viewer: u64| {
            let id = PhaseId::new(registry.allocate());
            registry.insert_phase(Phase {
                id,
                project,
                name: format!("phase {}", member),
                order: 1,
                member_group: group(member),
                viewer_group: group(viewer),
                zones: Default::default(),
                templates: Default::default(),
            });
            id
        };
        let design = phase(&mut registry, 10, 11);
        let build = phase(&mut registry, 20, 21);

        let state = |registry: &mut Registry, phase: PhaseId, viewer: u64| {
            let id = StateId::new(registry.allocate());
            registry.insert_state(State {
                id,
                workflow: flow,
                phase,
                name: format!("state {}", viewer),
                order: 1,
                viewer_group: group(viewer),
            });
            id
        };
        let design_s1 = state(&mut registry, design, 12);
        let design_s2 = state(&mut registry, design, 13);
        let build_state = state(&mut registry, build, 22);

        Fixture {
            registry,
            position,
            design_s1,
            design_s2,
            build: build_state,
        }
    }

    fn place(w: &mut Fixture, state: StateId) -> Sign {
        let mut sign = w.registry.new_sign(w.position);
        sign.state = Some(state);
        w.registry.insert_sign(sign.clone());
        sign
    }

    fn transition(w: &mut Fixture, grants: &mut InMemoryGrants, sign: &mut Sign, to: StateId) {
        let old = sign.state;
        sign.state = Some(to);
        w.registry.insert_sign(sign.clone());
        resync(&w.registry, grants, sign, old).unwrap();
    }

    #[test]
    fn test_initial_grants() {
        let mut w = fixture();
        let design_s1 = w.design_s1;
        let mut grants = InMemoryGrants::new();
        let sign = place(&mut w, design_s1);
        resync(&w.registry, &mut grants, &sign, None).unwrap();

        let on_sign = ObjectRef::Sign(sign.id);
        assert_eq!(
            grants.perms(group(10), on_sign),
            vec![Permission::ChangeSign, Permission::ViewSign]
        );
        assert_eq!(grants.perms(group(11), on_sign), vec![Permission::ViewSign]);
        assert_eq!(
            grants.perms(group(12), on_sign),
            vec![Permission::ViewSign, Permission::ReviewSign]
        );
        let on_position = ObjectRef::Position(w.position);
        assert!(grants.has(group(10), Permission::ChangePosition, on_position));
        assert!(grants.has(group(12), Permission::ViewPosition, on_position));
    }

    #[test]
    fn test_same_phase_move_keeps_member_grant() {
        let mut w = fixture();
        let design_s1 = w.design_s1;
        let mut grants = InMemoryGrants::new();
        let mut sign = place(&mut w, design_s1);
        resync(&w.registry, &mut grants, &sign, None).unwrap();

        let s2 = w.design_s2;
        transition(&mut w, &mut grants, &mut sign, s2);
        let on_sign = ObjectRef::Sign(sign.id);
        assert!(grants.has(group(10), Permission::ChangeSign, on_sign));
        assert!(!grants.has(group(12), Permission::ViewSign, on_sign));
        assert!(!grants.has(group(12), Permission::ReviewSign, on_sign));
        assert!(grants.has(group(13), Permission::ReviewSign, on_sign));
    }

    #[test]
    fn test_position_grants_kept_for_remaining_sign() {
        let mut w = fixture();
        let design_s1 = w.design_s1;
        let mut grants = InMemoryGrants::new();
        let mut moving = place(&mut w, design_s1);
        resync(&w.registry, &mut grants, &moving, None).unwrap();
        let staying = place(&mut w, design_s1);
        resync(&w.registry, &mut grants, &staying, None).unwrap();

        let build = w.build;
        transition(&mut w, &mut grants, &mut moving, build);

        let on_position = ObjectRef::Position(w.position);
        // design groups still justified by the remaining sign
        assert!(grants.has(group(10), Permission::ChangePosition, on_position));
        assert!(grants.has(group(11), Permission::ViewPosition, on_position));
        assert!(grants.has(group(12), Permission::ViewPosition, on_position));
        // build groups added
        assert!(grants.has(group(20), Permission::ChangePosition, on_position));
        assert!(grants.has(group(22), Permission::ViewPosition, on_position));

        // once the last design sign moves, the design grants go
        let mut staying = staying;
        transition(&mut w, &mut grants, &mut staying, build);
        assert!(!grants.has(group(10), Permission::ChangePosition, on_position));
        assert!(!grants.has(group(12), Permission::ViewPosition, on_position));
        assert!(grants.has(group(20), Permission::ChangePosition, on_position));
    }

    #[test]
    fn test_resync_is_idempotent() {
        let mut w = fixture();
        let design_s1 = w.design_s1;
        let mut grants = InMemoryGrants::new();
        let sign = place(&mut w, design_s1);
        resync(&w.registry, &mut grants, &sign, None).unwrap();
        let before = grants.len();
        resync(&w.registry, &mut grants, &sign, None).unwrap();
        assert_eq!(grants.len(), before);
    }

    #[test]
    fn test_resync_without_state() {
        let mut w = fixture();
        let mut grants = InMemoryGrants::new();
        let sign = w.registry.new_sign(w.position);
        assert!(matches!(
            resync(&w.registry, &mut grants, &sign, None),
            Err(Error::MissingState(_))
        ));
        assert!(grants.is_empty());
    }
}
