//! In-memory storage for all project records

use crate::identity::*;
use crate::model::*;
use crate::value::{AttributeValues, Palette};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Zone and template trees are shallow; anything deeper is a parent cycle
const MAX_TREE_DEPTH: usize = 32;

macro_rules! table {
    ($field:ident, $ty:ty, $id:ty, $kind:literal, $get:ident, $get_mut:ident, $require:ident, $insert:ident, $remove:ident) => {
        pub fn $get(&self, id: $id) -> Option<&$ty> {
            self.$field.get(&id)
        }

        pub fn $get_mut(&mut self, id: $id) -> Option<&mut $ty> {
            self.$field.get_mut(&id)
        }

        pub fn $require(&self, id: $id) -> Result<&$ty> {
            self.$field
                .get(&id)
                .ok_or_else(|| Error::not_found($kind, id.raw()))
        }

        pub fn $insert(&mut self, record: $ty) {
            self.$field.insert(record.id, record);
        }

        pub fn $remove(&mut self, id: $id) -> Option<$ty> {
            self.$field.shift_remove(&id)
        }

        pub fn $field(&self) -> impl Iterator<Item = &$ty> {
            self.$field.values()
        }
    };
}

/// Storage for every record of a deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    projects: IndexMap<ProjectId, Project>,
    zones: IndexMap<ZoneId, Zone>,
    positions: IndexMap<PositionId, Position>,
    templates: IndexMap<TemplateId, SignTemplate>,
    attributes: IndexMap<AttributeId, Attribute>,
    workflows: IndexMap<WorkflowId, Workflow>,
    phases: IndexMap<PhaseId, Phase>,
    states: IndexMap<StateId, State>,
    groups: IndexMap<GroupId, Group>,
    tags: IndexMap<TagId, Tag>,
    colors: IndexMap<ColorId, Color>,
    icons: IndexMap<IconId, Icon>,
    signs: IndexMap<SignId, Sign>,
    /// Next record ID to assign (shared by all tables)
    next_id: u64,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Reserve a fresh record ID
    pub fn allocate(&mut self) -> u64 {
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    table!(projects, Project, ProjectId, "project", project, project_mut, require_project, insert_project, remove_project);
    table!(zones, Zone, ZoneId, "zone", zone, zone_mut, require_zone, insert_zone, remove_zone);
    table!(positions, Position, PositionId, "position", position, position_mut, require_position, insert_position, remove_position);
    table!(templates, SignTemplate, TemplateId, "template", template, template_mut, require_template, insert_template, remove_template);
    table!(attributes, Attribute, AttributeId, "attribute", attribute, attribute_mut, require_attribute, insert_attribute, remove_attribute);
    table!(workflows, Workflow, WorkflowId, "workflow", workflow, workflow_mut, require_workflow, insert_workflow, remove_workflow);
    table!(phases, Phase, PhaseId, "phase", phase, phase_mut, require_phase, insert_phase, remove_phase);
    table!(states, State, StateId, "state", state, state_mut, require_state, insert_state, remove_state);
    table!(groups, Group, GroupId, "group", group, group_mut, require_group, insert_group, remove_group);
    table!(tags, Tag, TagId, "tag", tag, tag_mut, require_tag, insert_tag, remove_tag);
    table!(colors, Color, ColorId, "color", color_record, color_mut, require_color, insert_color, remove_color);
    table!(icons, Icon, IconId, "icon", icon_record, icon_mut, require_icon, insert_icon, remove_icon);
    table!(signs, Sign, SignId, "sign", sign, sign_mut, require_sign, insert_sign, remove_sign);

    /// Build an unsaved sign with a fresh ID
    pub fn new_sign(&mut self, position: PositionId) -> Sign {
        let id = SignId::new(self.allocate());
        Sign::new(id, position)
    }

    /// Build an unsaved message row with a fresh ID
    pub fn new_message(&mut self, values: AttributeValues) -> SignMessage {
        SignMessage {
            id: MessageId::new(self.allocate()),
            values,
        }
    }

    /// Insert a position, deriving its project from the zone
    pub fn save_position(&mut self, mut position: Position) -> Result<PositionId> {
        let zone = self.require_zone(position.zone)?;
        position.project = Some(zone.project);
        let id = position.id;
        self.positions.insert(id, position);
        Ok(id)
    }

    pub fn signs_at_position(&self, position: PositionId) -> impl Iterator<Item = &Sign> {
        self.signs.values().filter(move |s| s.position == position)
    }

    pub fn signs_with_tag(&self, tag: TagId) -> impl Iterator<Item = &Sign> {
        self.signs.values().filter(move |s| s.tags.contains(&tag))
    }

    pub fn sign_count(&self) -> usize {
        self.signs.len()
    }

    /// Zone followed by its ancestors, root last
    pub fn zone_ancestry(&self, id: ZoneId) -> Vec<&Zone> {
        let mut chain = Vec::new();
        let mut next = self.zones.get(&id);
        while let Some(zone) = next {
            if chain.len() >= MAX_TREE_DEPTH {
                break;
            }
            chain.push(zone);
            next = zone.parent.and_then(|p| self.zones.get(&p));
        }
        chain
    }

    /// Template followed by its ancestors, root last
    pub fn template_ancestry(&self, id: TemplateId) -> Vec<&SignTemplate> {
        let mut chain = Vec::new();
        let mut next = self.templates.get(&id);
        while let Some(template) = next {
            if chain.len() >= MAX_TREE_DEPTH {
                break;
            }
            chain.push(template);
            next = template.parent.and_then(|p| self.templates.get(&p));
        }
        chain
    }

    /// Short codes from the root zone down, e.g. `"B1L2"`
    pub fn zone_full_short_code(&self, id: ZoneId) -> String {
        self.zone_ancestry(id)
            .iter()
            .rev()
            .map(|z| z.short_code.as_str())
            .collect()
    }

    pub fn template_full_short_code(&self, id: TemplateId) -> String {
        self.template_ancestry(id)
            .iter()
            .rev()
            .map(|t| t.short_code.as_str())
            .collect()
    }

    /// Dotted, zero padded `order` path used for sorting
    pub fn zone_global_order_id(&self, id: ZoneId) -> String {
        order_path(self.zone_ancestry(id).iter().rev().map(|z| z.order))
    }

    pub fn template_global_order_id(&self, id: TemplateId) -> String {
        order_path(self.template_ancestry(id).iter().rev().map(|t| t.order))
    }

    pub fn phase_global_order_id(&self, id: PhaseId) -> String {
        order_path(self.phases.get(&id).map(|p| p.order))
    }

    pub fn state_global_order_id(&self, id: StateId) -> String {
        match self.states.get(&id) {
            Some(state) => {
                let workflow = self.workflows.get(&state.workflow).map(|w| w.order);
                order_path(workflow.into_iter().chain(Some(state.order)))
            }
            None => String::new(),
        }
    }

    /// Attribute declared with a slug (first match wins)
    pub fn attribute_by_slug(&self, slug: &str) -> Option<&Attribute> {
        self.attributes.values().find(|a| a.slug == slug)
    }

    /// Declared attributes of a template, in declaration order
    pub fn template_attributes(
        &self,
        template: &SignTemplate,
        repeating: bool,
    ) -> Vec<&Attribute> {
        template
            .attributes
            .iter()
            .filter(|ta| ta.is_repeating == repeating)
            .filter_map(|ta| self.attributes.get(&ta.attribute))
            .collect()
    }
}

fn order_path(orders: impl IntoIterator<Item = u32>) -> String {
    orders
        .into_iter()
        .map(|o| format!("{:05}", o))
        .collect::<Vec<_>>()
        .join(".")
}

impl Palette for Registry {
    fn color(&self, id: ColorId) -> Option<&Color> {
        self.colors.get(&id)
    }

    fn icon(&self, id: IconId) -> Option<&Icon> {
        self.icons.get(&id)
    }
}
