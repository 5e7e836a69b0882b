//! Project records: zones, positions, templates, workflow and signs

use crate::identity::*;
use crate::value::{AttributeGroup, AttributeValues, FieldType};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// How new sign numbers are assigned (and which numbering duplicates matter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NumberingMode {
    /// Numbers are typed by hand
    #[default]
    Manual,
    /// Unique per zone
    ByLocation,
    /// Unique per zone and template
    ByTypeLocation,
    /// Unique per template
    ByType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub numbering: NumberingMode,
    /// Highlight duplicate numbers on the sign form
    pub highlight_duplication: bool,
    /// Label template, e.g. `"{type}-{location}-{number}"`
    pub sign_id_template: String,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            numbering: NumberingMode::Manual,
            highlight_duplication: true,
            sign_id_template: "{type}-{location}-{number}".to_string(),
        }
    }
}

/// Linear mapping between map coordinates and blueprint pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Latitude of the top left pixel
    pub origin_lat: f64,
    /// Longitude of the top left pixel
    pub origin_lng: f64,
    /// Degrees of latitude per pixel (negative: y grows southward)
    pub lat_per_px: f64,
    /// Degrees of longitude per pixel
    pub lng_per_px: f64,
}

impl Blueprint {
    pub fn xy_for_latlng(&self, lat: f64, lng: f64) -> (i64, i64) {
        let x = (lng - self.origin_lng) / self.lng_per_px;
        let y = (lat - self.origin_lat) / self.lat_per_px;
        (x.round() as i64, y.round() as i64)
    }

    pub fn latlng_for_xy(&self, x: i64, y: i64) -> (f64, f64) {
        (
            self.origin_lat + y as f64 * self.lat_per_px,
            self.origin_lng + x as f64 * self.lng_per_px,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub project: ProjectId,
    pub parent: Option<ZoneId>,
    pub name: String,
    pub short_code: String,
    pub order: u32,
    pub attributes: AttributeValues,
    pub blueprint: Option<Blueprint>,
}

impl Zone {
    pub fn new(id: ZoneId, project: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            project,
            parent: None,
            name: name.into(),
            short_code: String::new(),
            order: 0,
            attributes: AttributeValues::new(),
            blueprint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub zone: ZoneId,
    /// Set from the zone on every save
    pub project: Option<ProjectId>,
    pub lat: f64,
    pub lng: f64,
    pub is_visible: bool,
    pub attributes: AttributeValues,
}

impl Position {
    pub fn new(id: PositionId, zone: ZoneId, lat: f64, lng: f64) -> Self {
        Self {
            id,
            zone,
            project: None,
            lat,
            lng,
            is_visible: true,
            attributes: AttributeValues::new(),
        }
    }

    /// Pixel offset from the top left of the zone blueprint, `(-1, -1)` without one
    pub fn xy(&self, zone: &Zone) -> (i64, i64) {
        zone.blueprint
            .map(|bp| bp.xy_for_latlng(self.lat, self.lng))
            .unwrap_or((-1, -1))
    }

    /// Move to a pixel offset; no-op when the zone has no blueprint
    pub fn set_xy(&mut self, zone: &Zone, x: i64, y: i64) {
        if let Some(bp) = zone.blueprint {
            let (lat, lng) = bp.latlng_for_xy(x, y);
            self.lat = lat;
            self.lng = lng;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub slug: String,
    pub name: String,
    pub field_type: FieldType,
    pub group: AttributeGroup,
    /// Inherited from zones/positions rather than typed per sign
    pub is_inheritable: bool,
    /// Value declared by templates using this attribute
    pub default_value: Option<String>,
}

impl Attribute {
    pub fn new(id: AttributeId, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            field_type: FieldType::Text,
            group: AttributeGroup::Message,
            is_inheritable: false,
            default_value: None,
        }
    }
}

/// An attribute declared on a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateAttribute {
    pub attribute: AttributeId,
    /// One value per message row instead of one per sign
    pub is_repeating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignTemplate {
    pub id: TemplateId,
    pub project: ProjectId,
    pub parent: Option<TemplateId>,
    pub name: String,
    pub short_code: String,
    pub order: u32,
    pub svg_code: Option<String>,
    pub fonts: Vec<Font>,
    pub attributes: Vec<TemplateAttribute>,
    /// Message rows per column
    pub number_of_messages: u32,
    pub number_of_sides: u32,
    pub number_of_columns: u32,
}

impl SignTemplate {
    pub fn new(id: TemplateId, project: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            project,
            parent: None,
            name: name.into(),
            short_code: String::new(),
            order: 0,
            svg_code: None,
            fonts: Vec::new(),
            attributes: Vec::new(),
            number_of_messages: 0,
            number_of_sides: 1,
            number_of_columns: 1,
        }
    }

    pub fn has_svg(&self) -> bool {
        self.svg_code.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Total message rows across all sides and columns
    pub fn number_of_repeating(&self) -> usize {
        (self.number_of_messages * self.number_of_sides.max(1) * self.number_of_columns.max(1))
            as usize
    }

    /// Row index -> side number, for rows that start a side block
    pub fn side_starts(&self) -> Vec<(usize, u32)> {
        if self.number_of_sides <= 1 {
            return Vec::new();
        }
        let per_side = (self.number_of_messages * self.number_of_columns.max(1)) as usize;
        (0..self.number_of_sides)
            .map(|i| (i as usize * per_side, i + 1))
            .collect()
    }

    /// Row index -> column number, for rows that start a column block
    pub fn column_starts(&self) -> Vec<(usize, u32)> {
        if self.number_of_columns <= 1 {
            return Vec::new();
        }
        let msgs = self.number_of_messages as usize;
        let mut starts = Vec::new();
        for side in 0..self.number_of_sides.max(1) as usize {
            for col in 0..self.number_of_columns as usize {
                let index = side * self.number_of_columns as usize * msgs + col * msgs;
                starts.push((index, col as u32 + 1));
            }
        }
        starts
    }

    pub fn fonts_list(&self) -> Vec<String> {
        self.fonts.iter().map(|f| f.family.clone()).collect()
    }

    /// SVG template preceded by an `@font-face` block for every font
    pub fn svg_code_with_fonts(&self) -> String {
        let svg = self.svg_code.clone().unwrap_or_default();
        if self.fonts.is_empty() {
            return svg;
        }
        let mut out = String::from("<style>");
        for font in &self.fonts {
            out.push_str(&format!(
                "@font-face{{font-family:'{}';src:url('{}');}}",
                font.family, font.url
            ));
        }
        out.push_str("</style>");
        out.push_str(&svg);
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub project: ProjectId,
    pub name: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub project: ProjectId,
    pub name: String,
    pub order: u32,
    pub member_group: GroupId,
    pub viewer_group: GroupId,
    /// Zones and templates this phase covers
    pub zones: IndexSet<ZoneId>,
    pub templates: IndexSet<TemplateId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    pub workflow: WorkflowId,
    pub phase: PhaseId,
    pub name: String,
    pub order: u32,
    pub viewer_group: GroupId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Color {
    pub id: ColorId,
    pub name: String,
    /// Hex value without the leading `#`
    pub color: String,
}

impl Color {
    pub fn hex(&self) -> String {
        format!("#{}", self.color)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Icon {
    pub id: IconId,
    pub name: String,
    /// SVG fragment injected into artwork
    pub svg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReviewState {
    Approved,
    Rejected,
    #[default]
    NeedsReview,
}

/// Precomputed sort fields; the default listing is ordered by `(zone, number)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKeys {
    pub phase: String,
    pub state: String,
    pub zone: String,
    pub template: String,
    pub number: String,
    pub tags: String,
}

/// Duplicate numbering highlights
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictFlags {
    pub type_location_number: bool,
    pub location_number: bool,
    pub type_number: bool,
}

/// Uploaded artwork that replaces the generated one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideArtwork {
    pub file_name: String,
    pub url: String,
    /// Uploaded bytes
    pub source: Vec<u8>,
    /// Preview derived from `source` on save
    pub png: Option<Vec<u8>>,
    /// False once the template or attributes change after the upload
    pub up_to_date: bool,
}

/// One repeating message row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignMessage {
    pub id: MessageId,
    pub values: AttributeValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sign {
    pub id: SignId,
    pub position: PositionId,
    pub template: Option<TemplateId>,
    pub tags: Vec<TagId>,
    pub state: Option<StateId>,
    pub facing_direction: u16,
    pub quantity: u16,
    /// Free text, more a name than an identifier
    pub number: String,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,

    // Shortcut fields, set on save
    pub zone: Option<ZoneId>,
    pub project: Option<ProjectId>,
    pub phase: Option<PhaseId>,
    pub workflow: Option<WorkflowId>,

    pub combined_search_text: String,
    pub sort: SortKeys,
    pub conflicts: ConflictFlags,
    pub override_artwork: Option<OverrideArtwork>,

    // API payloads, refreshed on save
    pub message_json: Option<String>,
    pub repeating_message_json: Option<String>,
    pub meta_json: Option<String>,

    pub review_state: ReviewState,
    pub values: AttributeValues,
    pub messages: Vec<SignMessage>,
}

impl Sign {
    pub fn new(id: SignId, position: PositionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            position,
            template: None,
            tags: Vec::new(),
            state: None,
            facing_direction: 0,
            quantity: 1,
            number: String::new(),
            created_date: now,
            last_modified_date: now,
            zone: None,
            project: None,
            phase: None,
            workflow: None,
            combined_search_text: String::new(),
            sort: SortKeys::default(),
            conflicts: ConflictFlags::default(),
            override_artwork: None,
            message_json: None,
            repeating_message_json: None,
            meta_json: None,
            review_state: ReviewState::NeedsReview,
            values: AttributeValues::new(),
            messages: Vec::new(),
        }
    }

    pub fn set_value(&mut self, slug: impl Into<String>, value: impl Into<String>) {
        self.values.insert(slug.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(sides: u32, cols: u32, msgs: u32) -> SignTemplate {
        let mut t = SignTemplate::new(TemplateId::new(1), ProjectId::new(1), "Room ID");
        t.number_of_sides = sides;
        t.number_of_columns = cols;
        t.number_of_messages = msgs;
        t
    }

    #[test]
    fn test_number_of_repeating() {
        assert_eq!(template(2, 3, 4).number_of_repeating(), 24);
        assert_eq!(template(1, 1, 0).number_of_repeating(), 0);
    }

    #[test]
    fn test_side_and_column_starts() {
        let t = template(2, 2, 3);
        assert_eq!(t.side_starts(), vec![(0, 1), (6, 2)]);
        assert_eq!(t.column_starts(), vec![(0, 1), (3, 2), (6, 1), (9, 2)]);
        assert!(template(1, 1, 3).side_starts().is_empty());
        assert!(template(1, 1, 3).column_starts().is_empty());
    }

    #[test]
    fn test_svg_code_with_fonts() {
        let mut t = template(1, 1, 1);
        assert_eq!(t.svg_code_with_fonts(), "");
        t.svg_code = Some("<svg/>".into());
        t.fonts.push(Font {
            family: "Frutiger".into(),
            url: "https://fonts.example/frutiger.woff".into(),
        });
        let svg = t.svg_code_with_fonts();
        assert!(svg.starts_with("<style>@font-face{font-family:'Frutiger'"));
        assert!(svg.ends_with("</style><svg/>"));
        assert_eq!(t.fonts_list(), vec!["Frutiger".to_string()]);
    }

    #[test]
    fn test_position_xy() {
        let mut zone = Zone::new(ZoneId::new(1), ProjectId::new(1), "Level 1");
        let mut position = Position::new(PositionId::new(1), zone.id, 10.0, 20.0);
        assert_eq!(position.xy(&zone), (-1, -1));

        zone.blueprint = Some(Blueprint {
            origin_lat: 10.0,
            origin_lng: 20.0,
            lat_per_px: -0.5,
            lng_per_px: 0.5,
        });
        position.set_xy(&zone, 4, 6);
        assert_eq!(position.xy(&zone), (4, 6));
        assert_eq!(position.lat, 7.0);
        assert_eq!(position.lng, 22.0);
    }
}
