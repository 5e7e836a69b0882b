//! Identity types for project records

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new ID
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the raw ID value
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

record_id!(
    /// Top-level project container
    ProjectId,
    "project"
);
record_id!(
    /// Spatial region within a project
    ZoneId,
    "zone"
);
record_id!(
    /// Located point within a zone
    PositionId,
    "position"
);
record_id!(
    /// A physical sign
    SignId,
    "sign"
);
record_id!(
    /// Sign template (the sign "type")
    TemplateId,
    "template"
);
record_id!(AttributeId, "attribute");
record_id!(
    /// One repeating message row of a sign
    MessageId,
    "message"
);
record_id!(StateId, "state");
record_id!(PhaseId, "phase");
record_id!(WorkflowId, "workflow");
record_id!(
    /// Permission group
    GroupId,
    "group"
);
record_id!(TagId, "tag");
record_id!(ColorId, "color");
record_id!(IconId, "icon");

/// Kind of record that supplied an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Template,
    Zone,
    Position,
    Sign,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Template => "sign_template",
            ContentType::Zone => "zone",
            ContentType::Position => "position",
            ContentType::Sign => "sign",
        }
    }
}

/// Which record supplied a resolved attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub content_type: ContentType,
    pub object_id: u64,
}

impl SourceRef {
    pub fn new(content_type: ContentType, object_id: u64) -> Self {
        Self {
            content_type,
            object_id,
        }
    }

    pub fn template(id: TemplateId) -> Self {
        Self::new(ContentType::Template, id.raw())
    }

    pub fn zone(id: ZoneId) -> Self {
        Self::new(ContentType::Zone, id.raw())
    }

    pub fn position(id: PositionId) -> Self {
        Self::new(ContentType::Position, id.raw())
    }

    pub fn sign(id: SignId) -> Self {
        Self::new(ContentType::Sign, id.raw())
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type.as_str(), self.object_id)
    }
}
