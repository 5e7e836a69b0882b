//! Signage Core - sign records, attribute inheritance and derived state
//!
//! This crate holds everything a sign save derives synchronously:
//! - Record types and the in-memory [`Registry`]
//! - Layered attribute resolution (template, zones, position, sign)
//! - Number sort keys and automatic numbering
//! - Duplicate numbering flags
//! - Group permissions that follow workflow state
//! - Domain events, labels and export payloads
//!
//! Rendering lives in `signage-render`; the save pipeline that ties these
//! steps together lives in `signage-hub`.

pub mod attributes;
pub mod conflict;
mod error;
pub mod events;
pub mod export;
mod identity;
pub mod label;
mod model;
pub mod number;
pub mod permissions;
mod registry;
pub mod sort;
mod value;

pub use attributes::{AttributeResolver, ResolvedAttribute, ResolvedAttributes};
pub use conflict::{ConflictScope, NumberingKey};
pub use error::{Error, Result};
pub use events::{DomainEvent, EventBus, Subscriber};
pub use identity::{
    AttributeId, ColorId, ContentType, GroupId, IconId, MessageId, PhaseId, PositionId, ProjectId,
    SignId, SourceRef, StateId, TagId, TemplateId, WorkflowId, ZoneId,
};
pub use model::{
    Attribute, Blueprint, Color, ConflictFlags, Font, Group, Icon, NumberingMode, OverrideArtwork,
    Phase, Position, Project, ReviewState, Sign, SignMessage, SignTemplate, SortKeys, State, Tag,
    TemplateAttribute, Workflow, Zone,
};
pub use permissions::{GrantStore, InMemoryGrants, ObjectRef, Permission};
pub use registry::Registry;
pub use value::{AttributeGroup, AttributeValues, FieldType, Palette, UNKNOWN_VALUE};
