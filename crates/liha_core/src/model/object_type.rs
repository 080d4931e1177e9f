//! Object type (user-defined schema) model.
//!
//! # Responsibility
//! - Describe one table-like schema and its presentation metadata.
//! - Carry the ordered property types when a caller asks for a full view.
//!
//! # Invariants
//! - `id` is never nil and never reused for another type.
//! - `name` has at least two characters after trimming.
//! - `property_types` is derived data; storage never reads it back from the
//!   `object_type` row.

use crate::model::property_type::PropertyType;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for object types.
pub type ObjectTypeId = Uuid;

const MIN_NAME_CHARS: usize = 2;

/// Intrinsic behavior/category tag of an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseObjectType {
    Page,
    File,
    Video,
    Drawing,
    Task,
    Link,
    Note,
    Tag,
}

impl BaseObjectType {
    /// Every known base type, in declaration order.
    pub const ALL: [BaseObjectType; 8] = [
        Self::Page,
        Self::File,
        Self::Video,
        Self::Drawing,
        Self::Task,
        Self::Link,
        Self::Note,
        Self::Tag,
    ];

    /// Storage/wire tag for this base type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::File => "file",
            Self::Video => "video",
            Self::Drawing => "drawing",
            Self::Task => "task",
            Self::Link => "link",
            Self::Note => "note",
            Self::Tag => "tag",
        }
    }

    /// Parses a storage/wire tag. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|base| base.as_str() == value)
    }
}

/// User-defined schema: a named set of typed property definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    pub id: ObjectTypeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    /// Built-in types are `fixed`; user-created ones are not.
    #[serde(default)]
    pub fixed: bool,
    #[serde(rename = "baseType")]
    pub base_object_type: BaseObjectType,
    /// Populated only by full reads, in registration order.
    #[serde(rename = "properties", default)]
    pub property_types: Vec<PropertyType>,
}

impl ObjectType {
    /// Creates a user (non-fixed) object type with a generated id.
    pub fn new(name: impl Into<String>, base_object_type: BaseObjectType) -> Self {
        Self::with_id(Uuid::new_v4(), name, base_object_type)
    }

    /// Creates an object type with a caller-provided id.
    ///
    /// Used for built-in types whose ids are fixed across installs.
    pub fn with_id(
        id: ObjectTypeId,
        name: impl Into<String>,
        base_object_type: BaseObjectType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            color: String::new(),
            icon: String::new(),
            fixed: false,
            base_object_type,
            property_types: Vec::new(),
        }
    }

    /// Checks identity and naming invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("object_type.id"));
        }
        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            return Err(ValidationError::NameTooShort {
                min_chars: MIN_NAME_CHARS,
            });
        }
        Ok(())
    }
}
