//! Property type (typed column definition) model.
//!
//! # Responsibility
//! - Describe one typed column of an object type.
//! - Own the tagged `PropertyKind` that replaces the stringly `type` field.
//!
//! # Invariants
//! - The stored `type` text is either a reserved literal
//!   (`text|number|boolean|date`) or the id of the referenced object type.
//! - `is_object_reference` always equals `kind.is_reference()`.
//! - `object_type_id` may be `None` while the owning type is being edited or
//!   after it was deleted.

use crate::coercion::CoercionError;
use crate::model::object_type::ObjectTypeId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for property types.
pub type PropertyTypeId = Uuid;

/// Declared value kind of a property type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyKind {
    Text,
    Number,
    Boolean,
    Date,
    /// Reference to objects of the given object type.
    Reference(ObjectTypeId),
}

impl PropertyKind {
    /// Parses the persisted/wire form of a kind.
    ///
    /// Reserved literals match exactly (lowercase). Anything else must be a
    /// syntactically valid UUID, read as a reference to that object type.
    pub fn parse(raw: &str) -> Result<Self, CoercionError> {
        match raw {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            other => Uuid::parse_str(other)
                .map(Self::Reference)
                .map_err(|_| CoercionError::UnsupportedPropertyType(other.to_string())),
        }
    }

    /// Whether values of this kind point at other objects.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

impl Display for PropertyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::Reference(object_type_id) => write!(f, "{object_type_id}"),
        }
    }
}

impl TryFrom<String> for PropertyKind {
    type Error = CoercionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PropertyKind> for String {
    fn from(value: PropertyKind) -> Self {
        value.to_string()
    }
}

/// Display policy of a property in object views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    HiddenEmpty,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::HiddenEmpty => "hidden_empty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "visible" => Some(Self::Visible),
            "hidden" => Some(Self::Hidden),
            "hidden_empty" => Some(Self::HiddenEmpty),
            _ => None,
        }
    }
}

/// Typed column definition scoped to one object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyType {
    pub id: PropertyTypeId,
    /// Serialized as `type` to match the UI schema naming.
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    pub name: String,
    /// Advisory only; core logic never branches on it.
    #[serde(default)]
    pub ai_automated: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub icon: String,
    /// String-encoded default, parsed per kind when objects are created.
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub is_object_reference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_id: Option<ObjectTypeId>,
}

impl PropertyType {
    /// Creates a visible property type owned by `object_type_id`.
    ///
    /// `is_object_reference` is derived from `kind`.
    pub fn new(
        object_type_id: ObjectTypeId,
        kind: PropertyKind,
        name: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            ai_automated: false,
            visibility: Visibility::Visible,
            icon: String::new(),
            default_value: default_value.into(),
            is_object_reference: kind.is_reference(),
            object_type_id: Some(object_type_id),
        }
    }

    /// Checks identity, naming and reference-flag invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("property_type.id"));
        }
        if self.object_type_id.is_some_and(|id| id.is_nil()) {
            return Err(ValidationError::NilId("property_type.object_type_id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName("property type"));
        }
        if self.is_object_reference != self.kind.is_reference() {
            return Err(ValidationError::ReferenceFlagMismatch(self.id));
        }
        Ok(())
    }
}
