//! Object (typed record) model.
//!
//! # Responsibility
//! - Define the record shape shared by storage, services and callers.
//! - Define the positioned content blocks and page customization blobs.
//! - Define the single-cell property value used by the EAV table.
//!
//! # Invariants
//! - `id` and `object_type_id` are never nil.
//! - `contents` keys equal the id of the block they hold.
//! - `properties` is assembled from the property table on read; writes only
//!   consult it on update.
//! - `version` is owned by storage and only moves forward.

use crate::model::object_type::ObjectTypeId;
use crate::model::property_type::PropertyTypeId;
use crate::model::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable identifier for objects.
pub type ObjectId = Uuid;

/// Content kind tag used for plain text blocks.
pub const TEXT_CONTENT_KIND: &str = "text";
/// Grid width assigned to blocks appended without explicit geometry.
pub const DEFAULT_CONTENT_WIDTH: i32 = 12;
/// Grid height assigned to blocks appended without explicit geometry.
pub const DEFAULT_CONTENT_HEIGHT: i32 = 12;

/// One positioned block on an object page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    /// Block type tag (`text`, `image`, `todolist`, ...). Kept open so newer
    /// UI block kinds survive a round-trip through older cores.
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Content {
    /// Creates a text block with a fresh id at the grid origin.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: TEXT_CONTENT_KIND.to_string(),
            content: content.into(),
            x: 0,
            y: 0,
            w: DEFAULT_CONTENT_WIDTH,
            h: DEFAULT_CONTENT_HEIGHT,
        }
    }

    fn has_valid_geometry(&self) -> bool {
        self.x >= 0 && self.y >= 0 && self.w > 0 && self.h > 0
    }
}

/// Page-level presentation settings of one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageCustomization {
    pub background_color: String,
    pub background_image: String,
    pub default_font: String,
    pub free_drag: bool,
}

/// One typed value cell for an (object, property type) pair.
///
/// Exactly one value cell is populated for a well-formed row; which one is
/// decided by the owning property type's kind (see `crate::coercion`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Autoincrement surrogate id. `0` until persisted.
    #[serde(default)]
    pub id: i64,
    pub object_id: ObjectId,
    pub property_type_id: PropertyTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_object_id: Option<ObjectId>,
}

impl Property {
    /// Creates an unpersisted cell with every value slot empty.
    pub fn empty(object_id: ObjectId, property_type_id: PropertyTypeId) -> Self {
        Self {
            id: 0,
            object_id,
            property_type_id,
            value: None,
            value_number: None,
            value_boolean: None,
            value_date: None,
            referenced_object_id: None,
        }
    }
}

/// Native form of a property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    /// `None` means the reference is not set yet.
    Reference(Option<ObjectId>),
}

/// Typed record instance of an object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub id: ObjectId,
    /// Serialized as `title` to match the UI schema naming.
    #[serde(rename = "title")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pinned: bool,
    /// Serialized as `type` to match the UI schema naming.
    #[serde(rename = "type")]
    pub object_type_id: ObjectTypeId,
    /// Optimistic-concurrency counter; updates must echo the value they read.
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub contents: BTreeMap<String, Content>,
    #[serde(default)]
    pub page_customization: PageCustomization,
    #[serde(default)]
    pub properties: BTreeMap<PropertyTypeId, Property>,
}

impl Object {
    /// Creates an empty object of the given type with a generated id.
    pub fn new(object_type_id: ObjectTypeId, name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), object_type_id, name)
    }

    /// Creates an empty object with a caller-provided id.
    pub fn with_id(id: ObjectId, object_type_id: ObjectTypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            pinned: false,
            object_type_id,
            version: 0,
            contents: BTreeMap::new(),
            page_customization: PageCustomization::default(),
            properties: BTreeMap::new(),
        }
    }

    /// Inserts a content block under its own id, replacing any previous one.
    pub fn insert_content(&mut self, content: Content) {
        self.contents.insert(content.id.clone(), content);
    }

    /// Checks identity and content-block invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("object.id"));
        }
        if self.object_type_id.is_nil() {
            return Err(ValidationError::NilId("object.object_type_id"));
        }
        for (key, content) in &self.contents {
            if key != &content.id {
                return Err(ValidationError::ContentKeyMismatch {
                    key: key.clone(),
                    id: content.id.clone(),
                });
            }
            if !content.has_valid_geometry() {
                return Err(ValidationError::InvalidContentGeometry(content.id.clone()));
            }
        }
        Ok(())
    }
}
