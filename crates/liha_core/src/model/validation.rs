//! Model-level validation errors.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Invariant violations detected before any SQL runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identity fields must not be the nil UUID.
    NilId(&'static str),
    /// Object type names need at least two visible characters.
    NameTooShort { min_chars: usize },
    /// Property type names must not be blank.
    EmptyName(&'static str),
    /// `is_object_reference` disagrees with the declared kind.
    ReferenceFlagMismatch(Uuid),
    /// A content block is keyed under a different id than its own.
    ContentKeyMismatch { key: String, id: String },
    /// A content block has negative position or empty size.
    InvalidContentGeometry(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId(field) => write!(f, "`{field}` must not be the nil uuid"),
            Self::NameTooShort { min_chars } => {
                write!(f, "name must be at least {min_chars} characters long")
            }
            Self::EmptyName(entity) => write!(f, "{entity} name must not be empty"),
            Self::ReferenceFlagMismatch(id) => write!(
                f,
                "property type {id}: is_object_reference does not match its kind"
            ),
            Self::ContentKeyMismatch { key, id } => {
                write!(f, "content block `{id}` is stored under key `{key}`")
            }
            Self::InvalidContentGeometry(id) => write!(
                f,
                "content block `{id}` needs x/y >= 0 and w/h > 0"
            ),
        }
    }
}

impl Error for ValidationError {}
