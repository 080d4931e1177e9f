//! Repository error taxonomy.
//!
//! # Invariants
//! - SQLite constraint failures (unique, foreign key, check) surface as
//!   `Constraint`, every other engine failure as `Db`.
//! - Coercion failures carry the property type they happened on.

use crate::coercion::CoercionError;
use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity family named by `NotFound` and `Immutable` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    ObjectType,
    PropertyType,
    Object,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectType => f.write_str("object type"),
            Self::PropertyType => f.write_str("property type"),
            Self::Object => f.write_str("object"),
        }
    }
}

/// Error for schema registry and object store operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Unique / foreign-key / check violation reported by SQLite.
    Constraint(rusqlite::Error),
    NotFound {
        entity: EntityKind,
        id: Uuid,
    },
    /// Stored kind is neither a reserved literal nor a reference id.
    UnsupportedPropertyType {
        property_type_id: Uuid,
        kind: String,
    },
    /// A property type default cannot be parsed into its kind.
    InvalidDefault {
        property_type_id: Uuid,
        source: CoercionError,
    },
    /// A caller-supplied property value does not fit its kind.
    InvalidValue {
        property_type_id: Uuid,
        source: CoercionError,
    },
    /// A reference cell targets an object of another type.
    ReferenceTypeMismatch {
        property_type_id: Uuid,
        object_id: Uuid,
        expected: Uuid,
        actual: Uuid,
    },
    /// The object changed since the caller read it.
    Conflict {
        object_id: Uuid,
        expected_version: i64,
        actual_version: i64,
    },
    /// A field that is fixed after creation was changed.
    Immutable {
        entity: EntityKind,
        id: Uuid,
        field: &'static str,
    },
    Serialization(serde_json::Error),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl RepoError {
    /// Maps a coercion failure on a default value.
    pub fn from_default(property_type_id: Uuid, err: CoercionError) -> Self {
        match err {
            CoercionError::UnsupportedPropertyType(kind) => Self::UnsupportedPropertyType {
                property_type_id,
                kind,
            },
            other => Self::InvalidDefault {
                property_type_id,
                source: other,
            },
        }
    }

    /// Maps a coercion failure on a caller-supplied value.
    pub fn from_value(property_type_id: Uuid, err: CoercionError) -> Self {
        match err {
            CoercionError::UnsupportedPropertyType(kind) => Self::UnsupportedPropertyType {
                property_type_id,
                kind,
            },
            other => Self::InvalidValue {
                property_type_id,
                source: other,
            },
        }
    }

    /// Returns true for `NotFound` errors of any entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(err) => write!(f, "constraint violation: {err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UnsupportedPropertyType {
                property_type_id,
                kind,
            } => write!(
                f,
                "unsupported property type `{kind}` on property type {property_type_id}"
            ),
            Self::InvalidDefault {
                property_type_id,
                source,
            } => write!(
                f,
                "invalid default for property type {property_type_id}: {source}"
            ),
            Self::InvalidValue {
                property_type_id,
                source,
            } => write!(
                f,
                "invalid value for property type {property_type_id}: {source}"
            ),
            Self::ReferenceTypeMismatch {
                property_type_id,
                object_id,
                expected,
                actual,
            } => write!(
                f,
                "property type {property_type_id} expects an object of type {expected}, but {object_id} has type {actual}"
            ),
            Self::Conflict {
                object_id,
                expected_version,
                actual_version,
            } => write!(
                f,
                "object {object_id} was modified concurrently: expected version {expected_version}, found {actual_version}"
            ),
            Self::Immutable { entity, id, field } => {
                write!(f, "{entity} {id}: `{field}` cannot be changed")
            }
            Self::Serialization(err) => write!(f, "blob serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Constraint(err) => Some(err),
            Self::InvalidDefault { source, .. } => Some(source),
            Self::InvalidValue { source, .. } => Some(source),
            Self::Serialization(err) => Some(err),
            Self::NotFound { .. }
            | Self::UnsupportedPropertyType { .. }
            | Self::ReferenceTypeMismatch { .. }
            | Self::Conflict { .. }
            | Self::Immutable { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        let is_constraint = matches!(
            &value,
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation
        );
        if is_constraint {
            Self::Constraint(value)
        } else {
            Self::Db(DbError::Sqlite(value))
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
