//! Kind-directed value coercion for the property table.
//!
//! # Responsibility
//! - Map a `PropertyKind` to the one storage column its values occupy.
//! - Convert string-encoded values (defaults, CLI input) into native values.
//! - Read and write the designated cell of a `Property`.
//!
//! # Invariants
//! - `column_for` is the only routing table; create and update paths both go
//!   through it, so seeding and later edits always agree on the column.
//! - Every function here is pure; no storage access.
//!
//! | kind        | column                 | string rule                          |
//! |-------------|------------------------|--------------------------------------|
//! | `text`      | `value`                | passthrough                          |
//! | `number`    | `value_number`         | finite f64                           |
//! | `boolean`   | `value_boolean`        | `true`/`false` family, `1`/`0`       |
//! | `date`      | `value_date`           | quotes stripped, RFC 3339            |
//! | reference   | `referenced_object_id` | empty = unset, else object uuid      |

use crate::model::object::{Property, PropertyValue};
use crate::model::property_type::PropertyKind;
use chrono::{DateTime, SecondsFormat, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage cell of the `property` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyColumn {
    Value,
    ValueNumber,
    ValueBoolean,
    ValueDate,
    ReferencedObjectId,
}

impl PropertyColumn {
    /// Column name in the `property` table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::ValueNumber => "value_number",
            Self::ValueBoolean => "value_boolean",
            Self::ValueDate => "value_date",
            Self::ReferencedObjectId => "referenced_object_id",
        }
    }
}

/// Errors raised while interpreting kinds or values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// Kind text is neither a reserved literal nor a valid uuid.
    UnsupportedPropertyType(String),
    /// String input cannot be parsed into the declared kind.
    InvalidDefault {
        kind: PropertyKind,
        value: String,
        reason: String,
    },
    /// The designated cell of a property is empty.
    MissingValue { kind: PropertyKind },
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPropertyType(kind) => {
                write!(f, "unsupported property type: `{kind}`")
            }
            Self::InvalidDefault {
                kind,
                value,
                reason,
            } => write!(f, "invalid {kind} value `{value}`: {reason}"),
            Self::MissingValue { kind } => {
                write!(f, "missing value for {kind} property")
            }
        }
    }
}

impl Error for CoercionError {}

/// Returns the storage column for values of `kind`.
pub fn column_for(kind: PropertyKind) -> PropertyColumn {
    match kind {
        PropertyKind::Text => PropertyColumn::Value,
        PropertyKind::Number => PropertyColumn::ValueNumber,
        PropertyKind::Boolean => PropertyColumn::ValueBoolean,
        PropertyKind::Date => PropertyColumn::ValueDate,
        PropertyKind::Reference(_) => PropertyColumn::ReferencedObjectId,
    }
}

/// Parses a string-encoded value (typically a property type default).
pub fn parse_value(kind: PropertyKind, raw: &str) -> Result<PropertyValue, CoercionError> {
    let invalid = |reason: String| CoercionError::InvalidDefault {
        kind,
        value: raw.to_string(),
        reason,
    };

    match kind {
        PropertyKind::Text => Ok(PropertyValue::Text(raw.to_string())),
        PropertyKind::Number => {
            let number = raw
                .trim()
                .parse::<f64>()
                .map_err(|err| invalid(err.to_string()))?;
            if !number.is_finite() {
                return Err(invalid("number must be finite".to_string()));
            }
            Ok(PropertyValue::Number(number))
        }
        PropertyKind::Boolean => parse_bool(raw.trim())
            .map(PropertyValue::Boolean)
            .ok_or_else(|| invalid("expected true or false".to_string())),
        PropertyKind::Date => parse_rfc3339(raw.trim_matches('"'))
            .map(PropertyValue::Date)
            .map_err(invalid),
        PropertyKind::Reference(_) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(PropertyValue::Reference(None));
            }
            Uuid::parse_str(trimmed)
                .map(|id| PropertyValue::Reference(Some(id)))
                .map_err(|err| invalid(err.to_string()))
        }
    }
}

/// Resolves the `(column, value)` pair seeded from a default string.
pub fn resolve_default(
    kind: PropertyKind,
    raw: &str,
) -> Result<(PropertyColumn, PropertyValue), CoercionError> {
    Ok((column_for(kind), parse_value(kind, raw)?))
}

/// Resolves the `(column, value)` pair held by a caller-supplied property.
pub fn resolve_current(
    kind: PropertyKind,
    property: &Property,
) -> Result<(PropertyColumn, PropertyValue), CoercionError> {
    Ok((column_for(kind), read_cell(kind, property)?))
}

/// Reads the designated cell of `property` for `kind`.
///
/// Reference cells may be empty (unset reference); every other kind
/// requires its cell to be populated.
pub fn read_cell(kind: PropertyKind, property: &Property) -> Result<PropertyValue, CoercionError> {
    let missing = || CoercionError::MissingValue { kind };
    match column_for(kind) {
        PropertyColumn::Value => property
            .value
            .clone()
            .map(PropertyValue::Text)
            .ok_or_else(missing),
        PropertyColumn::ValueNumber => property
            .value_number
            .map(PropertyValue::Number)
            .ok_or_else(missing),
        PropertyColumn::ValueBoolean => property
            .value_boolean
            .map(PropertyValue::Boolean)
            .ok_or_else(missing),
        PropertyColumn::ValueDate => property
            .value_date
            .map(PropertyValue::Date)
            .ok_or_else(missing),
        PropertyColumn::ReferencedObjectId => {
            Ok(PropertyValue::Reference(property.referenced_object_id))
        }
    }
}

/// Stores `value` into its cell, clearing every other cell.
pub fn write_cell(property: &mut Property, value: PropertyValue) {
    property.value = None;
    property.value_number = None;
    property.value_boolean = None;
    property.value_date = None;
    property.referenced_object_id = None;

    match value {
        PropertyValue::Text(text) => property.value = Some(text),
        PropertyValue::Number(number) => property.value_number = Some(number),
        PropertyValue::Boolean(flag) => property.value_boolean = Some(flag),
        PropertyValue::Date(date) => property.value_date = Some(date),
        PropertyValue::Reference(target) => property.referenced_object_id = target,
    }
}

/// Formats a date for the `value_date` column, keeping sub-second precision.
pub fn format_date(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| err.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "TRUE" | "True" | "t" | "T" | "1" => Some(true),
        "false" | "FALSE" | "False" | "f" | "F" | "0" => Some(false),
        _ => None,
    }
}
