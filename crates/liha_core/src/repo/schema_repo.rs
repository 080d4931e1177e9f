//! Schema registry contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist object type and property type definitions.
//! - Parse stored property kinds once, at this boundary.
//!
//! # Invariants
//! - Ids are unique per table; duplicates surface as `Constraint`.
//! - A non-null `property_type.object_type_id` references an existing type
//!   (enforced by SQLite foreign keys).
//! - A reference kind names an existing object type when it is written.
//! - A property type never moves to another object type; it can only be
//!   detached.
//! - Deleting an object type detaches its property types and never cascades
//!   into objects.
//! - Listing is deterministic: registration order (`rowid ASC`).

use crate::db::migrations::verify_schema;
use crate::model::object_type::{BaseObjectType, ObjectType, ObjectTypeId};
use crate::model::property_type::{PropertyKind, PropertyType, PropertyTypeId, Visibility};
use crate::repo::error::{EntityKind, RepoError, RepoResult};
use crate::repo::{bool_to_int, int_to_bool, parse_uuid};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const OBJECT_TYPE_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    color,
    icon,
    fixed,
    base_object_type
FROM object_type";

const PROPERTY_TYPE_SELECT_SQL: &str = "SELECT
    id,
    type,
    name,
    ai_automated,
    visibility,
    icon,
    default_value,
    is_object_reference,
    object_type_id
FROM property_type";

/// Typed narrowing for object type id listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectTypeFilter {
    pub base_object_type: Option<BaseObjectType>,
    pub fixed: Option<bool>,
}

/// Repository interface for schema definitions.
pub trait SchemaRepository {
    fn create_object_type(&self, object_type: &ObjectType) -> RepoResult<ObjectTypeId>;
    /// Loads the type row only; `property_types` stays empty.
    fn get_object_type(&self, id: ObjectTypeId) -> RepoResult<Option<ObjectType>>;
    fn list_object_type_ids(&self, filter: &ObjectTypeFilter) -> RepoResult<Vec<ObjectTypeId>>;
    fn update_object_type(&self, object_type: &ObjectType) -> RepoResult<()>;
    fn delete_object_type(&self, id: ObjectTypeId) -> RepoResult<()>;
    fn create_property_type(&self, property_type: &PropertyType) -> RepoResult<PropertyTypeId>;
    fn get_property_type(&self, id: PropertyTypeId) -> RepoResult<Option<PropertyType>>;
    fn list_property_type_ids(&self) -> RepoResult<Vec<PropertyTypeId>>;
    fn list_property_types_of(&self, object_type_id: ObjectTypeId)
        -> RepoResult<Vec<PropertyType>>;
    /// Updates every field except the kind, which is immutable. The owner
    /// may be cleared but not changed.
    fn update_property_type(&self, property_type: &PropertyType) -> RepoResult<()>;
    /// Deletes the definition together with its property cells.
    fn delete_property_type(&self, id: PropertyTypeId) -> RepoResult<()>;
}

/// SQLite-backed schema registry.
pub struct SqliteSchemaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSchemaRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        verify_schema(conn)?;
        Ok(Self { conn })
    }

    fn ensure_reference_target(&self, kind: PropertyKind) -> RepoResult<()> {
        let PropertyKind::Reference(target) = kind else {
            return Ok(());
        };
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM object_type WHERE id = ?1);",
            [target.to_string()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::NotFound {
                entity: EntityKind::ObjectType,
                id: target,
            });
        }
        Ok(())
    }
}

impl SchemaRepository for SqliteSchemaRepository<'_> {
    fn create_object_type(&self, object_type: &ObjectType) -> RepoResult<ObjectTypeId> {
        object_type.validate()?;

        self.conn.execute(
            "INSERT INTO object_type (
                id,
                name,
                description,
                color,
                icon,
                fixed,
                base_object_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                object_type.id.to_string(),
                object_type.name.as_str(),
                object_type.description.as_str(),
                object_type.color.as_str(),
                object_type.icon.as_str(),
                bool_to_int(object_type.fixed),
                object_type.base_object_type.as_str(),
            ],
        )?;

        Ok(object_type.id)
    }

    fn get_object_type(&self, id: ObjectTypeId) -> RepoResult<Option<ObjectType>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{OBJECT_TYPE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_object_type_row(row)?));
        }
        Ok(None)
    }

    fn list_object_type_ids(&self, filter: &ObjectTypeFilter) -> RepoResult<Vec<ObjectTypeId>> {
        let mut sql = String::from("SELECT id FROM object_type WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(base) = filter.base_object_type {
            sql.push_str(" AND base_object_type = ?");
            bind_values.push(Value::Text(base.as_str().to_string()));
        }
        if let Some(fixed) = filter.fixed {
            sql.push_str(" AND fixed = ?");
            bind_values.push(Value::Integer(bool_to_int(fixed)));
        }
        sql.push_str(" ORDER BY rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            ids.push(parse_uuid(&id_text, "object_type.id")?);
        }
        Ok(ids)
    }

    fn update_object_type(&self, object_type: &ObjectType) -> RepoResult<()> {
        object_type.validate()?;

        let changed = self.conn.execute(
            "UPDATE object_type
             SET
                name = ?1,
                description = ?2,
                color = ?3,
                icon = ?4,
                fixed = ?5,
                base_object_type = ?6
             WHERE id = ?7;",
            params![
                object_type.name.as_str(),
                object_type.description.as_str(),
                object_type.color.as_str(),
                object_type.icon.as_str(),
                bool_to_int(object_type.fixed),
                object_type.base_object_type.as_str(),
                object_type.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::ObjectType,
                id: object_type.id,
            });
        }
        Ok(())
    }

    fn delete_object_type(&self, id: ObjectTypeId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM object_type WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::ObjectType,
                id,
            });
        }
        Ok(())
    }

    fn create_property_type(&self, property_type: &PropertyType) -> RepoResult<PropertyTypeId> {
        property_type.validate()?;
        self.ensure_reference_target(property_type.kind)?;

        self.conn.execute(
            "INSERT INTO property_type (
                id,
                type,
                name,
                ai_automated,
                visibility,
                icon,
                default_value,
                is_object_reference,
                object_type_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                property_type.id.to_string(),
                property_type.kind.to_string(),
                property_type.name.as_str(),
                bool_to_int(property_type.ai_automated),
                property_type.visibility.as_str(),
                property_type.icon.as_str(),
                property_type.default_value.as_str(),
                bool_to_int(property_type.is_object_reference),
                property_type.object_type_id.map(|id| id.to_string()),
            ],
        )?;

        Ok(property_type.id)
    }

    fn get_property_type(&self, id: PropertyTypeId) -> RepoResult<Option<PropertyType>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROPERTY_TYPE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_property_type_row(row)?));
        }
        Ok(None)
    }

    fn list_property_type_ids(&self) -> RepoResult<Vec<PropertyTypeId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM property_type ORDER BY rowid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            ids.push(parse_uuid(&id_text, "property_type.id")?);
        }
        Ok(ids)
    }

    fn list_property_types_of(
        &self,
        object_type_id: ObjectTypeId,
    ) -> RepoResult<Vec<PropertyType>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROPERTY_TYPE_SELECT_SQL}
             WHERE object_type_id = ?1
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([object_type_id.to_string()])?;
        let mut property_types = Vec::new();
        while let Some(row) = rows.next()? {
            property_types.push(parse_property_type_row(row)?);
        }
        Ok(property_types)
    }

    fn update_property_type(&self, property_type: &PropertyType) -> RepoResult<()> {
        property_type.validate()?;

        let stored: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT type, object_type_id FROM property_type WHERE id = ?1;",
                [property_type.id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((stored_kind, stored_owner)) = stored else {
            return Err(RepoError::NotFound {
                entity: EntityKind::PropertyType,
                id: property_type.id,
            });
        };
        if stored_kind != property_type.kind.to_string() {
            return Err(RepoError::Immutable {
                entity: EntityKind::PropertyType,
                id: property_type.id,
                field: "type",
            });
        }
        let stored_owner = stored_owner
            .map(|value| parse_uuid(&value, "property_type.object_type_id"))
            .transpose()?;
        if property_type.object_type_id.is_some() && property_type.object_type_id != stored_owner {
            return Err(RepoError::Immutable {
                entity: EntityKind::PropertyType,
                id: property_type.id,
                field: "object_type_id",
            });
        }
        self.ensure_reference_target(property_type.kind)?;

        self.conn.execute(
            "UPDATE property_type
             SET
                name = ?1,
                ai_automated = ?2,
                visibility = ?3,
                icon = ?4,
                default_value = ?5,
                is_object_reference = ?6,
                object_type_id = ?7
             WHERE id = ?8;",
            params![
                property_type.name.as_str(),
                bool_to_int(property_type.ai_automated),
                property_type.visibility.as_str(),
                property_type.icon.as_str(),
                property_type.default_value.as_str(),
                bool_to_int(property_type.is_object_reference),
                property_type.object_type_id.map(|id| id.to_string()),
                property_type.id.to_string(),
            ],
        )?;
        Ok(())
    }

    fn delete_property_type(&self, id: PropertyTypeId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM property_type WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::PropertyType,
                id,
            });
        }
        Ok(())
    }
}

fn parse_object_type_row(row: &Row<'_>) -> RepoResult<ObjectType> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "object_type.id")?;

    let base_text: String = row.get("base_object_type")?;
    let base_object_type = BaseObjectType::parse(&base_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid base object type `{base_text}` in object_type.base_object_type"
        ))
    })?;

    Ok(ObjectType {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        fixed: int_to_bool(row.get("fixed")?, "object_type.fixed")?,
        base_object_type,
        property_types: Vec::new(),
    })
}

fn parse_property_type_row(row: &Row<'_>) -> RepoResult<PropertyType> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "property_type.id")?;

    let kind_text: String = row.get("type")?;
    let kind = PropertyKind::parse(&kind_text).map_err(|err| RepoError::from_default(id, err))?;

    let visibility_text: String = row.get("visibility")?;
    let visibility = Visibility::parse(&visibility_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid visibility `{visibility_text}` in property_type.visibility"
        ))
    })?;

    let object_type_id = row
        .get::<_, Option<String>>("object_type_id")?
        .map(|value| parse_uuid(&value, "property_type.object_type_id"))
        .transpose()?;

    Ok(PropertyType {
        id,
        kind,
        name: row.get("name")?,
        ai_automated: int_to_bool(row.get("ai_automated")?, "property_type.ai_automated")?,
        visibility,
        icon: row.get("icon")?,
        default_value: row.get("default_value")?,
        is_object_reference: int_to_bool(
            row.get("is_object_reference")?,
            "property_type.is_object_reference",
        )?,
        object_type_id,
    })
}
