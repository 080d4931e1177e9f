//! Object store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist objects together with their EAV property cells.
//! - Serialize the `contents` / `page_customization` blobs.
//! - Keep recency (`last_modified`) and optimistic versions current.
//!
//! # Invariants
//! - An object row exists iff all property rows of its type's schema at
//!   creation time exist (one transaction per create).
//! - Each property row populates exactly the column chosen by
//!   `coercion::column_for`; create and update share that routing.
//! - `version` starts at 0 and increases by one on every successful write of
//!   the object row.
//! - A non-null reference cell targets an existing object of the property
//!   kind's object type.
//! - `last_modified` is strictly increasing across all objects.

use crate::coercion::{self, format_date, parse_rfc3339, PropertyColumn};
use crate::db::migrations::verify_schema;
use crate::model::object::{
    Content, Object, ObjectId, PageCustomization, Property, PropertyValue,
};
use crate::model::object_type::ObjectTypeId;
use crate::model::property_type::{PropertyKind, PropertyType, PropertyTypeId};
use crate::repo::error::{EntityKind, RepoError, RepoResult};
use crate::repo::{bool_to_int, int_to_bool, parse_uuid};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Maximum ids returned by recency lookups.
pub const RECENT_OBJECTS_LIMIT: u32 = 5;

/// Next recency stamp: wall-clock milliseconds, bumped past the current
/// maximum so writes inside one millisecond still order strictly.
const NEXT_LAST_MODIFIED_SQL: &str = "MAX(
    CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER),
    COALESCE((SELECT MAX(last_modified) FROM object), 0) + 1
)";

const OBJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    object_type_id,
    page_customization,
    contents,
    pinned,
    version
FROM object";

const PROPERTY_SELECT_SQL: &str = "SELECT
    id,
    object_id,
    property_type_id,
    value,
    value_number,
    value_boolean,
    value_date,
    referenced_object_id
FROM property";

/// Repository interface for objects and their property cells.
pub trait ObjectRepository {
    /// Inserts the object and one default-valued cell per property type.
    ///
    /// New objects always start at version 0; `object.version` is ignored.
    fn create_object(
        &self,
        object: &Object,
        property_types: &[PropertyType],
    ) -> RepoResult<ObjectId>;
    /// Loads the object with its blobs and assembled property map.
    fn get_object(&self, id: ObjectId) -> RepoResult<Option<Object>>;
    /// Writes the object row and the caller-supplied cells; returns the new
    /// version.
    fn update_object(&self, object: &Object, property_types: &[PropertyType])
        -> RepoResult<i64>;
    /// Deletes the property cells, then the object row.
    fn delete_object(&self, id: ObjectId) -> RepoResult<()>;
    /// Lists all object ids in creation order.
    fn list_object_ids(&self) -> RepoResult<Vec<ObjectId>>;
    /// Lists up to `RECENT_OBJECTS_LIMIT` ids of one type, most recent first.
    fn get_recent_objects_of_type(&self, object_type_id: ObjectTypeId)
        -> RepoResult<Vec<ObjectId>>;
    /// Appends a default text block to the contents blob; returns its id.
    fn add_new_content_to_object(&self, id: ObjectId, text: &str) -> RepoResult<String>;
}

/// SQLite-backed object store.
pub struct SqliteObjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        verify_schema(conn)?;
        Ok(Self { conn })
    }

    fn begin(&self, behavior: TransactionBehavior) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(self.conn, behavior)?)
    }
}

impl ObjectRepository for SqliteObjectRepository<'_> {
    fn create_object(
        &self,
        object: &Object,
        property_types: &[PropertyType],
    ) -> RepoResult<ObjectId> {
        object.validate()?;
        let page_customization = serde_json::to_string(&object.page_customization)?;
        let contents = serde_json::to_string(&object.contents)?;

        let tx = self.begin(TransactionBehavior::Immediate)?;
        tx.execute(
            &format!(
                "INSERT INTO object (
                    id,
                    name,
                    description,
                    object_type_id,
                    page_customization,
                    contents,
                    pinned,
                    version,
                    last_modified
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, {NEXT_LAST_MODIFIED_SQL});"
            ),
            params![
                object.id.to_string(),
                object.name.as_str(),
                object.description.as_str(),
                object.object_type_id.to_string(),
                page_customization,
                contents,
                bool_to_int(object.pinned),
            ],
        )?;

        for property_type in property_types {
            let (column, value) =
                coercion::resolve_default(property_type.kind, &property_type.default_value)
                    .map_err(|err| RepoError::from_default(property_type.id, err))?;
            check_reference_target(&tx, property_type, &value)?;
            insert_property(&tx, object.id, property_type.id, column, &value)?;
        }

        tx.commit()?;
        Ok(object.id)
    }

    fn get_object(&self, id: ObjectId) -> RepoResult<Option<Object>> {
        let tx = self.begin(TransactionBehavior::Deferred)?;

        let object = {
            let mut stmt = tx.prepare(&format!("{OBJECT_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id.to_string()])?;
            match rows.next()? {
                Some(row) => parse_object_row(row)?,
                None => return Ok(None),
            }
        };
        let properties = load_properties(&tx, id)?;
        tx.commit()?;

        Ok(Some(Object {
            properties,
            ..object
        }))
    }

    fn update_object(
        &self,
        object: &Object,
        property_types: &[PropertyType],
    ) -> RepoResult<i64> {
        object.validate()?;
        let page_customization = serde_json::to_string(&object.page_customization)?;
        let contents = serde_json::to_string(&object.contents)?;

        let tx = self.begin(TransactionBehavior::Immediate)?;
        let stored: Option<(i64, String)> = tx
            .query_row(
                "SELECT version, object_type_id FROM object WHERE id = ?1;",
                [object.id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((stored_version, stored_type)) = stored else {
            return Err(RepoError::NotFound {
                entity: EntityKind::Object,
                id: object.id,
            });
        };
        if parse_uuid(&stored_type, "object.object_type_id")? != object.object_type_id {
            return Err(RepoError::Immutable {
                entity: EntityKind::Object,
                id: object.id,
                field: "object_type_id",
            });
        }
        if stored_version != object.version {
            return Err(RepoError::Conflict {
                object_id: object.id,
                expected_version: object.version,
                actual_version: stored_version,
            });
        }

        tx.execute(
            &format!(
                "UPDATE object
                 SET
                    name = ?1,
                    description = ?2,
                    page_customization = ?3,
                    contents = ?4,
                    pinned = ?5,
                    version = version + 1,
                    last_modified = {NEXT_LAST_MODIFIED_SQL}
                 WHERE id = ?6;"
            ),
            params![
                object.name.as_str(),
                object.description.as_str(),
                page_customization,
                contents,
                bool_to_int(object.pinned),
                object.id.to_string(),
            ],
        )?;

        for property_type in property_types {
            let Some(property) = object.properties.get(&property_type.id) else {
                continue;
            };
            let (column, value) = coercion::resolve_current(property_type.kind, property)
                .map_err(|err| RepoError::from_value(property_type.id, err))?;
            check_reference_target(&tx, property_type, &value)?;
            update_property(&tx, object.id, property_type.id, column, &value)?;
        }

        tx.commit()?;
        Ok(stored_version + 1)
    }

    fn delete_object(&self, id: ObjectId) -> RepoResult<()> {
        let tx = self.begin(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM property WHERE object_id = ?1;",
            [id.to_string()],
        )?;
        let changed = tx.execute("DELETE FROM object WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Object,
                id,
            });
        }
        tx.commit()?;
        Ok(())
    }

    fn list_object_ids(&self) -> RepoResult<Vec<ObjectId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM object ORDER BY rowid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            ids.push(parse_uuid(&id_text, "object.id")?);
        }
        Ok(ids)
    }

    fn get_recent_objects_of_type(
        &self,
        object_type_id: ObjectTypeId,
    ) -> RepoResult<Vec<ObjectId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM object
             WHERE object_type_id = ?1
             ORDER BY last_modified DESC, rowid DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![
            object_type_id.to_string(),
            i64::from(RECENT_OBJECTS_LIMIT)
        ])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            ids.push(parse_uuid(&id_text, "object.id")?);
        }
        Ok(ids)
    }

    fn add_new_content_to_object(&self, id: ObjectId, text: &str) -> RepoResult<String> {
        let tx = self.begin(TransactionBehavior::Immediate)?;
        let stored: Option<String> = tx
            .query_row(
                "SELECT contents FROM object WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stored) = stored else {
            return Err(RepoError::NotFound {
                entity: EntityKind::Object,
                id,
            });
        };

        let mut contents: BTreeMap<String, Content> = parse_blob(&stored, "object.contents")?;
        let content = Content::text(text);
        let content_id = content.id.clone();
        contents.insert(content_id.clone(), content);

        tx.execute(
            &format!(
                "UPDATE object
                 SET
                    contents = ?1,
                    version = version + 1,
                    last_modified = {NEXT_LAST_MODIFIED_SQL}
                 WHERE id = ?2;"
            ),
            params![serde_json::to_string(&contents)?, id.to_string()],
        )?;
        tx.commit()?;

        Ok(content_id)
    }
}

fn check_reference_target(
    tx: &Transaction<'_>,
    property_type: &PropertyType,
    value: &PropertyValue,
) -> RepoResult<()> {
    let (PropertyKind::Reference(expected), PropertyValue::Reference(Some(target))) =
        (property_type.kind, value)
    else {
        return Ok(());
    };

    let actual: Option<String> = tx
        .query_row(
            "SELECT object_type_id FROM object WHERE id = ?1;",
            [target.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(actual) = actual else {
        return Err(RepoError::NotFound {
            entity: EntityKind::Object,
            id: *target,
        });
    };
    let actual = parse_uuid(&actual, "object.object_type_id")?;
    if actual != expected {
        return Err(RepoError::ReferenceTypeMismatch {
            property_type_id: property_type.id,
            object_id: *target,
            expected,
            actual,
        });
    }
    Ok(())
}

fn insert_property(
    tx: &Transaction<'_>,
    object_id: ObjectId,
    property_type_id: PropertyTypeId,
    column: PropertyColumn,
    value: &PropertyValue,
) -> RepoResult<()> {
    tx.execute(
        &format!(
            "INSERT INTO property (object_id, property_type_id, {}) VALUES (?1, ?2, ?3);",
            column.as_str()
        ),
        params![
            object_id.to_string(),
            property_type_id.to_string(),
            to_sql_value(value)
        ],
    )?;
    Ok(())
}

fn update_property(
    tx: &Transaction<'_>,
    object_id: ObjectId,
    property_type_id: PropertyTypeId,
    column: PropertyColumn,
    value: &PropertyValue,
) -> RepoResult<()> {
    // Rows missing because the type gained a property after this object was
    // created are left missing; nothing is backfilled here.
    tx.execute(
        &format!(
            "UPDATE property SET {} = ?1 WHERE object_id = ?2 AND property_type_id = ?3;",
            column.as_str()
        ),
        params![
            to_sql_value(value),
            object_id.to_string(),
            property_type_id.to_string()
        ],
    )?;
    Ok(())
}

fn load_properties(
    tx: &Transaction<'_>,
    object_id: ObjectId,
) -> RepoResult<BTreeMap<PropertyTypeId, Property>> {
    let mut stmt = tx.prepare(&format!(
        "{PROPERTY_SELECT_SQL} WHERE object_id = ?1 ORDER BY id ASC;"
    ))?;
    let mut rows = stmt.query([object_id.to_string()])?;
    let mut properties = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let property = parse_property_row(row)?;
        properties.insert(property.property_type_id, property);
    }
    Ok(properties)
}

fn to_sql_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Text(text) => Value::Text(text.clone()),
        PropertyValue::Number(number) => Value::Real(*number),
        PropertyValue::Boolean(flag) => Value::Integer(bool_to_int(*flag)),
        PropertyValue::Date(date) => Value::Text(format_date(*date)),
        PropertyValue::Reference(Some(target)) => Value::Text(target.to_string()),
        PropertyValue::Reference(None) => Value::Null,
    }
}

fn parse_blob<T: DeserializeOwned + Default>(raw: &str, column: &'static str) -> RepoResult<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(T::default());
    }
    serde_json::from_str(trimmed)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

fn parse_object_row(row: &Row<'_>) -> RepoResult<Object> {
    let id_text: String = row.get("id")?;
    let object_type_text: String = row.get("object_type_id")?;
    let page_customization: PageCustomization = parse_blob(
        &row.get::<_, String>("page_customization")?,
        "object.page_customization",
    )?;
    let contents: BTreeMap<String, Content> =
        parse_blob(&row.get::<_, String>("contents")?, "object.contents")?;

    Ok(Object {
        id: parse_uuid(&id_text, "object.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        pinned: int_to_bool(row.get("pinned")?, "object.pinned")?,
        object_type_id: parse_uuid(&object_type_text, "object.object_type_id")?,
        version: row.get("version")?,
        contents,
        page_customization,
        properties: BTreeMap::new(),
    })
}

fn parse_property_row(row: &Row<'_>) -> RepoResult<Property> {
    let object_text: String = row.get("object_id")?;
    let property_type_text: String = row.get("property_type_id")?;

    let value_boolean = row
        .get::<_, Option<i64>>("value_boolean")?
        .map(|value| int_to_bool(value, "property.value_boolean"))
        .transpose()?;
    let value_date = row
        .get::<_, Option<String>>("value_date")?
        .map(|value| {
            parse_rfc3339(&value).map_err(|err| {
                RepoError::InvalidData(format!(
                    "invalid date `{value}` in property.value_date: {err}"
                ))
            })
        })
        .transpose()?;
    let referenced_object_id = row
        .get::<_, Option<String>>("referenced_object_id")?
        .map(|value| parse_uuid(&value, "property.referenced_object_id"))
        .transpose()?;

    Ok(Property {
        id: row.get("id")?,
        object_id: parse_uuid(&object_text, "property.object_id")?,
        property_type_id: parse_uuid(&property_type_text, "property.property_type_id")?,
        value: row.get("value")?,
        value_number: row.get("value_number")?,
        value_boolean,
        value_date,
        referenced_object_id,
    })
}
