//! Object use-case service.
//!
//! # Responsibility
//! - Expose object CRUD, recency and content-append entry points.
//! - Resolve the owning type's property types before store writes.
//! - Coerce string input for single-property edits.
//!
//! # Invariants
//! - Store writes always receive the property types currently registered
//!   for the object's type.
//! - `get_object` never returns an absent object as success.

use crate::coercion::{parse_value, write_cell};
use crate::model::object::{Object, ObjectId};
use crate::model::object_type::ObjectTypeId;
use crate::model::property_type::PropertyTypeId;
use crate::observe::{LogObserver, StoreObserver};
use crate::repo::error::{EntityKind, RepoError, RepoResult};
use crate::repo::object_repo::ObjectRepository;
use crate::repo::schema_repo::SchemaRepository;
use crate::service::observed;
use std::sync::Arc;

/// Use-case service wrapper for objects and their property cells.
pub struct ObjectService<S: SchemaRepository, O: ObjectRepository> {
    schema: S,
    objects: O,
    observer: Arc<dyn StoreObserver>,
}

impl<S: SchemaRepository, O: ObjectRepository> ObjectService<S, O> {
    /// Creates a service that reports through the `log` facade.
    pub fn new(schema: S, objects: O) -> Self {
        Self::with_observer(schema, objects, Arc::new(LogObserver))
    }

    /// Creates a service with a caller-provided observer.
    pub fn with_observer(schema: S, objects: O, observer: Arc<dyn StoreObserver>) -> Self {
        Self {
            schema,
            objects,
            observer,
        }
    }

    /// Creates an object and seeds one cell per registered property type.
    ///
    /// # Contract
    /// - Cells hold the coerced defaults; `object.properties` is ignored.
    /// - Any default that cannot be coerced aborts the whole create.
    pub fn create_object(&self, object: &Object) -> RepoResult<ObjectId> {
        observed(self.observer.as_ref(), "object_create", Some(object.id), || {
            let property_types = self.schema.list_property_types_of(object.object_type_id)?;
            self.objects.create_object(object, &property_types)
        })
    }

    pub fn get_object(&self, id: ObjectId) -> RepoResult<Object> {
        observed(self.observer.as_ref(), "object_get", Some(id), || {
            self.objects.get_object(id)?.ok_or(RepoError::NotFound {
                entity: EntityKind::Object,
                id,
            })
        })
    }

    /// Writes an object read earlier; returns the new version.
    ///
    /// # Contract
    /// - `object.version` must equal the stored version, else `Conflict`.
    /// - Property types absent from `object.properties` keep their values.
    pub fn update_object(&self, object: &Object) -> RepoResult<i64> {
        observed(self.observer.as_ref(), "object_update", Some(object.id), || {
            self.write_object(object)
        })
    }

    /// Sets one property from its string form; returns the new version.
    ///
    /// `raw` follows the same rules as property type defaults. A reference
    /// must point at an existing object of the kind's object type.
    pub fn set_property_value(
        &self,
        object_id: ObjectId,
        property_type_id: PropertyTypeId,
        raw: &str,
    ) -> RepoResult<i64> {
        observed(
            self.observer.as_ref(),
            "object_set_property",
            Some(object_id),
            || {
                let mut object = self.objects.get_object(object_id)?.ok_or(RepoError::NotFound {
                    entity: EntityKind::Object,
                    id: object_id,
                })?;
                let property_type = self
                    .schema
                    .get_property_type(property_type_id)?
                    .filter(|property_type| {
                        property_type.object_type_id == Some(object.object_type_id)
                    })
                    .ok_or(RepoError::NotFound {
                        entity: EntityKind::PropertyType,
                        id: property_type_id,
                    })?;
                let value = parse_value(property_type.kind, raw)
                    .map_err(|err| RepoError::from_value(property_type_id, err))?;

                // Objects created before the property type existed have no
                // cell to write into.
                let property = object.properties.get_mut(&property_type_id).ok_or(
                    RepoError::NotFound {
                        entity: EntityKind::PropertyType,
                        id: property_type_id,
                    },
                )?;
                write_cell(property, value);
                self.write_object(&object)
            },
        )
    }

    /// Deletes an object and its property cells.
    pub fn delete_object(&self, id: ObjectId) -> RepoResult<()> {
        observed(self.observer.as_ref(), "object_delete", Some(id), || {
            self.objects.delete_object(id)
        })
    }

    /// Lists every object id in creation order.
    pub fn get_all_object_ids(&self) -> RepoResult<Vec<ObjectId>> {
        observed(self.observer.as_ref(), "object_list", None, || {
            self.objects.list_object_ids()
        })
    }

    /// Lists up to five most recently modified objects of one type.
    pub fn get_recent_objects_of_type(
        &self,
        object_type_id: ObjectTypeId,
    ) -> RepoResult<Vec<ObjectId>> {
        observed(
            self.observer.as_ref(),
            "object_recent",
            Some(object_type_id),
            || self.objects.get_recent_objects_of_type(object_type_id),
        )
    }

    /// Appends a text block to the object page; returns the block id.
    pub fn add_new_content_to_object(&self, object_id: ObjectId, text: &str) -> RepoResult<String> {
        observed(
            self.observer.as_ref(),
            "object_add_content",
            Some(object_id),
            || self.objects.add_new_content_to_object(object_id, text),
        )
    }

    fn write_object(&self, object: &Object) -> RepoResult<i64> {
        let property_types = self.schema.list_property_types_of(object.object_type_id)?;
        self.objects.update_object(object, &property_types)
    }
}
