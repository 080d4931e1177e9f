//! Schema registry use-case service.
//!
//! # Responsibility
//! - Expose object type and property type management to callers.
//! - Assemble the full object type view (row plus ordered property types).
//!
//! # Invariants
//! - Property types are always attached to an existing object type.
//! - Missing entities surface as `RepoError::NotFound`, never `Ok(None)`.

use crate::model::object_type::{ObjectType, ObjectTypeId};
use crate::model::property_type::{PropertyType, PropertyTypeId};
use crate::observe::{LogObserver, StoreObserver};
use crate::repo::error::{EntityKind, RepoError, RepoResult};
use crate::repo::schema_repo::{ObjectTypeFilter, SchemaRepository};
use crate::service::observed;
use std::sync::Arc;

/// Use-case service wrapper for schema definitions.
pub struct ObjectTypeService<S: SchemaRepository> {
    schema: S,
    observer: Arc<dyn StoreObserver>,
}

impl<S: SchemaRepository> ObjectTypeService<S> {
    /// Creates a service that reports through the `log` facade.
    pub fn new(schema: S) -> Self {
        Self::with_observer(schema, Arc::new(LogObserver))
    }

    /// Creates a service with a caller-provided observer.
    pub fn with_observer(schema: S, observer: Arc<dyn StoreObserver>) -> Self {
        Self { schema, observer }
    }

    /// Registers a new object type. Embedded `property_types` are ignored;
    /// add them with [`Self::add_property_type`].
    pub fn create_object_type(&self, object_type: &ObjectType) -> RepoResult<ObjectTypeId> {
        observed(
            self.observer.as_ref(),
            "object_type_create",
            Some(object_type.id),
            || self.schema.create_object_type(object_type),
        )
    }

    /// Loads an object type with its property types in registration order.
    pub fn get_object_type(&self, id: ObjectTypeId) -> RepoResult<ObjectType> {
        observed(self.observer.as_ref(), "object_type_get", Some(id), || {
            let mut object_type = self.schema.get_object_type(id)?.ok_or(RepoError::NotFound {
                entity: EntityKind::ObjectType,
                id,
            })?;
            object_type.property_types = self.schema.list_property_types_of(id)?;
            Ok(object_type)
        })
    }

    pub fn list_object_type_ids(&self, filter: &ObjectTypeFilter) -> RepoResult<Vec<ObjectTypeId>> {
        observed(self.observer.as_ref(), "object_type_list", None, || {
            self.schema.list_object_type_ids(filter)
        })
    }

    /// Rewrites the object type row; property types are untouched.
    pub fn update_object_type(&self, object_type: &ObjectType) -> RepoResult<()> {
        observed(
            self.observer.as_ref(),
            "object_type_update",
            Some(object_type.id),
            || self.schema.update_object_type(object_type),
        )
    }

    /// Deletes an object type and detaches its property types.
    ///
    /// Fails with `Constraint` while objects of the type still exist.
    pub fn delete_object_type(&self, id: ObjectTypeId) -> RepoResult<()> {
        observed(self.observer.as_ref(), "object_type_delete", Some(id), || {
            self.schema.delete_object_type(id)
        })
    }

    /// Adds a property type to `object_type_id`.
    ///
    /// The owner recorded on `property_type` is replaced by `object_type_id`.
    /// A reference kind must name a registered object type. Existing objects
    /// of the type do not gain a cell for it.
    pub fn add_property_type(
        &self,
        object_type_id: ObjectTypeId,
        property_type: &PropertyType,
    ) -> RepoResult<PropertyTypeId> {
        observed(
            self.observer.as_ref(),
            "property_type_create",
            Some(property_type.id),
            || {
                if self.schema.get_object_type(object_type_id)?.is_none() {
                    return Err(RepoError::NotFound {
                        entity: EntityKind::ObjectType,
                        id: object_type_id,
                    });
                }
                let owned = PropertyType {
                    object_type_id: Some(object_type_id),
                    ..property_type.clone()
                };
                self.schema.create_property_type(&owned)
            },
        )
    }

    pub fn get_property_type(&self, id: PropertyTypeId) -> RepoResult<PropertyType> {
        observed(self.observer.as_ref(), "property_type_get", Some(id), || {
            self.schema.get_property_type(id)?.ok_or(RepoError::NotFound {
                entity: EntityKind::PropertyType,
                id,
            })
        })
    }

    pub fn list_property_types_of(
        &self,
        object_type_id: ObjectTypeId,
    ) -> RepoResult<Vec<PropertyType>> {
        observed(
            self.observer.as_ref(),
            "property_type_list",
            Some(object_type_id),
            || self.schema.list_property_types_of(object_type_id),
        )
    }

    /// Updates a property type.
    ///
    /// Changing its kind or moving it to another object type is rejected
    /// with `Immutable`; clearing the owner detaches it.
    pub fn update_property_type(&self, property_type: &PropertyType) -> RepoResult<()> {
        observed(
            self.observer.as_ref(),
            "property_type_update",
            Some(property_type.id),
            || self.schema.update_property_type(property_type),
        )
    }

    /// Deletes a property type and every cell holding its values.
    pub fn delete_property_type(&self, id: PropertyTypeId) -> RepoResult<()> {
        observed(self.observer.as_ref(), "property_type_delete", Some(id), || {
            self.schema.delete_property_type(id)
        })
    }
}
