//! Core domain logic for liha, a user-definable object store.
//! This crate is the single source of truth for schema and storage invariants.

pub mod coercion;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod observe;
pub mod repo;
pub mod service;

pub use coercion::{CoercionError, PropertyColumn};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::object::{Content, Object, ObjectId, PageCustomization, Property, PropertyValue};
pub use model::object_type::{BaseObjectType, ObjectType, ObjectTypeId};
pub use model::property_type::{PropertyKind, PropertyType, PropertyTypeId, Visibility};
pub use model::validation::ValidationError;
pub use observe::{EventStatus, LogObserver, NoopObserver, StoreEvent, StoreObserver};
pub use repo::error::{EntityKind, RepoError, RepoResult};
pub use repo::object_repo::{ObjectRepository, SqliteObjectRepository, RECENT_OBJECTS_LIMIT};
pub use repo::schema_repo::{ObjectTypeFilter, SchemaRepository, SqliteSchemaRepository};
pub use service::object_service::ObjectService;
pub use service::object_type_service::ObjectTypeService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
