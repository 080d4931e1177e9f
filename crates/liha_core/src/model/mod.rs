//! Schema and record model for the object store.
//!
//! # Responsibility
//! - Define object types, property types and the typed records built on them.
//! - Keep model invariants checkable without touching storage.
//!
//! # Invariants
//! - Every entity is identified by a non-nil UUID.
//! - A property type's kind is fixed once registered.
//! - Property values live in exactly one storage cell chosen by the kind.

pub mod object;
pub mod object_type;
pub mod property_type;
pub mod validation;
