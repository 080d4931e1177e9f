//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the schema registry
//!   and the object store.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate model invariants before SQL mutations.
//! - Multi-statement writes run inside one transaction; a failure leaves no
//!   partial state behind.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`, ...) in
//!   addition to DB transport errors.

pub mod error;
pub mod object_repo;
pub mod schema_repo;

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> error::RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(error::RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> error::RepoResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value).map_err(|_| {
        error::RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}"))
    })
}
