//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate registry and store calls into the public facade.
//! - Turn absent rows into uniform `NotFound` errors.
//! - Report every operation outcome to the injected `StoreObserver`.

pub mod object_service;
pub mod object_type_service;

use crate::observe::{StoreEvent, StoreObserver};
use crate::repo::error::RepoResult;
use std::time::Instant;
use uuid::Uuid;

/// Runs `op` and reports its outcome under `name`.
pub(crate) fn observed<T>(
    observer: &dyn StoreObserver,
    name: &'static str,
    id: Option<Uuid>,
    op: impl FnOnce() -> RepoResult<T>,
) -> RepoResult<T> {
    let started_at = Instant::now();
    let result = op();
    observer.record(&StoreEvent::from_result(name, id, started_at, &result));
    result
}
