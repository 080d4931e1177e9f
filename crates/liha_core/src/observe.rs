//! Store observation port.
//!
//! # Responsibility
//! - Give services one place to report operation outcomes.
//! - Keep the `log` key=value event format in a single implementation.
//!
//! # Invariants
//! - Events carry metadata only (names, ids, timings); never property values
//!   or content text.
//! - Observers must not fail or panic; recording is fire-and-forget.

use log::{error, info};
use std::time::Instant;
use uuid::Uuid;

/// Outcome of one observed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Ok,
    Error,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// One operation outcome reported by a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    /// Stable event name such as `object_create`.
    pub name: &'static str,
    pub status: EventStatus,
    /// Primary entity id, when the operation targets one.
    pub id: Option<Uuid>,
    pub duration_ms: u128,
    /// Rendered error, only for `EventStatus::Error`.
    pub error: Option<String>,
}

impl StoreEvent {
    /// Builds an event from an operation result and its start instant.
    pub fn from_result<T, E: std::fmt::Display>(
        name: &'static str,
        id: Option<Uuid>,
        started_at: Instant,
        result: &Result<T, E>,
    ) -> Self {
        let duration_ms = started_at.elapsed().as_millis();
        match result {
            Ok(_) => Self {
                name,
                status: EventStatus::Ok,
                id,
                duration_ms,
                error: None,
            },
            Err(err) => Self {
                name,
                status: EventStatus::Error,
                id,
                duration_ms,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Receiver for store events.
pub trait StoreObserver: Send + Sync {
    fn record(&self, event: &StoreEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StoreObserver for LogObserver {
    fn record(&self, event: &StoreEvent) {
        let id = event
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        match event.status {
            EventStatus::Ok => info!(
                "event={} module=store status=ok id={} duration_ms={}",
                event.name, id, event.duration_ms
            ),
            EventStatus::Error => error!(
                "event={} module=store status=error id={} duration_ms={} error={}",
                event.name,
                id,
                event.duration_ms,
                event.error.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StoreObserver for NoopObserver {
    fn record(&self, _event: &StoreEvent) {}
}
