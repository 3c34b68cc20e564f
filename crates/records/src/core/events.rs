//! Business events emitted by the record services.
//!
//! Publication is best-effort: a sink failure is logged and never fails the
//! operation that produced the event.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A lifecycle event for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordEvent {
    /// A record was created at version 1.
    #[serde(rename_all = "camelCase")]
    Created {
        /// Record id.
        id: String,
        /// Record type.
        record_type: String,
        /// Acting user.
        actor: String,
    },

    /// A record was updated.
    #[serde(rename_all = "camelCase")]
    Updated {
        /// Record id.
        id: String,
        /// The new version.
        version: u64,
        /// Acting user.
        actor: String,
    },

    /// A record was soft-deleted.
    #[serde(rename_all = "camelCase")]
    Deleted {
        /// Record id.
        id: String,
        /// The version at deletion, unchanged by the delete.
        version: u64,
        /// Acting user.
        actor: String,
    },

    /// A soft-deleted record was recovered.
    #[serde(rename_all = "camelCase")]
    Recovered {
        /// Record id.
        id: String,
        /// The new version.
        version: u64,
        /// Acting user.
        actor: String,
    },

    /// A record's content was restored from a snapshot.
    #[serde(rename_all = "camelCase")]
    VersionRestored {
        /// Record id.
        id: String,
        /// The snapshot version restored from.
        from_version: u64,
        /// The new version.
        to_version: u64,
        /// Acting user.
        actor: String,
    },
}

impl RecordEvent {
    /// The event name, e.g. `VERSION_RESTORED`.
    pub fn name(&self) -> &'static str {
        match self {
            RecordEvent::Created { .. } => "CREATED",
            RecordEvent::Updated { .. } => "UPDATED",
            RecordEvent::Deleted { .. } => "DELETED",
            RecordEvent::Recovered { .. } => "RECOVERED",
            RecordEvent::VersionRestored { .. } => "VERSION_RESTORED",
        }
    }

    /// The id of the affected record.
    pub fn record_id(&self) -> &str {
        match self {
            RecordEvent::Created { id, .. }
            | RecordEvent::Updated { id, .. }
            | RecordEvent::Deleted { id, .. }
            | RecordEvent::Recovered { id, .. }
            | RecordEvent::VersionRestored { id, .. } => id,
        }
    }

    /// The acting user.
    pub fn actor(&self) -> &str {
        match self {
            RecordEvent::Created { actor, .. }
            | RecordEvent::Updated { actor, .. }
            | RecordEvent::Deleted { actor, .. }
            | RecordEvent::Recovered { actor, .. }
            | RecordEvent::VersionRestored { actor, .. } => actor,
        }
    }
}

/// Failure to publish an event.
#[derive(Error, Debug)]
#[error("failed to publish {event}: {message}")]
pub struct EventSinkError {
    /// Name of the event that was dropped.
    pub event: String,
    /// Why it was dropped.
    pub message: String,
}

impl EventSinkError {
    /// Creates a publication error for `event`.
    pub fn new(event: &RecordEvent, message: impl Into<String>) -> Self {
        Self {
            event: event.name().to_string(),
            message: message.into(),
        }
    }
}

/// Receives business events from the record services.
pub trait RecordEventSink: Send + Sync {
    /// Publishes one event.
    fn publish(&self, event: &RecordEvent) -> Result<(), EventSinkError>;
}

/// A sink that writes events as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl RecordEventSink for TracingEventSink {
    fn publish(&self, event: &RecordEvent) -> Result<(), EventSinkError> {
        let payload =
            serde_json::to_string(event).map_err(|e| EventSinkError::new(event, e.to_string()))?;
        tracing::info!(
            target: "helios_records::events",
            event = event.name(),
            id = event.record_id(),
            actor = event.actor(),
            payload = %payload,
            "record event"
        );
        Ok(())
    }
}
