//! Domain events emitted by the lifecycle core
//!
//! Events are appended inside the same store unit as the mutation they
//! describe; downstream read-models (activity feeds, dashboards) subscribe
//! to them instead of the core invalidating any particular view.

use crate::ids::{CardId, EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Card entered a new stage
    StageChanged,
    /// Card ownership moved
    OwnerChanged,
    /// Change request branched off a parent
    SubCardCreated,
    /// Change request reconciled into its parent
    SubCardMerged,
    /// Change request abandoned
    SubCardCancelled,
}

/// One audit/activity event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Event identifier (sortable)
    pub id: EventId,
    /// Event kind
    pub kind: EventKind,
    /// Human-readable description for the activity feed
    pub description: String,
    /// Structured payload
    pub metadata: serde_json::Value,
    /// Card the event belongs to
    pub card_id: CardId,
    /// Acting user
    pub actor_id: UserId,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Create an event happening now
    #[must_use]
    pub fn new(
        kind: EventKind,
        description: impl Into<String>,
        card_id: CardId,
        actor_id: UserId,
    ) -> Self {
        Self {
            id: EventId::new(),
            kind,
            description: description.into(),
            metadata: serde_json::Value::Null,
            card_id,
            actor_id,
            timestamp: Utc::now(),
        }
    }

    /// With structured metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
