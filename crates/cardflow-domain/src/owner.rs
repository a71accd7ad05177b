//! Ownership records
//!
//! The owner history is an append-only ledger: one open entry (no end
//! timestamp) per card at a time. Closing the previous entry and opening
//! the next is part of the same commit as the owner-field change, which
//! the store enforces.

use crate::ids::{CardId, TeamId, UserId};
use crate::stage::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One span of ownership over a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerHistoryEntry {
    /// Card owned
    pub card_id: CardId,
    /// Owner over this span
    pub owner_id: UserId,
    /// Phase the card was in when the span opened
    pub phase: Phase,
    /// Span start
    pub started_at: DateTime<Utc>,
    /// Span end; open entry while `None`
    pub ended_at: Option<DateTime<Utc>>,
    /// Why ownership moved to this owner
    pub transfer_reason: Option<String>,
    /// Actor who performed the transfer
    pub transferred_by: Option<UserId>,
}

impl OwnerHistoryEntry {
    /// Open a new ownership span starting now
    #[must_use]
    pub fn open(card_id: CardId, owner_id: UserId, phase: Phase) -> Self {
        Self {
            card_id,
            owner_id,
            phase,
            started_at: Utc::now(),
            ended_at: None,
            transfer_reason: None,
            transferred_by: None,
        }
    }

    /// With a transfer reason
    #[inline]
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.transfer_reason = Some(reason.into());
        self
    }

    /// With the transferring actor
    #[inline]
    #[must_use]
    pub fn transferred_by(mut self, actor: UserId) -> Self {
        self.transferred_by = Some(actor);
        self
    }

    /// Whether this span is still open
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// A team scoped to a phase; its members are the handoff candidates for
/// cards crossing into that phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team identifier
    pub id: TeamId,
    /// Display name
    pub name: String,
    /// Phase this team covers, if any
    pub phase: Option<Phase>,
    /// Member users
    pub members: Vec<UserId>,
}

impl Team {
    /// New team covering a phase
    #[must_use]
    pub fn new(name: impl Into<String>, phase: Option<Phase>, members: Vec<UserId>) -> Self {
        Self {
            id: TeamId::new(),
            name: name.into(),
            phase,
            members,
        }
    }
}
