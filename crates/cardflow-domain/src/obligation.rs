//! Stage obligations - configured prerequisites for entering a stage
//!
//! Three rule kinds: a card field that must hold a value, a proposal that
//! must have reached a minimum status, or a task of a given type that must
//! exist (completed). A per-card manual completion record overrides the
//! rule check for its obligation.

use crate::ids::{CardId, ObligationId, StageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proposal status ladder, ordered from least to most advanced
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Being drafted
    Draft,
    /// Sent to the traveler
    Sent,
    /// Opened by the traveler
    Viewed,
    /// Under negotiation
    InProgress,
    /// Accepted
    Accepted,
}

/// Kind-specific obligation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ObligationRule {
    /// A card field (top-level or product-data) must hold a value
    Field {
        /// Key looked up in the card snapshot
        key: String,
        /// Label shown when the field is missing
        label: String,
    },
    /// Some proposal on the card must have reached this status
    Proposal {
        /// Minimum acceptable status
        min_status: ProposalStatus,
    },
    /// A completed task of this type must exist on the card
    Task {
        /// Required task type
        task_type: String,
        /// Label shown when the task is missing
        label: String,
    },
}

/// A configured prerequisite for entering a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageObligation {
    /// Obligation identifier
    pub id: ObligationId,
    /// Stage this obligation gates
    pub stage_id: StageId,
    /// The rule to satisfy
    pub rule: ObligationRule,
    /// Inactive obligations are ignored by the gate
    pub active: bool,
}

impl StageObligation {
    /// New active obligation
    #[must_use]
    pub fn new(stage_id: StageId, rule: ObligationRule) -> Self {
        Self {
            id: ObligationId::new(),
            stage_id,
            rule,
            active: true,
        }
    }

    /// Deactivate
    #[inline]
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Field obligation shorthand
    #[must_use]
    pub fn field(stage_id: StageId, key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            stage_id,
            ObligationRule::Field {
                key: key.into(),
                label: label.into(),
            },
        )
    }

    /// Proposal obligation shorthand
    #[must_use]
    pub fn proposal(stage_id: StageId, min_status: ProposalStatus) -> Self {
        Self::new(stage_id, ObligationRule::Proposal { min_status })
    }

    /// Task obligation shorthand
    #[must_use]
    pub fn task(
        stage_id: StageId,
        task_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::new(
            stage_id,
            ObligationRule::Task {
                task_type: task_type.into(),
                label: label.into(),
            },
        )
    }
}

/// Per-card manual completion of an obligation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardObligation {
    /// Card the completion belongs to
    pub card_id: CardId,
    /// Obligation marked complete
    pub obligation_id: ObligationId,
    /// Who checked it off
    pub completed_by: UserId,
    /// When
    pub completed_at: DateTime<Utc>,
}

impl CardObligation {
    /// Record a manual completion now
    #[must_use]
    pub fn new(card_id: CardId, obligation_id: ObligationId, completed_by: UserId) -> Self {
        Self {
            card_id,
            obligation_id,
            completed_by,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_ladder_orders() {
        assert!(ProposalStatus::Draft < ProposalStatus::Sent);
        assert!(ProposalStatus::Sent < ProposalStatus::Viewed);
        assert!(ProposalStatus::Viewed < ProposalStatus::InProgress);
        assert!(ProposalStatus::InProgress < ProposalStatus::Accepted);
    }

    #[test]
    fn shorthand_constructors() {
        let stage = StageId::new();
        let field = StageObligation::field(stage, "destination", "Destination");
        assert!(field.active);
        assert!(matches!(field.rule, ObligationRule::Field { .. }));

        let proposal = StageObligation::proposal(stage, ProposalStatus::Sent);
        assert!(matches!(
            proposal.rule,
            ObligationRule::Proposal {
                min_status: ProposalStatus::Sent
            }
        ));

        let task = StageObligation::task(stage, "briefing_call", "Briefing call").inactive();
        assert!(!task.active);
    }
}
