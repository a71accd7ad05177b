//! Error taxonomy for the lifecycle core
//!
//! Two layers:
//! - [`StoreError`]: persistence failures, retryable, never partial.
//! - [`FlowError`]: everything a mutating operation can fail with.
//!
//! Expected, user-correctable outcomes (a blocked gate, a declined
//! branch/cancel/merge) are NOT errors; they are variants of the
//! operation's outcome enum and carry a specific reason.

use cardflow_domain::{CardId, Phase, StageId, SubCardStatus};

/// Persistence-layer failure
///
/// The caller must assume no partial state was persisted: a failed
/// commit leaves every entity as it was.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Card row not found
    #[error("card not found: {0}")]
    CardNotFound(CardId),

    /// Optimistic-concurrency check failed at commit time
    #[error("version conflict on card {card_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Card whose version no longer matches
        card_id: CardId,
        /// Version the commit was built against
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Store/network failure
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the operation can succeed
    ///
    /// A version conflict is retryable after re-reading the card; a
    /// backend failure is retryable as-is.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::Backend(_))
    }
}

/// Failure of a lifecycle operation
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowError {
    /// Persistence failure
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Target stage is not in the catalog
    #[error("unknown stage: {0}")]
    UnknownStage(StageId),

    /// Merged/cancelled sub-cards refuse stage-consequential transitions
    #[error("sub-card {card_id} is {status:?} and no longer accepts stage transitions")]
    SubCardTerminal {
        /// The terminal sub-card
        card_id: CardId,
        /// Its terminal status
        status: SubCardStatus,
    },

    /// Sub-card operation attempted on an ordinary card
    #[error("card {0} is not a sub-card")]
    NotASubCard(CardId),

    /// A merged sub-card is missing its merge record (data corruption)
    #[error("sub-card {0} is marked merged but has no merge record")]
    MergeRecordMissing(CardId),
}

impl FlowError {
    /// Whether retrying the operation can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Why a branch request was declined
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchDecline {
    /// Parent has not reached the post-sale phase
    #[error("change requests can only branch from post-sale cards (parent is in {0})")]
    ParentNotPostSale(Phase),

    /// Nested change requests are not allowed
    #[error("a change request cannot branch from another change request")]
    ParentIsSubCard,

    /// Group parents cannot be branched
    #[error("a group parent cannot be branched into a change request")]
    ParentIsGroupParent,
}

/// Why a cancel request was declined
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CancelDecline {
    /// Only active sub-cards can be cancelled
    #[error("sub-card is {0:?}, only active sub-cards can be cancelled")]
    NotActive(SubCardStatus),
}

/// Why a merge request was declined
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeDecline {
    /// Cancelled sub-cards cannot be merged
    #[error("sub-card was cancelled and cannot be merged")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_classify_retryability() {
        assert!(StoreError::Backend("timeout".into()).is_retryable());
        assert!(StoreError::VersionConflict {
            card_id: CardId::new(),
            expected: 1,
            actual: 2
        }
        .is_retryable());
        assert!(!StoreError::CardNotFound(CardId::new()).is_retryable());
    }

    #[test]
    fn flow_error_retryability_follows_store() {
        let retryable = FlowError::Store(StoreError::Backend("down".into()));
        assert!(retryable.is_retryable());
        assert!(!FlowError::UnknownStage(StageId::new()).is_retryable());
    }

    #[test]
    fn decline_messages_are_specific() {
        let msg = BranchDecline::ParentNotPostSale(Phase::Planner).to_string();
        assert!(msg.contains("Planner"));
        assert!(CancelDecline::NotActive(SubCardStatus::Merged)
            .to_string()
            .contains("Merged"));
    }
}
