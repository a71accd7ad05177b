//! Store abstraction over the remote persistent backend
//!
//! Every method is an independent suspension point that can fail on its
//! own; no method assumes a prior write completed before a later read.
//! The multi-entity mutations (stage+owner, parent value+sub status) are
//! each a single trait method so an implementation can apply them as one
//! indivisible unit. Commits carry the card version they were built
//! against; a mismatch fails the whole commit with
//! [`StoreError::VersionConflict`](crate::error::StoreError) and no
//! partial state.

use crate::error::StoreError;
use async_trait::async_trait;
use cardflow_domain::{
    Card, CardId, CommercialStatus, DomainEvent, GateContext, MergeRecord, Money,
    OwnerHistoryEntry, Phase, StageId, StageObligation, TaskId, Team, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational follow-up task attached to a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpTask {
    /// Task identifier
    pub id: TaskId,
    /// Card the task belongs to
    pub card_id: CardId,
    /// Task type key (matched by task obligations)
    pub task_type: String,
    /// What to do
    pub description: String,
    /// Whether the task is done
    pub completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl FollowUpTask {
    /// New open task
    #[must_use]
    pub fn new(
        card_id: CardId,
        task_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            card_id,
            task_type: task_type.into(),
            description: description.into(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Owner reassignment applied within a transition commit
#[derive(Debug, Clone)]
pub struct OwnerChange {
    /// Confirmed owner (may equal the previous owner)
    pub new_owner: UserId,
    /// Transfer reason for the history ledger
    pub reason: Option<String>,
    /// Actor who confirmed the handoff
    pub actor: UserId,
}

/// Atomic stage(+owner) commit
///
/// Applied as one unit: stage, phase, optional commercial status,
/// optional owner change with its history close/open, version bump, and
/// event append.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    /// Card being moved
    pub card_id: CardId,
    /// Version the decision was built against
    pub expected_version: u64,
    /// Target stage
    pub stage_id: StageId,
    /// Phase of the target stage
    pub phase: Phase,
    /// New commercial status when entering a won/lost stage
    pub status: Option<CommercialStatus>,
    /// Owner reassignment on phase crossing
    pub owner_change: Option<OwnerChange>,
    /// Audit events recorded in the same unit
    pub events: Vec<DomainEvent>,
}

/// Atomic sub-card insertion: card row, follow-up task, parent event
#[derive(Debug, Clone)]
pub struct SubCardInsert {
    /// The new sub-card
    pub card: Card,
    /// Follow-up task carrying the request description
    pub task: FollowUpTask,
    /// SubCardCreated event on the parent
    pub event: DomainEvent,
}

/// Atomic sub-card cancellation
#[derive(Debug, Clone)]
pub struct CancelCommit {
    /// Sub-card being cancelled
    pub card_id: CardId,
    /// Version the decision was built against
    pub expected_version: u64,
    /// Reason recorded on the sub-card
    pub reason: Option<String>,
    /// SubCardCancelled event
    pub event: DomainEvent,
}

/// Atomic merge commit: parent value + sub-card terminal state
#[derive(Debug, Clone)]
pub struct MergeCommit {
    /// Parent card receiving the value
    pub parent_id: CardId,
    /// Parent version the arithmetic was computed against
    pub parent_expected_version: u64,
    /// Sub-card being merged
    pub sub_card_id: CardId,
    /// Sub-card version the decision was built against
    pub sub_expected_version: u64,
    /// New parent final value
    pub new_parent_value: Money,
    /// Merge record written onto the sub-card
    pub record: MergeRecord,
    /// SubCardMerged event on the parent
    pub event: DomainEvent,
}

/// Remote persistent store for the pipeline
///
/// Queries are plain reads; the four commit methods are the only
/// mutations and each must be indivisible: a reader never observes half
/// a commit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineStore: Send + Sync + std::fmt::Debug {
    /// Load one card
    async fn load_card(&self, id: CardId) -> Result<Card, StoreError>;

    /// Insert a new ordinary card, opening its first owner-history entry
    async fn insert_card(&self, card: Card) -> Result<(), StoreError>;

    /// All sub-cards branched from a parent
    async fn sub_cards_of(&self, parent: CardId) -> Result<Vec<Card>, StoreError>;

    /// Obligations configured for a stage (active and inactive)
    async fn obligations_for_stage(
        &self,
        stage: StageId,
    ) -> Result<Vec<StageObligation>, StoreError>;

    /// Proposal/task/manual-completion data for gate evaluation
    async fn gate_context(&self, card: CardId) -> Result<GateContext, StoreError>;

    /// All teams
    async fn teams(&self) -> Result<Vec<Team>, StoreError>;

    /// The full active-user directory
    async fn active_users(&self) -> Result<Vec<UserId>, StoreError>;

    /// Owner-history ledger for a card, oldest first
    async fn owner_history(&self, card: CardId) -> Result<Vec<OwnerHistoryEntry>, StoreError>;

    /// Audit events for a card, oldest first
    async fn events_for(&self, card: CardId) -> Result<Vec<DomainEvent>, StoreError>;

    /// Tasks attached to a card
    async fn tasks_for(&self, card: CardId) -> Result<Vec<FollowUpTask>, StoreError>;

    /// Apply a stage(+owner) transition as one unit; returns the updated card
    async fn commit_transition(&self, commit: TransitionCommit) -> Result<Card, StoreError>;

    /// Insert a sub-card with its follow-up task and parent event as one unit
    async fn create_sub_card(&self, insert: SubCardInsert) -> Result<Card, StoreError>;

    /// Cancel a sub-card as one unit; returns the updated sub-card
    async fn cancel_sub_card(&self, commit: CancelCommit) -> Result<Card, StoreError>;

    /// Apply a merge as one unit; returns the updated (parent, sub-card)
    async fn commit_merge(&self, commit: MergeCommit) -> Result<(Card, Card), StoreError>;
}
