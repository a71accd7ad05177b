//! Card entity and its lifecycle vocabulary
//!
//! A card is one trip deal moving through the pipeline. Sub-card state
//! (mode, status, merge record) lives inside [`CardKind::Sub`], so the
//! "sub-card fields populated iff kind = sub_card" rule holds by
//! construction rather than by runtime checks.

use crate::ids::{CardId, StageId, UserId};
use crate::stage::Phase;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary amount (deal value)
pub type Money = Decimal;

/// Commercial status of a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommercialStatus {
    /// Deal in progress
    Open,
    /// Deal won
    Won,
    /// Deal lost
    Lost,
    /// Deal on hold
    Paused,
}

impl CommercialStatus {
    /// Whether the deal has been won
    #[inline]
    #[must_use]
    pub fn is_won(&self) -> bool {
        matches!(self, Self::Won)
    }
}

/// How a sub-card's value reconciles into its parent on merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubCardMode {
    /// Sub-card value is added to the parent value
    Incremental,
    /// Sub-card value replaces the parent value
    Complete,
}

/// Sub-card lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubCardStatus {
    /// Open change request
    Active,
    /// Reconciled into the parent (terminal)
    Merged,
    /// Abandoned (terminal)
    Cancelled,
}

impl SubCardStatus {
    /// Whether this status permits no further stage-consequential work
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Merged | Self::Cancelled)
    }
}

/// Immutable record of a completed merge
///
/// Written exactly once when a sub-card transitions active → merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    /// Parent value observed before the merge
    pub old_parent_value: Money,
    /// Sub-card value applied
    pub sub_card_value: Money,
    /// Parent value after the merge
    pub new_parent_value: Money,
    /// Mode the merge was executed under
    pub mode: SubCardMode,
    /// When the merge committed
    pub merged_at: DateTime<Utc>,
}

/// State carried only by sub-cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCardState {
    /// The card this change request was branched from
    pub parent: CardId,
    /// Value reconciliation mode
    pub mode: SubCardMode,
    /// Lifecycle status
    pub status: SubCardStatus,
    /// Reason recorded on cancellation
    pub cancel_reason: Option<String>,
    /// Merge record, present iff status = merged
    pub merge: Option<MergeRecord>,
}

impl SubCardState {
    /// New active sub-card state
    #[inline]
    #[must_use]
    pub fn new(parent: CardId, mode: SubCardMode) -> Self {
        Self {
            parent,
            mode,
            status: SubCardStatus::Active,
            cancel_reason: None,
            merge: None,
        }
    }
}

/// Card kind: an ordinary deal or a change request branched from one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardKind {
    /// Ordinary deal card
    Normal,
    /// Change request linked to a parent card
    Sub(SubCardState),
}

/// A trip deal moving through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Card identifier
    pub id: CardId,
    /// Deal title
    pub title: String,
    /// Current phase
    pub phase: Phase,
    /// Current stage, if the card has entered one
    pub stage_id: Option<StageId>,
    /// Commercial status
    pub commercial_status: CommercialStatus,
    /// Current owner
    pub owner_id: UserId,
    /// Owner during the SDR phase, kept after handoff
    pub sdr_owner_id: Option<UserId>,
    /// Estimated deal value
    pub estimated_value: Money,
    /// Final value, overrides the estimate when set
    pub final_value: Option<Money>,
    /// Normal card or sub-card
    pub kind: CardKind,
    /// Free-form product data, also consulted by field obligations
    pub product_data: serde_json::Map<String, serde_json::Value>,
    /// Whether this card groups child cards
    pub group_parent: bool,
    /// Optimistic-concurrency version, bumped on every commit
    pub version: u64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card: no stage yet, initial phase, open deal
    #[must_use]
    pub fn new(title: impl Into<String>, owner_id: UserId) -> Self {
        Self {
            id: CardId::new(),
            title: title.into(),
            phase: Phase::Sdr,
            stage_id: None,
            commercial_status: CommercialStatus::Open,
            owner_id,
            sdr_owner_id: Some(owner_id),
            estimated_value: Money::ZERO,
            final_value: None,
            kind: CardKind::Normal,
            product_data: serde_json::Map::new(),
            group_parent: false,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// With estimated value
    #[inline]
    #[must_use]
    pub fn with_estimated_value(mut self, value: Money) -> Self {
        self.estimated_value = value;
        self
    }

    /// With a product-data field
    #[must_use]
    pub fn with_product_field(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.product_data.insert(key.into(), value);
        self
    }

    /// With the group-parent flag set
    #[inline]
    #[must_use]
    pub fn as_group_parent(mut self) -> Self {
        self.group_parent = true;
        self
    }

    /// Effective deal value: final when set, estimate otherwise
    #[inline]
    #[must_use]
    pub fn current_value(&self) -> Money {
        self.final_value.unwrap_or(self.estimated_value)
    }

    /// Whether this card is a sub-card
    #[inline]
    #[must_use]
    pub fn is_sub_card(&self) -> bool {
        matches!(self.kind, CardKind::Sub(_))
    }

    /// Sub-card state, if any
    #[inline]
    #[must_use]
    pub fn sub_state(&self) -> Option<&SubCardState> {
        match &self.kind {
            CardKind::Sub(state) => Some(state),
            CardKind::Normal => None,
        }
    }

    /// Mutable sub-card state, if any
    #[inline]
    pub fn sub_state_mut(&mut self) -> Option<&mut SubCardState> {
        match &mut self.kind {
            CardKind::Sub(state) => Some(state),
            CardKind::Normal => None,
        }
    }
}
