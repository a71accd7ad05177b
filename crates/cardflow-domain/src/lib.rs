//! Cardflow domain model
//!
//! Entity and value types shared by the lifecycle core:
//! - Cards (deals) and sub-cards (change requests)
//! - Stages, phases, and the stage catalog
//! - Stage obligations and the gate snapshot
//! - Ownership history and teams
//! - Audit events

#![warn(unreachable_pub)]

pub mod card;
pub mod event;
pub mod ids;
pub mod obligation;
pub mod owner;
pub mod snapshot;
pub mod stage;

// Re-exports for convenience
pub use card::{
    Card, CardKind, CommercialStatus, MergeRecord, Money, SubCardMode, SubCardState,
    SubCardStatus,
};
pub use event::{DomainEvent, EventKind};
pub use ids::{CardId, EventId, ObligationId, StageId, TaskId, TeamId, UserId};
pub use obligation::{CardObligation, ObligationRule, ProposalStatus, StageObligation};
pub use owner::{OwnerHistoryEntry, Team};
pub use snapshot::{is_missing, CardSnapshot, GateContext, TaskSnapshot};
pub use stage::{Phase, Stage, StageCatalog};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
