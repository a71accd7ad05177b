//! Cardflow Core - Stage Transition & Change-Request Lifecycle
//!
//! The mutating half of the pipeline:
//! - Coordinates stage transitions through the quality gate
//! - Resolves ownership handoff candidates on phase crossing
//! - Branches change-request sub-cards off won post-sale deals
//! - Reconciles sub-card values into their parents on merge
//! - Defines the atomic store boundary and an in-memory implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use cardflow_core::{FlowConfig, MemoryStore, TransitionCoordinator, TransitionRequest};
//! use std::sync::Arc;
//!
//! # async fn example(catalog: cardflow_domain::StageCatalog) -> Result<(), cardflow_core::FlowError> {
//! let store = Arc::new(MemoryStore::new());
//! let coordinator = TransitionCoordinator::new(store, catalog, FlowConfig::new());
//!
//! let attempt = coordinator.attempt(request).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod branch;
pub mod config;
pub mod error;
pub mod handoff;
pub mod memory;
pub mod merge;
pub mod store;
pub mod transition;

// Re-exports for convenience
pub use branch::{
    BranchOutcome, BranchRequest, CancelOutcome, SubCardBranchManager, SubCardSummary,
};
pub use config::FlowConfig;
pub use error::{BranchDecline, CancelDecline, FlowError, MergeDecline, StoreError};
pub use handoff::{CandidateSource, HandoffCandidates};
pub use memory::MemoryStore;
pub use merge::{MergeEngine, MergeOutcome};
pub use store::{
    CancelCommit, FollowUpTask, MergeCommit, OwnerChange, PipelineStore, SubCardInsert,
    TransitionCommit,
};
pub use transition::{
    OwnerDecision, TransitionAttempt, TransitionCoordinator, TransitionReceipt, TransitionRequest,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Cardflow Core
    pub use crate::{
        BranchOutcome, BranchRequest, FlowConfig, FlowError, MemoryStore, MergeEngine,
        MergeOutcome, PipelineStore, SubCardBranchManager, TransitionAttempt,
        TransitionCoordinator, TransitionRequest,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
