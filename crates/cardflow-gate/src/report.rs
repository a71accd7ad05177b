//! Gate evaluation report
//!
//! Structured missing-requirement lists, shaped for direct rendering:
//! a blocked transition shows exactly which fields, proposals, and tasks
//! still need attention.

use cardflow_domain::ProposalStatus;
use serde::{Deserialize, Serialize};

/// A field obligation that is not satisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    /// Field key the rule references
    pub key: String,
    /// Display label
    pub label: String,
}

/// A proposal obligation that is not satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingProposal {
    /// Minimum status no proposal has reached
    pub min_status: ProposalStatus,
}

/// A task obligation that is not satisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingTask {
    /// Required task type
    pub task_type: String,
    /// Display label
    pub label: String,
}

/// Result of evaluating the gate for one (card, target stage) pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// Unsatisfied field obligations
    pub missing_fields: Vec<MissingField>,
    /// Unsatisfied proposal obligations
    pub missing_proposals: Vec<MissingProposal>,
    /// Unsatisfied task obligations
    pub missing_tasks: Vec<MissingTask>,
}

impl GateReport {
    /// Report with nothing missing
    #[inline]
    #[must_use]
    pub fn clear() -> Self {
        Self::default()
    }

    /// Whether the card may enter the target stage
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing_fields.is_empty()
            && self.missing_proposals.is_empty()
            && self.missing_tasks.is_empty()
    }

    /// Total number of unsatisfied obligations
    #[inline]
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.missing_fields.len() + self.missing_proposals.len() + self.missing_tasks.len()
    }
}
