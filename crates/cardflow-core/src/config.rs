//! Lifecycle core configuration

use cardflow_domain::Phase;
use serde::{Deserialize, Serialize};

/// Configuration for the lifecycle core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// The phase cards start in; crossing out of it triggers an
    /// ownership handoff decision
    pub initial_phase: Phase,
    /// Always offer the full active directory as handoff candidates,
    /// even when a phase-scoped team exists
    pub show_all_candidates: bool,
    /// Task type used for the follow-up created alongside a sub-card
    pub follow_up_task_type: String,
}

impl FlowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With the full-directory candidate override enabled
    #[inline]
    #[must_use]
    pub fn with_show_all_candidates(mut self) -> Self {
        self.show_all_candidates = true;
        self
    }

    /// With a custom initial phase
    #[inline]
    #[must_use]
    pub fn with_initial_phase(mut self, phase: Phase) -> Self {
        self.initial_phase = phase;
        self
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            initial_phase: Phase::Sdr,
            show_all_candidates: false,
            follow_up_task_type: "follow_up".to_string(),
        }
    }
}
