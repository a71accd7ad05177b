//! Pipeline stages and phases
//!
//! Stages are ordered steps; phases are the coarse groupings
//! (SDR, Planner, Post-sale) used to decide when an ownership handoff
//! is required. The catalog is external reference data, loaded once and
//! treated as read-only.

use crate::ids::StageId;
use serde::{Deserialize, Serialize};

/// Coarse grouping of stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Prospecting / qualification (initial phase)
    Sdr,
    /// Trip planning
    Planner,
    /// After the deal is won
    PostSale,
    /// Anything outside the main funnel
    Other,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Sdr => "SDR",
            Phase::Planner => "Planner",
            Phase::PostSale => "Post-sale",
            Phase::Other => "Other",
        };
        write!(f, "{name}")
    }
}

/// One ordered step in the pipeline, belonging to exactly one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage identifier
    pub id: StageId,
    /// Display name
    pub name: String,
    /// Owning phase
    pub phase: Phase,
    /// Position within the pipeline (ascending)
    pub order: u32,
    /// Entering this stage marks the deal won
    pub is_won: bool,
    /// Entering this stage marks the deal lost
    pub is_lost: bool,
}

impl Stage {
    /// Create a plain stage
    #[must_use]
    pub fn new(name: impl Into<String>, phase: Phase, order: u32) -> Self {
        Self {
            id: StageId::new(),
            name: name.into(),
            phase,
            order,
            is_won: false,
            is_lost: false,
        }
    }

    /// Mark as the winning stage
    #[inline]
    #[must_use]
    pub fn winning(mut self) -> Self {
        self.is_won = true;
        self
    }

    /// Mark as a losing stage
    #[inline]
    #[must_use]
    pub fn losing(mut self) -> Self {
        self.is_lost = true;
        self
    }
}

/// Ordered, phase-grouped stage reference data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageCatalog {
    stages: Vec<Stage>,
}

impl StageCatalog {
    /// Build a catalog; stages are kept sorted by `order`
    #[must_use]
    pub fn new(mut stages: Vec<Stage>) -> Self {
        stages.sort_by_key(|s| s.order);
        Self { stages }
    }

    /// Look up a stage by id
    #[must_use]
    pub fn get(&self, id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Phase a stage belongs to
    #[inline]
    #[must_use]
    pub fn phase_of(&self, id: StageId) -> Option<Phase> {
        self.get(id).map(|s| s.phase)
    }

    /// All stages, in pipeline order
    #[inline]
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages belonging to one phase, in pipeline order
    pub fn stages_in(&self, phase: Phase) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(move |s| s.phase == phase)
    }
}
