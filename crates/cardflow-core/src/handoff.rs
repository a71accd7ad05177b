//! Ownership handoff candidate resolution
//!
//! When a card crosses out of the initial phase, the caller must decide
//! who owns it next. Candidates come from teams scoped to the target
//! phase; when none exist (or the override is set) the whole active
//! directory is offered. The fallback is a deliberate fail-open business
//! rule, not an error path: the candidate set is never empty while any
//! active user exists.

use cardflow_domain::{Phase, Team, TeamId, UserId};
use indexmap::IndexSet;

/// Where the candidate set came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Union of members of teams scoped to the target phase
    PhaseTeams(Vec<TeamId>),
    /// Fail-open fallback: the full active-user directory
    FullDirectory,
}

/// Owner candidates for a handoff decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffCandidates {
    /// Candidate users, deduplicated, in stable order
    pub user_ids: Vec<UserId>,
    /// How the set was derived
    pub source: CandidateSource,
}

impl HandoffCandidates {
    /// Whether a user is among the candidates
    #[inline]
    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.user_ids.contains(&user)
    }
}

/// Resolve the owner-candidate set for a target phase
#[must_use]
pub fn resolve(
    target_phase: Phase,
    teams: &[Team],
    show_all: bool,
    directory: &[UserId],
) -> HandoffCandidates {
    if !show_all {
        let matching: Vec<&Team> = teams
            .iter()
            .filter(|t| t.phase == Some(target_phase))
            .collect();
        if !matching.is_empty() {
            let mut members = IndexSet::new();
            for team in &matching {
                members.extend(team.members.iter().copied());
            }
            return HandoffCandidates {
                user_ids: members.into_iter().collect(),
                source: CandidateSource::PhaseTeams(matching.iter().map(|t| t.id).collect()),
            };
        }
        tracing::debug!(%target_phase, "no phase-scoped team, falling back to full directory");
    }

    let mut members: IndexSet<UserId> = IndexSet::new();
    members.extend(directory.iter().copied());
    HandoffCandidates {
        user_ids: members.into_iter().collect(),
        source: CandidateSource::FullDirectory,
    }
}
