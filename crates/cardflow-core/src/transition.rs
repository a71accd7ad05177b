//! Stage transition coordination
//!
//! The coordinator walks one attempt through gate check, optional
//! ownership handoff, and a single atomic commit:
//!
//! - Gate failure returns the full [`GateReport`] and mutates nothing.
//! - Crossing out of the initial phase pauses the attempt with an
//!   [`OwnerDecision`]; the caller confirms an owner (keeping the default
//!   counts) and the commit applies stage and owner together.
//! - Entering a won/lost stage updates the commercial status in the same
//!   unit; a lost transition may carry a loss reason into the event
//!   metadata.
//!
//! Decisions carry the card version observed at gate time, so a commit
//! built from a stale decision fails with a version conflict instead of
//! clobbering a concurrent change.

use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::handoff::{self, HandoffCandidates};
use crate::store::{OwnerChange, PipelineStore, TransitionCommit};
use cardflow_domain::{
    Card, CardId, CardSnapshot, CommercialStatus, DomainEvent, EventKind, Phase, StageCatalog,
    StageId, UserId,
};
use cardflow_gate::{evaluate, GateReport};
use serde_json::json;
use std::sync::Arc;

/// One requested stage move
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    /// Card to move
    pub card_id: CardId,
    /// Stage to move into
    pub target_stage: StageId,
    /// Acting user
    pub actor: UserId,
    /// Reason recorded when the target stage marks the deal lost
    pub loss_reason: Option<String>,
}

impl TransitionRequest {
    /// New request without a loss reason
    #[inline]
    #[must_use]
    pub fn new(card_id: CardId, target_stage: StageId, actor: UserId) -> Self {
        Self {
            card_id,
            target_stage,
            actor,
            loss_reason: None,
        }
    }

    /// Attach a loss reason
    #[inline]
    #[must_use]
    pub fn with_loss_reason(mut self, reason: impl Into<String>) -> Self {
        self.loss_reason = Some(reason.into());
        self
    }
}

/// Pending handoff decision for a phase-crossing transition
///
/// Holds everything the later commit needs, including the card version
/// observed at gate time.
#[derive(Debug, Clone)]
pub struct OwnerDecision {
    /// Card being moved
    pub card_id: CardId,
    /// Card version at gate time
    pub card_version: u64,
    /// Target stage
    pub target_stage: StageId,
    /// Phase of the target stage
    pub target_phase: Phase,
    /// Preselected default: the current owner
    pub default_owner: UserId,
    /// Resolved candidate set
    pub candidates: HandoffCandidates,
    /// Loss reason carried through from the request
    pub loss_reason: Option<String>,
}

/// Proof of a committed transition
#[derive(Debug, Clone)]
pub struct TransitionReceipt {
    /// The card after the commit
    pub card: Card,
    /// Whether the commit also reassigned ownership
    pub owner_changed: bool,
}

/// Result of one transition attempt
#[derive(Debug, Clone)]
pub enum TransitionAttempt {
    /// Gate failed; nothing was written
    Blocked(GateReport),
    /// Phase crossing: the caller must confirm an owner
    OwnerDecisionRequired(OwnerDecision),
    /// Transition committed without a handoff
    Committed(TransitionReceipt),
}

/// Drives stage transitions against the store
#[derive(Debug, Clone)]
pub struct TransitionCoordinator {
    store: Arc<dyn PipelineStore>,
    catalog: StageCatalog,
    config: FlowConfig,
}

impl TransitionCoordinator {
    /// New coordinator over a store and stage catalog
    #[must_use]
    pub fn new(store: Arc<dyn PipelineStore>, catalog: StageCatalog, config: FlowConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Attempt to move a card into a target stage
    ///
    /// Read-only until the commit: a blocked gate or a pending owner
    /// decision leaves the card untouched.
    pub async fn attempt(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionAttempt, FlowError> {
        let card = self.store.load_card(request.card_id).await?;

        if let Some(sub) = card.sub_state() {
            if sub.status.is_terminal() {
                return Err(FlowError::SubCardTerminal {
                    card_id: card.id,
                    status: sub.status,
                });
            }
        }

        let stage = self
            .catalog
            .get(request.target_stage)
            .ok_or(FlowError::UnknownStage(request.target_stage))?
            .clone();

        let obligations = self.store.obligations_for_stage(stage.id).await?;
        let ctx = self.store.gate_context(card.id).await?;
        let snapshot = CardSnapshot::project(&card, &obligations, ctx);
        let report = evaluate(&snapshot, stage.id, &obligations);
        if !report.is_valid() {
            tracing::debug!(
                card_id = %card.id,
                stage = %stage.name,
                missing = report.missing_count(),
                "transition blocked by quality gate"
            );
            return Ok(TransitionAttempt::Blocked(report));
        }

        let crossing = stage.phase != card.phase && card.phase == self.config.initial_phase;
        if crossing {
            let teams = self.store.teams().await?;
            let directory = self.store.active_users().await?;
            let candidates = handoff::resolve(
                stage.phase,
                &teams,
                self.config.show_all_candidates,
                &directory,
            );
            tracing::info!(
                card_id = %card.id,
                from = %card.phase,
                to = %stage.phase,
                candidates = candidates.user_ids.len(),
                "phase crossing, owner decision required"
            );
            return Ok(TransitionAttempt::OwnerDecisionRequired(OwnerDecision {
                card_id: card.id,
                card_version: card.version,
                target_stage: stage.id,
                target_phase: stage.phase,
                default_owner: card.owner_id,
                candidates,
                loss_reason: request.loss_reason,
            }));
        }

        let commit = build_commit(
            &card,
            card.version,
            stage.id,
            stage.phase,
            stage_status(&stage),
            None,
            request.actor,
            &stage.name,
            request.loss_reason.as_deref(),
        );
        let card = self.store.commit_transition(commit).await?;
        tracing::info!(card_id = %card.id, stage = %stage.name, "transition committed");
        Ok(TransitionAttempt::Committed(TransitionReceipt {
            card,
            owner_changed: false,
        }))
    }

    /// Commit a phase-crossing transition with the confirmed owner
    ///
    /// Confirming the unchanged default owner counts as resolution; the
    /// history ledger still records the confirmation. The commit is
    /// checked against the version captured in the decision.
    pub async fn confirm_owner(
        &self,
        decision: OwnerDecision,
        owner: UserId,
        reason: Option<String>,
        actor: UserId,
    ) -> Result<TransitionReceipt, FlowError> {
        let card = self.store.load_card(decision.card_id).await?;
        let stage = self
            .catalog
            .get(decision.target_stage)
            .ok_or(FlowError::UnknownStage(decision.target_stage))?
            .clone();

        let owner_changed = owner != card.owner_id;
        let commit = build_commit(
            &card,
            decision.card_version,
            stage.id,
            stage.phase,
            stage_status(&stage),
            Some(OwnerChange {
                new_owner: owner,
                reason,
                actor,
            }),
            actor,
            &stage.name,
            decision.loss_reason.as_deref(),
        );
        let card = self.store.commit_transition(commit).await?;
        tracing::info!(
            card_id = %card.id,
            stage = %stage.name,
            owner = %owner,
            owner_changed,
            "phase-crossing transition committed"
        );
        Ok(TransitionReceipt {
            card,
            owner_changed,
        })
    }
}

fn stage_status(stage: &cardflow_domain::Stage) -> Option<CommercialStatus> {
    if stage.is_won {
        Some(CommercialStatus::Won)
    } else if stage.is_lost {
        Some(CommercialStatus::Lost)
    } else {
        None
    }
}

#[allow(clippy::too_many_arguments)]
fn build_commit(
    card: &Card,
    expected_version: u64,
    stage_id: StageId,
    phase: Phase,
    status: Option<CommercialStatus>,
    owner_change: Option<OwnerChange>,
    actor: UserId,
    stage_name: &str,
    loss_reason: Option<&str>,
) -> TransitionCommit {
    let mut metadata = json!({
        "from_stage": card.stage_id.map(|s| s.to_string()),
        "to_stage": stage_id.to_string(),
        "to_phase": phase.to_string(),
    });
    if let Some(reason) = loss_reason {
        metadata["loss_reason"] = json!(reason);
    }
    let mut events = vec![DomainEvent::new(
        EventKind::StageChanged,
        format!("moved to {stage_name}"),
        card.id,
        actor,
    )
    .with_metadata(metadata)];

    if let Some(change) = &owner_change {
        if change.new_owner != card.owner_id {
            events.push(
                DomainEvent::new(
                    EventKind::OwnerChanged,
                    format!("ownership transferred entering {phase}"),
                    card.id,
                    actor,
                )
                .with_metadata(json!({
                    "previous_owner": card.owner_id.to_string(),
                    "new_owner": change.new_owner.to_string(),
                    "reason": change.reason,
                })),
            );
        }
    }

    TransitionCommit {
        card_id: card.id,
        expected_version,
        stage_id,
        phase,
        status,
        owner_change,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MockPipelineStore;
    use cardflow_domain::{GateContext, Stage, StageObligation};

    fn catalog_with(stage: Stage) -> StageCatalog {
        StageCatalog::new(vec![
            Stage::new("New lead", Phase::Sdr, 0),
            stage,
        ])
    }

    #[tokio::test]
    async fn blocked_gate_never_touches_the_store() {
        let stage = Stage::new("Qualified", Phase::Sdr, 1);
        let stage_id = stage.id;
        let card = Card::new("Trip to Lisbon", UserId::new());
        let card_id = card.id;
        let actor = card.owner_id;

        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(card.clone()));
        store
            .expect_obligations_for_stage()
            .returning(move |s| Ok(vec![StageObligation::field(s, "budget", "Budget")]));
        store
            .expect_gate_context()
            .returning(|_| Ok(GateContext::empty()));
        // No expectation on commit_transition: a call would panic the mock.

        let coordinator = TransitionCoordinator::new(
            Arc::new(store),
            catalog_with(stage),
            FlowConfig::new(),
        );
        let attempt = coordinator
            .attempt(TransitionRequest::new(card_id, stage_id, actor))
            .await
            .unwrap();

        match attempt {
            TransitionAttempt::Blocked(report) => {
                assert_eq!(report.missing_fields.len(), 1);
                assert_eq!(report.missing_fields[0].key, "budget");
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_stage_is_an_error() {
        let card = Card::new("Trip", UserId::new());
        let card_id = card.id;
        let actor = card.owner_id;

        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(card.clone()));

        let coordinator = TransitionCoordinator::new(
            Arc::new(store),
            StageCatalog::default(),
            FlowConfig::new(),
        );
        let err = coordinator
            .attempt(TransitionRequest::new(card_id, StageId::new(), actor))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::UnknownStage(_)));
    }

    #[tokio::test]
    async fn phase_crossing_pauses_for_owner_decision() {
        let stage = Stage::new("Planning", Phase::Planner, 1);
        let stage_id = stage.id;
        let card = Card::new("Trip", UserId::new());
        let card_id = card.id;
        let owner = card.owner_id;
        let directory = vec![UserId::new(), UserId::new()];
        let directory_clone = directory.clone();

        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(card.clone()));
        store
            .expect_obligations_for_stage()
            .returning(|_| Ok(Vec::new()));
        store
            .expect_gate_context()
            .returning(|_| Ok(GateContext::empty()));
        store.expect_teams().returning(|| Ok(Vec::new()));
        store
            .expect_active_users()
            .returning(move || Ok(directory_clone.clone()));

        let coordinator = TransitionCoordinator::new(
            Arc::new(store),
            catalog_with(stage),
            FlowConfig::new(),
        );
        let attempt = coordinator
            .attempt(TransitionRequest::new(card_id, stage_id, owner))
            .await
            .unwrap();

        match attempt {
            TransitionAttempt::OwnerDecisionRequired(decision) => {
                assert_eq!(decision.default_owner, owner);
                assert_eq!(decision.card_version, 0);
                assert_eq!(decision.target_phase, Phase::Planner);
                assert_eq!(decision.candidates.user_ids, directory);
            }
            other => panic!("expected OwnerDecisionRequired, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_retryable() {
        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(|id| Err(StoreError::Backend(format!("timeout loading {id}"))));

        let coordinator = TransitionCoordinator::new(
            Arc::new(store),
            StageCatalog::default(),
            FlowConfig::new(),
        );
        let err = coordinator
            .attempt(TransitionRequest::new(
                CardId::new(),
                StageId::new(),
                UserId::new(),
            ))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
