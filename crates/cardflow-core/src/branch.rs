//! Change-request (sub-card) branching
//!
//! A won post-sale deal can branch into a linked sub-card that tracks a
//! change request through its own stages. Branching is single-level:
//! the parent must be an ordinary post-sale card that is not a group
//! parent. Creation inserts the sub-card, a follow-up task carrying the
//! request description, and the audit event as one store unit.

use crate::config::FlowConfig;
use crate::error::{BranchDecline, CancelDecline, FlowError};
use crate::store::{CancelCommit, FollowUpTask, PipelineStore, SubCardInsert};
use cardflow_domain::{
    Card, CardId, CardKind, DomainEvent, EventKind, Phase, SubCardMode, SubCardState,
    SubCardStatus, UserId,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

/// Request to branch a change request off a parent card
#[derive(Debug, Clone)]
pub struct BranchRequest {
    /// Sub-card title
    pub title: String,
    /// What the change request is about; recorded on the follow-up task
    pub description: String,
    /// Value reconciliation mode
    pub mode: SubCardMode,
}

impl BranchRequest {
    /// New branch request
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        mode: SubCardMode,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            mode,
        }
    }
}

/// Result of a branch request
#[derive(Debug, Clone)]
pub enum BranchOutcome {
    /// Sub-card created
    Created(Card),
    /// Precondition failed; nothing was written
    Declined(BranchDecline),
}

/// Result of a cancel request
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    /// Sub-card cancelled
    Cancelled(Card),
    /// Sub-card was not active; nothing was written
    Declined(CancelDecline),
}

/// A sub-card with its computed merge eligibility
#[derive(Debug, Clone)]
pub struct SubCardSummary {
    /// The sub-card
    pub card: Card,
    /// Active and won, so the merge engine will accept it
    pub merge_eligible: bool,
}

/// Creates, cancels, and lists change-request sub-cards
#[derive(Debug, Clone)]
pub struct SubCardBranchManager {
    store: Arc<dyn PipelineStore>,
    config: FlowConfig,
}

impl SubCardBranchManager {
    /// New manager over a store
    #[must_use]
    pub fn new(store: Arc<dyn PipelineStore>, config: FlowConfig) -> Self {
        Self { store, config }
    }

    /// Branch a sub-card off a parent
    ///
    /// Declines, without writing anything, when the parent is not in the
    /// post-sale phase, is itself a sub-card, or is a group parent.
    pub async fn create(
        &self,
        parent_id: CardId,
        request: BranchRequest,
        actor: UserId,
    ) -> Result<BranchOutcome, FlowError> {
        let parent = self.store.load_card(parent_id).await?;

        if parent.phase != Phase::PostSale {
            return Ok(BranchOutcome::Declined(BranchDecline::ParentNotPostSale(
                parent.phase,
            )));
        }
        if parent.is_sub_card() {
            return Ok(BranchOutcome::Declined(BranchDecline::ParentIsSubCard));
        }
        if parent.group_parent {
            return Ok(BranchOutcome::Declined(BranchDecline::ParentIsGroupParent));
        }

        let seed_value = match request.mode {
            SubCardMode::Incremental => Decimal::ZERO,
            SubCardMode::Complete => parent.current_value(),
        };
        let mut card = Card::new(request.title, parent.owner_id).with_estimated_value(seed_value);
        card.kind = CardKind::Sub(SubCardState::new(parent.id, request.mode));

        let task = FollowUpTask::new(
            card.id,
            self.config.follow_up_task_type.clone(),
            request.description,
        );
        let event = DomainEvent::new(
            EventKind::SubCardCreated,
            format!("change request \"{}\" opened", card.title),
            parent.id,
            actor,
        )
        .with_metadata(json!({
            "sub_card_id": card.id.to_string(),
            "mode": request.mode,
            "seed_value": seed_value,
        }));

        let created = self
            .store
            .create_sub_card(SubCardInsert {
                card,
                task,
                event,
            })
            .await?;
        tracing::info!(
            parent_id = %parent.id,
            sub_card_id = %created.id,
            mode = ?request.mode,
            "sub-card created"
        );
        Ok(BranchOutcome::Created(created))
    }

    /// Cancel an active sub-card
    ///
    /// The parent is untouched; merged or already-cancelled sub-cards
    /// decline without writing anything.
    pub async fn cancel(
        &self,
        sub_id: CardId,
        reason: Option<String>,
        actor: UserId,
    ) -> Result<CancelOutcome, FlowError> {
        let card = self.store.load_card(sub_id).await?;
        let state = card.sub_state().ok_or(FlowError::NotASubCard(sub_id))?;

        if state.status != SubCardStatus::Active {
            return Ok(CancelOutcome::Declined(CancelDecline::NotActive(
                state.status,
            )));
        }

        let event = DomainEvent::new(
            EventKind::SubCardCancelled,
            format!("change request \"{}\" cancelled", card.title),
            state.parent,
            actor,
        )
        .with_metadata(json!({
            "sub_card_id": card.id.to_string(),
            "reason": reason,
        }));
        let cancelled = self
            .store
            .cancel_sub_card(CancelCommit {
                card_id: card.id,
                expected_version: card.version,
                reason,
                event,
            })
            .await?;
        tracing::info!(sub_card_id = %cancelled.id, "sub-card cancelled");
        Ok(CancelOutcome::Cancelled(cancelled))
    }

    /// All sub-cards of a parent, with computed merge eligibility
    pub async fn list(&self, parent_id: CardId) -> Result<Vec<SubCardSummary>, FlowError> {
        let cards = self.store.sub_cards_of(parent_id).await?;
        Ok(cards
            .into_iter()
            .map(|card| {
                let merge_eligible = card
                    .sub_state()
                    .is_some_and(|s| s.status == SubCardStatus::Active)
                    && card.commercial_status.is_won();
                SubCardSummary {
                    card,
                    merge_eligible,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockPipelineStore;
    use rust_decimal_macros::dec;

    fn post_sale_parent() -> Card {
        let mut card = Card::new("Lisbon trip", UserId::new()).with_estimated_value(dec!(1000));
        card.phase = Phase::PostSale;
        card.commercial_status = cardflow_domain::CommercialStatus::Won;
        card
    }

    fn manager(store: MockPipelineStore) -> SubCardBranchManager {
        SubCardBranchManager::new(Arc::new(store), FlowConfig::new())
    }

    #[tokio::test]
    async fn declines_parent_outside_post_sale() {
        let parent = Card::new("Lisbon trip", UserId::new());
        let parent_id = parent.id;
        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(parent.clone()));
        // No expectation on create_sub_card: a call would panic the mock.

        let outcome = manager(store)
            .create(
                parent_id,
                BranchRequest::new("extra leg", "add Porto", SubCardMode::Incremental),
                UserId::new(),
            )
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            BranchOutcome::Declined(BranchDecline::ParentNotPostSale(Phase::Sdr))
        ));
    }

    #[tokio::test]
    async fn declines_branching_from_a_sub_card() {
        let mut parent = post_sale_parent();
        parent.kind = CardKind::Sub(SubCardState::new(CardId::new(), SubCardMode::Incremental));
        let parent_id = parent.id;
        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(parent.clone()));

        let outcome = manager(store)
            .create(
                parent_id,
                BranchRequest::new("nested", "nope", SubCardMode::Incremental),
                UserId::new(),
            )
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            BranchOutcome::Declined(BranchDecline::ParentIsSubCard)
        ));
    }

    #[tokio::test]
    async fn declines_group_parent() {
        let parent = post_sale_parent().as_group_parent();
        let parent_id = parent.id;
        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(parent.clone()));

        let outcome = manager(store)
            .create(
                parent_id,
                BranchRequest::new("group", "nope", SubCardMode::Complete),
                UserId::new(),
            )
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            BranchOutcome::Declined(BranchDecline::ParentIsGroupParent)
        ));
    }

    #[tokio::test]
    async fn complete_mode_seeds_parent_current_value() {
        let mut parent = post_sale_parent();
        parent.final_value = Some(dec!(1400));
        let parent_id = parent.id;
        let owner = parent.owner_id;
        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(parent.clone()));
        store
            .expect_create_sub_card()
            .withf(move |insert| {
                insert.card.estimated_value == dec!(1400)
                    && insert.card.owner_id == owner
                    && insert.task.description == "rebuild itinerary"
                    && insert.event.kind == EventKind::SubCardCreated
                    && insert.event.card_id == parent_id
            })
            .returning(|insert| Ok(insert.card));

        let outcome = manager(store)
            .create(
                parent_id,
                BranchRequest::new("rework", "rebuild itinerary", SubCardMode::Complete),
                UserId::new(),
            )
            .await
            .unwrap();
        let BranchOutcome::Created(card) = outcome else {
            panic!("expected Created");
        };
        assert_eq!(card.estimated_value, dec!(1400));
        assert!(card.is_sub_card());
    }

    #[tokio::test]
    async fn incremental_mode_seeds_zero() {
        let parent = post_sale_parent();
        let parent_id = parent.id;
        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(parent.clone()));
        store
            .expect_create_sub_card()
            .returning(|insert| Ok(insert.card));

        let outcome = manager(store)
            .create(
                parent_id,
                BranchRequest::new("extra leg", "add Porto", SubCardMode::Incremental),
                UserId::new(),
            )
            .await
            .unwrap();
        let BranchOutcome::Created(card) = outcome else {
            panic!("expected Created");
        };
        assert_eq!(card.estimated_value, Decimal::ZERO);
    }

    #[tokio::test]
    async fn cancel_declines_merged_sub_card() {
        let mut sub = Card::new("extra leg", UserId::new());
        let mut state = SubCardState::new(CardId::new(), SubCardMode::Incremental);
        state.status = SubCardStatus::Merged;
        sub.kind = CardKind::Sub(state);
        let sub_id = sub.id;
        let mut store = MockPipelineStore::new();
        store.expect_load_card().returning(move |_| Ok(sub.clone()));

        let outcome = manager(store)
            .cancel(sub_id, Some("late".into()), UserId::new())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CancelOutcome::Declined(CancelDecline::NotActive(SubCardStatus::Merged))
        ));
    }

    #[tokio::test]
    async fn cancel_on_ordinary_card_is_an_error() {
        let card = Card::new("plain", UserId::new());
        let card_id = card.id;
        let mut store = MockPipelineStore::new();
        store
            .expect_load_card()
            .returning(move |_| Ok(card.clone()));

        let err = manager(store)
            .cancel(card_id, None, UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::NotASubCard(_)));
    }

    #[tokio::test]
    async fn list_computes_merge_eligibility() {
        let parent_id = CardId::new();
        let mut won_active = Card::new("a", UserId::new());
        won_active.kind = CardKind::Sub(SubCardState::new(parent_id, SubCardMode::Incremental));
        won_active.commercial_status = cardflow_domain::CommercialStatus::Won;

        let mut open_active = Card::new("b", UserId::new());
        open_active.kind = CardKind::Sub(SubCardState::new(parent_id, SubCardMode::Incremental));

        let mut won_merged = Card::new("c", UserId::new());
        let mut merged_state = SubCardState::new(parent_id, SubCardMode::Incremental);
        merged_state.status = SubCardStatus::Merged;
        won_merged.kind = CardKind::Sub(merged_state);
        won_merged.commercial_status = cardflow_domain::CommercialStatus::Won;

        let cards = vec![won_active.clone(), open_active, won_merged];
        let mut store = MockPipelineStore::new();
        store
            .expect_sub_cards_of()
            .returning(move |_| Ok(cards.clone()));

        let summaries = manager(store).list(parent_id).await.unwrap();
        let eligible: Vec<_> = summaries
            .iter()
            .filter(|s| s.merge_eligible)
            .map(|s| s.card.id)
            .collect();
        assert_eq!(eligible, vec![won_active.id]);
    }
}
