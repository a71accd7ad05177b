//! In-memory store
//!
//! Reference implementation of [`PipelineStore`] used by tests and local
//! tooling. Reference data (obligations, teams, users) lives in
//! lock-free maps; all transactional state sits behind a single mutex so
//! every commit method is one indivisible unit, matching the atomicity
//! contract of a real backend transaction.

use crate::error::StoreError;
use crate::store::{
    CancelCommit, FollowUpTask, MergeCommit, PipelineStore, SubCardInsert, TransitionCommit,
};
use async_trait::async_trait;
use cardflow_domain::{
    Card, CardId, CardObligation, DomainEvent, GateContext, ObligationId, OwnerHistoryEntry,
    ProposalStatus, StageId, StageObligation, SubCardStatus, TaskSnapshot, Team, UserId,
};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// Transactional tables guarded by one lock
#[derive(Debug, Default)]
struct TxState {
    cards: HashMap<CardId, Card>,
    history: Vec<OwnerHistoryEntry>,
    events: Vec<DomainEvent>,
    tasks: Vec<FollowUpTask>,
    proposals: HashMap<CardId, Vec<ProposalStatus>>,
    completions: HashMap<CardId, HashSet<ObligationId>>,
}

/// In-memory [`PipelineStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    obligations: DashMap<StageId, Vec<StageObligation>>,
    teams: RwLock<Vec<Team>>,
    users: RwLock<Vec<UserId>>,
    state: Mutex<TxState>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stage obligation
    pub fn seed_obligation(&self, obligation: StageObligation) {
        self.obligations
            .entry(obligation.stage_id)
            .or_default()
            .push(obligation);
    }

    /// Seed a team
    pub fn seed_team(&self, team: Team) {
        self.teams.write().push(team);
    }

    /// Seed an active user
    pub fn seed_user(&self, user: UserId) {
        self.users.write().push(user);
    }

    /// Seed a proposal status on a card
    pub fn seed_proposal(&self, card: CardId, status: ProposalStatus) {
        self.state.lock().proposals.entry(card).or_default().push(status);
    }

    /// Seed a task
    pub fn seed_task(&self, task: FollowUpTask) {
        self.state.lock().tasks.push(task);
    }

    /// Seed a manual obligation completion
    pub fn seed_completion(&self, completion: &CardObligation) {
        self.state
            .lock()
            .completions
            .entry(completion.card_id)
            .or_default()
            .insert(completion.obligation_id);
    }

    /// Make the next commit method fail before mutating anything
    ///
    /// Test hook for the no-partial-state contract.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn check_fail(&self) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn load_card(&self, id: CardId) -> Result<Card, StoreError> {
        self.state
            .lock()
            .cards
            .get(&id)
            .cloned()
            .ok_or(StoreError::CardNotFound(id))
    }

    async fn insert_card(&self, card: Card) -> Result<(), StoreError> {
        let mut guard = self.state.lock();
        let entry = OwnerHistoryEntry::open(card.id, card.owner_id, card.phase);
        guard.history.push(entry);
        guard.cards.insert(card.id, card);
        Ok(())
    }

    async fn sub_cards_of(&self, parent: CardId) -> Result<Vec<Card>, StoreError> {
        let guard = self.state.lock();
        let mut subs: Vec<Card> = guard
            .cards
            .values()
            .filter(|c| c.sub_state().is_some_and(|s| s.parent == parent))
            .cloned()
            .collect();
        subs.sort_by_key(|c| c.created_at);
        Ok(subs)
    }

    async fn obligations_for_stage(
        &self,
        stage: StageId,
    ) -> Result<Vec<StageObligation>, StoreError> {
        Ok(self
            .obligations
            .get(&stage)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn gate_context(&self, card: CardId) -> Result<GateContext, StoreError> {
        let guard = self.state.lock();
        Ok(GateContext {
            proposals: guard.proposals.get(&card).cloned().unwrap_or_default(),
            tasks: guard
                .tasks
                .iter()
                .filter(|t| t.card_id == card)
                .map(|t| TaskSnapshot::new(t.task_type.clone(), t.completed))
                .collect(),
            completed_obligations: guard.completions.get(&card).cloned().unwrap_or_default(),
        })
    }

    async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        Ok(self.teams.read().clone())
    }

    async fn active_users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.users.read().clone())
    }

    async fn owner_history(&self, card: CardId) -> Result<Vec<OwnerHistoryEntry>, StoreError> {
        Ok(self
            .state
            .lock()
            .history
            .iter()
            .filter(|e| e.card_id == card)
            .cloned()
            .collect())
    }

    async fn events_for(&self, card: CardId) -> Result<Vec<DomainEvent>, StoreError> {
        let mut events: Vec<DomainEvent> = self
            .state
            .lock()
            .events
            .iter()
            .filter(|e| e.card_id == card)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    async fn tasks_for(&self, card: CardId) -> Result<Vec<FollowUpTask>, StoreError> {
        Ok(self
            .state
            .lock()
            .tasks
            .iter()
            .filter(|t| t.card_id == card)
            .cloned()
            .collect())
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<Card, StoreError> {
        self.check_fail()?;
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let card = state
            .cards
            .get_mut(&commit.card_id)
            .ok_or(StoreError::CardNotFound(commit.card_id))?;
        if card.version != commit.expected_version {
            return Err(StoreError::VersionConflict {
                card_id: commit.card_id,
                expected: commit.expected_version,
                actual: card.version,
            });
        }

        card.stage_id = Some(commit.stage_id);
        card.phase = commit.phase;
        if let Some(status) = commit.status {
            card.commercial_status = status;
        }

        if let Some(change) = &commit.owner_change {
            card.owner_id = change.new_owner;

            // Close the open ledger entry and open the next in the same unit
            let now = Utc::now();
            if let Some(open) = state
                .history
                .iter_mut()
                .find(|e| e.card_id == commit.card_id && e.is_open())
            {
                open.ended_at = Some(now);
            }
            let mut entry =
                OwnerHistoryEntry::open(commit.card_id, change.new_owner, commit.phase)
                    .transferred_by(change.actor);
            if let Some(reason) = &change.reason {
                entry = entry.with_reason(reason.clone());
            }
            state.history.push(entry);
        }

        card.version += 1;
        let updated = card.clone();
        state.events.extend(commit.events);
        Ok(updated)
    }

    async fn create_sub_card(&self, insert: SubCardInsert) -> Result<Card, StoreError> {
        self.check_fail()?;
        let mut guard = self.state.lock();
        let entry = OwnerHistoryEntry::open(insert.card.id, insert.card.owner_id, insert.card.phase);
        guard.history.push(entry);
        guard.tasks.push(insert.task);
        guard.events.push(insert.event);
        let card = insert.card.clone();
        guard.cards.insert(insert.card.id, insert.card);
        Ok(card)
    }

    async fn cancel_sub_card(&self, commit: CancelCommit) -> Result<Card, StoreError> {
        self.check_fail()?;
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let card = state
            .cards
            .get_mut(&commit.card_id)
            .ok_or(StoreError::CardNotFound(commit.card_id))?;
        if card.version != commit.expected_version {
            return Err(StoreError::VersionConflict {
                card_id: commit.card_id,
                expected: commit.expected_version,
                actual: card.version,
            });
        }
        let Some(sub) = card.sub_state_mut() else {
            return Err(StoreError::Backend(format!(
                "cancel on non-sub-card {}",
                commit.card_id
            )));
        };
        sub.status = SubCardStatus::Cancelled;
        sub.cancel_reason.clone_from(&commit.reason);
        card.version += 1;

        let updated = card.clone();
        state.events.push(commit.event);
        Ok(updated)
    }

    async fn commit_merge(&self, commit: MergeCommit) -> Result<(Card, Card), StoreError> {
        self.check_fail()?;
        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Validate both rows before touching either
        let parent_version = state
            .cards
            .get(&commit.parent_id)
            .ok_or(StoreError::CardNotFound(commit.parent_id))?
            .version;
        if parent_version != commit.parent_expected_version {
            return Err(StoreError::VersionConflict {
                card_id: commit.parent_id,
                expected: commit.parent_expected_version,
                actual: parent_version,
            });
        }
        let sub_version = state
            .cards
            .get(&commit.sub_card_id)
            .ok_or(StoreError::CardNotFound(commit.sub_card_id))?
            .version;
        if sub_version != commit.sub_expected_version {
            return Err(StoreError::VersionConflict {
                card_id: commit.sub_card_id,
                expected: commit.sub_expected_version,
                actual: sub_version,
            });
        }

        {
            let parent = state
                .cards
                .get_mut(&commit.parent_id)
                .ok_or(StoreError::CardNotFound(commit.parent_id))?;
            parent.final_value = Some(commit.new_parent_value);
            parent.version += 1;
        }
        {
            let sub = state
                .cards
                .get_mut(&commit.sub_card_id)
                .ok_or(StoreError::CardNotFound(commit.sub_card_id))?;
            if let Some(sub_state) = sub.sub_state_mut() {
                sub_state.status = SubCardStatus::Merged;
                sub_state.merge = Some(commit.record.clone());
            }
            sub.version += 1;
        }

        state.events.push(commit.event);
        let parent = state.cards[&commit.parent_id].clone();
        let sub = state.cards[&commit.sub_card_id].clone();
        Ok((parent, sub))
    }
}
