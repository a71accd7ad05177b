//! Merge reconciliation of a sub-card into its parent
//!
//! Merging is terminal and one-way: the sub-card value is folded into
//! the parent's final value (added for incremental, replacing for
//! complete), the merge record is written onto the sub-card, and the
//! audit event lands on the parent, all in one store unit version-checked
//! on both rows. Re-merging an already-merged sub-card returns the stored
//! record unchanged.

use crate::error::{FlowError, MergeDecline};
use crate::store::{MergeCommit, PipelineStore};
use cardflow_domain::{
    CardId, DomainEvent, EventKind, MergeRecord, SubCardMode, SubCardStatus, UserId,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Result of a merge request
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    /// Merge committed now
    Merged(MergeRecord),
    /// Already merged; the stored record, unchanged
    AlreadyMerged(MergeRecord),
    /// Merge refused; nothing was written
    Declined(MergeDecline),
}

/// Reconciles sub-card values into their parents
#[derive(Debug, Clone)]
pub struct MergeEngine {
    store: Arc<dyn PipelineStore>,
}

impl MergeEngine {
    /// New engine over a store
    #[must_use]
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }

    /// Merge a sub-card into its parent
    ///
    /// Idempotent: merging twice returns the same record and changes the
    /// parent value exactly once.
    pub async fn merge(&self, sub_id: CardId, actor: UserId) -> Result<MergeOutcome, FlowError> {
        let sub = self.store.load_card(sub_id).await?;
        let state = sub.sub_state().ok_or(FlowError::NotASubCard(sub_id))?;

        match state.status {
            SubCardStatus::Merged => {
                let record = state
                    .merge
                    .clone()
                    .ok_or(FlowError::MergeRecordMissing(sub_id))?;
                return Ok(MergeOutcome::AlreadyMerged(record));
            }
            SubCardStatus::Cancelled => {
                return Ok(MergeOutcome::Declined(MergeDecline::Cancelled));
            }
            SubCardStatus::Active => {}
        }

        let parent = self.store.load_card(state.parent).await?;
        let old_parent_value = parent.current_value();
        let sub_card_value = sub.current_value();
        let new_parent_value = match state.mode {
            SubCardMode::Incremental => old_parent_value + sub_card_value,
            SubCardMode::Complete => sub_card_value,
        };
        let record = MergeRecord {
            old_parent_value,
            sub_card_value,
            new_parent_value,
            mode: state.mode,
            merged_at: Utc::now(),
        };

        let event = DomainEvent::new(
            EventKind::SubCardMerged,
            format!("change request \"{}\" merged", sub.title),
            parent.id,
            actor,
        )
        .with_metadata(json!({
            "sub_card_id": sub.id.to_string(),
            "mode": state.mode,
            "old_parent_value": old_parent_value,
            "sub_card_value": sub_card_value,
            "new_parent_value": new_parent_value,
        }));

        let (parent, _sub) = self
            .store
            .commit_merge(MergeCommit {
                parent_id: parent.id,
                parent_expected_version: parent.version,
                sub_card_id: sub.id,
                sub_expected_version: sub.version,
                new_parent_value,
                record: record.clone(),
                event,
            })
            .await?;
        tracing::info!(
            parent_id = %parent.id,
            sub_card_id = %sub.id,
            %new_parent_value,
            "sub-card merged"
        );
        Ok(MergeOutcome::Merged(record))
    }
}
