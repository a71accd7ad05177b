//! Card snapshot consumed by the quality gate
//!
//! The snapshot is a typed projection built from the same obligation
//! configuration that defines the stage rules: every field key a rule can
//! reference is resolved once, top-level card fields first, then the
//! product-data blob. Proposal statuses, task records, and manual
//! completions are supplied by the caller so the gate itself stays pure.

use crate::card::Card;
use crate::ids::ObligationId;
use crate::obligation::{ObligationRule, ProposalStatus, StageObligation};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Emptiness predicate for obligation field checks
///
/// Missing: absent, JSON null, `""`, `[]`, `{}`. Everything else is
/// present, including `0` and `false`.
#[must_use]
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// Task as seen by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Task type key
    pub task_type: String,
    /// Whether the task has been completed
    pub completed: bool,
}

impl TaskSnapshot {
    /// New task snapshot
    #[inline]
    #[must_use]
    pub fn new(task_type: impl Into<String>, completed: bool) -> Self {
        Self {
            task_type: task_type.into(),
            completed,
        }
    }
}

/// Caller-supplied satisfaction data the gate cannot derive from the card
#[derive(Debug, Clone, Default)]
pub struct GateContext {
    /// Statuses of all proposals on the card
    pub proposals: Vec<ProposalStatus>,
    /// Tasks on the card
    pub tasks: Vec<TaskSnapshot>,
    /// Obligations manually checked off for this card
    pub completed_obligations: HashSet<ObligationId>,
}

impl GateContext {
    /// Empty context (no proposals, tasks, or completions)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// With a proposal status
    #[inline]
    #[must_use]
    pub fn with_proposal(mut self, status: ProposalStatus) -> Self {
        self.proposals.push(status);
        self
    }

    /// With a task
    #[inline]
    #[must_use]
    pub fn with_task(mut self, task: TaskSnapshot) -> Self {
        self.tasks.push(task);
        self
    }

    /// With a manual completion
    #[inline]
    #[must_use]
    pub fn with_completed(mut self, obligation_id: ObligationId) -> Self {
        self.completed_obligations.insert(obligation_id);
        self
    }
}

/// Read-only projection of a card for gate evaluation
#[derive(Debug, Clone, Default)]
pub struct CardSnapshot {
    fields: BTreeMap<String, Value>,
    proposals: Vec<ProposalStatus>,
    tasks: Vec<TaskSnapshot>,
    completed_obligations: HashSet<ObligationId>,
}

impl CardSnapshot {
    /// Project a card against the field keys the given obligations reference
    ///
    /// For each field rule, the top-level card field is consulted first;
    /// when missing there, the product-data blob. Either location
    /// satisfies the rule.
    #[must_use]
    pub fn project(card: &Card, obligations: &[StageObligation], ctx: GateContext) -> Self {
        let mut fields = BTreeMap::new();
        for obligation in obligations {
            if let ObligationRule::Field { key, .. } = &obligation.rule {
                if let Some(value) = resolve_field(card, key) {
                    fields.insert(key.clone(), value);
                }
            }
        }
        Self {
            fields,
            proposals: ctx.proposals,
            tasks: ctx.tasks,
            completed_obligations: ctx.completed_obligations,
        }
    }

    /// Resolved value for a field key, if any location held one
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether a field key is missing under the emptiness predicate
    #[inline]
    #[must_use]
    pub fn field_missing(&self, key: &str) -> bool {
        is_missing(self.field(key))
    }

    /// Proposal statuses on the card
    #[inline]
    #[must_use]
    pub fn proposals(&self) -> &[ProposalStatus] {
        &self.proposals
    }

    /// Tasks on the card
    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &[TaskSnapshot] {
        &self.tasks
    }

    /// Whether an obligation was manually checked off
    #[inline]
    #[must_use]
    pub fn is_completed(&self, obligation_id: ObligationId) -> bool {
        self.completed_obligations.contains(&obligation_id)
    }
}

/// Resolve a field key: top-level card first, then product data
fn resolve_field(card: &Card, key: &str) -> Option<Value> {
    let top = top_level_value(card, key);
    if !is_missing(top.as_ref()) {
        return top;
    }
    let nested = card.product_data.get(key).cloned();
    if !is_missing(nested.as_ref()) {
        return nested;
    }
    // Preserve an explicitly-set-but-empty value for diagnostics
    top.or(nested)
}

/// Top-level scalar fields obligation rules may reference
fn top_level_value(card: &Card, key: &str) -> Option<Value> {
    match key {
        "title" => Some(Value::String(card.title.clone())),
        "estimated_value" => serde_json::to_value(card.estimated_value).ok(),
        "final_value" => card
            .final_value
            .and_then(|v| serde_json::to_value(v).ok()),
        "owner_id" => Some(Value::String(card.owner_id.to_string())),
        "sdr_owner_id" => card
            .sdr_owner_id
            .map(|id| Value::String(id.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn predicate_classifies_empty_shapes_as_missing() {
        assert!(is_missing(None));
        assert!(is_missing(Some(&Value::Null)));
        assert!(is_missing(Some(&json!(""))));
        assert!(is_missing(Some(&json!([]))));
        assert!(is_missing(Some(&json!({}))));
    }

    #[test]
    fn predicate_classifies_falsy_scalars_as_present() {
        assert!(!is_missing(Some(&json!(0))));
        assert!(!is_missing(Some(&json!(false))));
        assert!(!is_missing(Some(&json!("x"))));
        assert!(!is_missing(Some(&json!([1]))));
    }

    #[test]
    fn projection_prefers_top_level_then_product_data() {
        let card = Card::new("Lisbon trip", UserId::new())
            .with_product_field("destination", json!("Lisbon"))
            .with_product_field("title", json!("shadowed"));

        let stage = crate::ids::StageId::new();
        let obligations = vec![
            StageObligation::field(stage, "title", "Title"),
            StageObligation::field(stage, "destination", "Destination"),
            StageObligation::field(stage, "travelers", "Travelers"),
        ];

        let snapshot = CardSnapshot::project(&card, &obligations, GateContext::empty());
        // Top-level title wins over the product-data entry of the same key
        assert_eq!(snapshot.field("title"), Some(&json!("Lisbon trip")));
        assert_eq!(snapshot.field("destination"), Some(&json!("Lisbon")));
        assert!(snapshot.field_missing("travelers"));
    }

    #[test]
    fn empty_product_value_stays_missing() {
        let card = Card::new("t", UserId::new()).with_product_field("notes", json!([]));
        let stage = crate::ids::StageId::new();
        let obligations = vec![StageObligation::field(stage, "notes", "Notes")];

        let snapshot = CardSnapshot::project(&card, &obligations, GateContext::empty());
        assert!(snapshot.field_missing("notes"));
    }

    #[test]
    fn context_flows_into_snapshot() {
        let card = Card::new("t", UserId::new());
        let obligation_id = ObligationId::new();
        let ctx = GateContext::empty()
            .with_proposal(ProposalStatus::Sent)
            .with_task(TaskSnapshot::new("briefing_call", true))
            .with_completed(obligation_id);

        let snapshot = CardSnapshot::project(&card, &[], ctx);
        assert_eq!(snapshot.proposals(), &[ProposalStatus::Sent]);
        assert_eq!(snapshot.tasks().len(), 1);
        assert!(snapshot.is_completed(obligation_id));
    }
}
