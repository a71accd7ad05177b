//! Quality gate evaluation
//!
//! Pure function over a card snapshot, a target stage, and the active
//! obligations scoped to that stage. No I/O: proposal and task
//! satisfaction data arrives inside the snapshot, built by the caller.

use crate::report::{GateReport, MissingField, MissingProposal, MissingTask};
use cardflow_domain::{CardSnapshot, ObligationRule, StageId, StageObligation};

/// Evaluate whether a card may enter `target_stage`
///
/// Obligations are consulted only when active and scoped to the target
/// stage. A manual completion recorded for an obligation satisfies it
/// regardless of its rule. The evaluation never mutates anything; a
/// non-valid report is an expected, user-correctable outcome.
#[must_use]
pub fn evaluate(
    snapshot: &CardSnapshot,
    target_stage: StageId,
    obligations: &[StageObligation],
) -> GateReport {
    let mut report = GateReport::clear();

    for obligation in obligations {
        if !obligation.active || obligation.stage_id != target_stage {
            continue;
        }
        if snapshot.is_completed(obligation.id) {
            continue;
        }

        match &obligation.rule {
            ObligationRule::Field { key, label } => {
                if snapshot.field_missing(key) {
                    report.missing_fields.push(MissingField {
                        key: key.clone(),
                        label: label.clone(),
                    });
                }
            }
            ObligationRule::Proposal { min_status } => {
                let satisfied = snapshot.proposals().iter().any(|s| s >= min_status);
                if !satisfied {
                    report.missing_proposals.push(MissingProposal {
                        min_status: *min_status,
                    });
                }
            }
            ObligationRule::Task { task_type, label } => {
                let satisfied = snapshot
                    .tasks()
                    .iter()
                    .any(|t| t.task_type == *task_type && t.completed);
                if !satisfied {
                    report.missing_tasks.push(MissingTask {
                        task_type: task_type.clone(),
                        label: label.clone(),
                    });
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardflow_domain::{
        Card, GateContext, ProposalStatus, StageObligation, TaskSnapshot, UserId,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot(card: &Card, obligations: &[StageObligation], ctx: GateContext) -> CardSnapshot {
        CardSnapshot::project(card, obligations, ctx)
    }

    #[test]
    fn empty_obligations_pass() {
        let card = Card::new("t", UserId::new());
        let stage = StageId::new();
        let report = evaluate(&snapshot(&card, &[], GateContext::empty()), stage, &[]);
        assert!(report.is_valid());
    }

    #[test]
    fn missing_field_blocks() {
        let card = Card::new("t", UserId::new());
        let stage = StageId::new();
        let obligations = vec![StageObligation::field(stage, "destination", "Destination")];

        let report = evaluate(
            &snapshot(&card, &obligations, GateContext::empty()),
            stage,
            &obligations,
        );
        assert!(!report.is_valid());
        assert_eq!(report.missing_fields[0].key, "destination");
    }

    #[test]
    fn field_satisfied_from_product_data() {
        let card = Card::new("t", UserId::new()).with_product_field("destination", json!("Lisbon"));
        let stage = StageId::new();
        let obligations = vec![StageObligation::field(stage, "destination", "Destination")];

        let report = evaluate(
            &snapshot(&card, &obligations, GateContext::empty()),
            stage,
            &obligations,
        );
        assert!(report.is_valid());
    }

    #[test]
    fn inactive_and_foreign_stage_obligations_are_ignored() {
        let card = Card::new("t", UserId::new());
        let stage = StageId::new();
        let other_stage = StageId::new();
        let obligations = vec![
            StageObligation::field(stage, "destination", "Destination").inactive(),
            StageObligation::field(other_stage, "budget", "Budget"),
        ];

        let report = evaluate(
            &snapshot(&card, &obligations, GateContext::empty()),
            stage,
            &obligations,
        );
        assert!(report.is_valid());
    }

    #[test]
    fn proposal_ladder_comparison() {
        let card = Card::new("t", UserId::new());
        let stage = StageId::new();
        let obligations = vec![StageObligation::proposal(stage, ProposalStatus::Sent)];

        // A draft proposal is not enough
        let ctx = GateContext::empty().with_proposal(ProposalStatus::Draft);
        let report = evaluate(&snapshot(&card, &obligations, ctx), stage, &obligations);
        assert_eq!(report.missing_proposals.len(), 1);

        // A viewed proposal exceeds the minimum
        let ctx = GateContext::empty().with_proposal(ProposalStatus::Viewed);
        let report = evaluate(&snapshot(&card, &obligations, ctx), stage, &obligations);
        assert!(report.is_valid());
    }

    #[test]
    fn task_must_match_type_and_be_completed() {
        let card = Card::new("t", UserId::new());
        let stage = StageId::new();
        let obligations = vec![StageObligation::task(stage, "briefing_call", "Briefing call")];

        let ctx = GateContext::empty().with_task(TaskSnapshot::new("briefing_call", false));
        let report = evaluate(&snapshot(&card, &obligations, ctx), stage, &obligations);
        assert_eq!(report.missing_tasks.len(), 1);

        let ctx = GateContext::empty().with_task(TaskSnapshot::new("briefing_call", true));
        let report = evaluate(&snapshot(&card, &obligations, ctx), stage, &obligations);
        assert!(report.is_valid());
    }

    #[test]
    fn manual_completion_short_circuits_rule() {
        let card = Card::new("t", UserId::new());
        let stage = StageId::new();
        let obligation = StageObligation::field(stage, "destination", "Destination");
        let ctx = GateContext::empty().with_completed(obligation.id);
        let obligations = vec![obligation];

        let report = evaluate(&snapshot(&card, &obligations, ctx), stage, &obligations);
        assert!(report.is_valid());
    }

    #[test]
    fn zero_and_false_count_as_present() {
        let card = Card::new("t", UserId::new())
            .with_product_field("budget", json!(0))
            .with_product_field("flexible_dates", json!(false));
        let stage = StageId::new();
        let obligations = vec![
            StageObligation::field(stage, "budget", "Budget"),
            StageObligation::field(stage, "flexible_dates", "Flexible dates"),
        ];

        let report = evaluate(
            &snapshot(&card, &obligations, GateContext::empty()),
            stage,
            &obligations,
        );
        assert!(report.is_valid());
    }
}
