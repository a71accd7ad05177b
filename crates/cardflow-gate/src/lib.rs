//! Cardflow quality gate
//!
//! Decides whether a card satisfies the configured obligations for a
//! target stage. Pure and side-effect free: the caller projects the card
//! into a [`cardflow_domain::CardSnapshot`] (including proposal/task
//! satisfaction data) and receives a structured [`GateReport`] back.
//!
//! # Example
//!
//! ```
//! use cardflow_domain::{Card, CardSnapshot, GateContext, StageObligation, UserId};
//!
//! let card = Card::new("Lisbon trip", UserId::new())
//!     .with_product_field("destination", serde_json::json!("Lisbon"));
//! let stage = cardflow_domain::StageId::new();
//! let obligations = vec![StageObligation::field(stage, "destination", "Destination")];
//!
//! let snapshot = CardSnapshot::project(&card, &obligations, GateContext::empty());
//! let report = cardflow_gate::evaluate(&snapshot, stage, &obligations);
//! assert!(report.is_valid());
//! ```

#![warn(unreachable_pub)]

pub mod evaluator;
pub mod report;

pub use evaluator::evaluate;
pub use report::{GateReport, MissingField, MissingProposal, MissingTask};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod property_tests {
    use super::*;
    use cardflow_domain::{is_missing, Card, CardSnapshot, GateContext, StageObligation, UserId};
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        #[test]
        fn non_empty_strings_are_present(s in "\\PC+") {
            prop_assert!(!is_missing(Some(&json!(s))));
        }

        #[test]
        fn numbers_are_always_present(n in any::<i64>()) {
            prop_assert!(!is_missing(Some(&json!(n))));
        }

        #[test]
        fn field_rule_matches_predicate(present in any::<bool>(), n in any::<i64>()) {
            let stage = cardflow_domain::StageId::new();
            let mut card = Card::new("t", UserId::new());
            if present {
                card = card.with_product_field("k", json!(n));
            }
            let obligations = vec![StageObligation::field(stage, "k", "K")];
            let snapshot = CardSnapshot::project(&card, &obligations, GateContext::empty());
            let report = evaluate(&snapshot, stage, &obligations);
            prop_assert_eq!(report.is_valid(), present);
        }
    }
}
