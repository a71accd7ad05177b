//! Testing utilities for the Cardflow workspace
//!
//! Shared fixtures: a small stage catalog with named handles, card
//! builders, and obligation shorthands.

#![allow(missing_docs)]

use cardflow_domain::{
    Card, CardId, CardKind, CommercialStatus, Phase, Stage, StageCatalog, StageId, SubCardMode,
    SubCardState, UserId,
};
use rust_decimal_macros::dec;

/// A seeded catalog with named stage handles for assertions
#[derive(Debug, Clone)]
pub struct CatalogFixture {
    pub catalog: StageCatalog,
    pub new_lead: StageId,
    pub qualified: StageId,
    pub planning: StageId,
    pub proposal_sent: StageId,
    pub won: StageId,
    pub lost: StageId,
}

/// Standard five-stage funnel plus a losing stage
pub fn sample_catalog() -> CatalogFixture {
    let new_lead = Stage::new("New lead", Phase::Sdr, 0);
    let qualified = Stage::new("Qualified", Phase::Sdr, 1);
    let planning = Stage::new("Planning", Phase::Planner, 2);
    let proposal_sent = Stage::new("Proposal sent", Phase::Planner, 3);
    let won = Stage::new("Won", Phase::PostSale, 4).winning();
    let lost = Stage::new("Lost", Phase::Other, 5).losing();

    CatalogFixture {
        new_lead: new_lead.id,
        qualified: qualified.id,
        planning: planning.id,
        proposal_sent: proposal_sent.id,
        won: won.id,
        lost: lost.id,
        catalog: StageCatalog::new(vec![
            new_lead,
            qualified,
            planning,
            proposal_sent,
            won,
            lost,
        ]),
    }
}

/// A fresh SDR card worth 1000
pub fn sample_card(owner: UserId) -> Card {
    Card::new("Lisbon trip", owner).with_estimated_value(dec!(1000))
}

/// A won post-sale card worth 1000, branch-eligible
pub fn won_post_sale_card(owner: UserId) -> Card {
    let mut card = sample_card(owner);
    card.phase = Phase::PostSale;
    card.commercial_status = CommercialStatus::Won;
    card
}

/// An active sub-card of `parent` in the given mode
pub fn sub_card_of(parent: &Card, mode: SubCardMode) -> Card {
    let mut card = Card::new("Change request", parent.owner_id);
    card.kind = CardKind::Sub(SubCardState::new(parent.id, mode));
    card
}

/// A won sub-card carrying a value, ready to merge
pub fn mergeable_sub_card(parent: &Card, mode: SubCardMode, value: rust_decimal::Decimal) -> Card {
    let mut card = sub_card_of(parent, mode).with_estimated_value(value);
    card.commercial_status = CommercialStatus::Won;
    card
}

/// A parent id that exists nowhere
pub fn missing_card_id() -> CardId {
    CardId::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_fixture_is_ordered_and_flagged() {
        let fixture = sample_catalog();
        assert_eq!(fixture.catalog.stages().len(), 6);
        let won = fixture.catalog.get(fixture.won).unwrap();
        assert!(won.is_won);
        let lost = fixture.catalog.get(fixture.lost).unwrap();
        assert!(lost.is_lost);
    }

    #[test]
    fn sub_card_fixture_links_parent() {
        let parent = won_post_sale_card(UserId::new());
        let sub = mergeable_sub_card(&parent, SubCardMode::Incremental, dec!(250));
        assert_eq!(sub.sub_state().unwrap().parent, parent.id);
        assert!(sub.commercial_status.is_won());
    }
}
