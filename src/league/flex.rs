//! Substitution ("flex") rule engine.
//!
//! Each team may substitute at most one of its two slots per match. The rule
//! guards the edit session only: stored documents are never constrained by
//! it, so the checks here are pure functions over a match and a proposed
//! lineup, usable by any caller (report dialog, bulk import, tests).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::league::model::{MatchFact, PlayerId};

/// One of the four player slots of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    A1,
    A2,
    B1,
    B2,
}

impl Slot {
    pub fn side(self) -> Side {
        match self {
            Slot::A1 | Slot::A2 => Side::A,
            Slot::B1 | Slot::B2 => Side::B,
        }
    }

    fn sibling(self) -> Slot {
        match self {
            Slot::A1 => Slot::A2,
            Slot::A2 => Slot::A1,
            Slot::B1 => Slot::B2,
            Slot::B2 => Slot::B1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Side::A => write!(f, "team A"),
            Side::B => write!(f, "team B"),
        }
    }
}

/// The four in-progress slot values of an edit session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedLineup {
    pub p_a1: PlayerId,
    pub p_a2: PlayerId,
    pub p_b1: PlayerId,
    pub p_b2: PlayerId,
}

impl ProposedLineup {
    /// Starts an edit session from the match's current assignment.
    pub fn current(m: &MatchFact) -> Self {
        Self {
            p_a1: m.p_a1.clone(),
            p_a2: m.p_a2.clone(),
            p_b1: m.p_b1.clone(),
            p_b2: m.p_b2.clone(),
        }
    }

    fn slot(&self, slot: Slot) -> &PlayerId {
        match slot {
            Slot::A1 => &self.p_a1,
            Slot::A2 => &self.p_a2,
            Slot::B1 => &self.p_b1,
            Slot::B2 => &self.p_b2,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut PlayerId {
        match slot {
            Slot::A1 => &mut self.p_a1,
            Slot::A2 => &mut self.p_a2,
            Slot::B1 => &mut self.p_b1,
            Slot::B2 => &mut self.p_b2,
        }
    }
}

pub type FlexResult<T> = core::result::Result<T, FlexViolation>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlexViolation {
    #[error("{0} has already substituted a player for this match")]
    SecondSubstitution(Side),
}

fn original_slot(m: &MatchFact, slot: Slot) -> &PlayerId {
    match slot {
        Slot::A1 => &m.original_p_a1,
        Slot::A2 => &m.original_p_a2,
        Slot::B1 => &m.original_p_b1,
        Slot::B2 => &m.original_p_b2,
    }
}

const ALL_SLOTS: [Slot; 4] = [Slot::A1, Slot::A2, Slot::B1, Slot::B2];

/// The slots whose proposed value differs from the original schedule.
pub fn changed_slots(m: &MatchFact, proposed: &ProposedLineup) -> Vec<Slot> {
    ALL_SLOTS
        .into_iter()
        .filter(|&slot| proposed.slot(slot) != original_slot(m, slot))
        .collect()
}

/// The slots frozen for the rest of the edit session: once a slot differs
/// from original, its sibling on the same side is locked unless that sibling
/// has itself already changed.
pub fn locked_slots(m: &MatchFact, proposed: &ProposedLineup) -> Vec<Slot> {
    let changed = changed_slots(m, proposed);

    ALL_SLOTS
        .into_iter()
        .filter(|&slot| !changed.contains(&slot) && changed.contains(&slot.sibling()))
        .collect()
}

/// Pure one-substitution-per-side check. `Ok` when each side has at most one
/// slot differing from its original pair.
pub fn validate_substitution(m: &MatchFact, proposed: &ProposedLineup) -> FlexResult<()> {
    for side in [Side::A, Side::B] {
        let diffs = changed_slots(m, proposed)
            .into_iter()
            .filter(|slot| slot.side() == side)
            .count();

        if diffs > 1 {
            return Err(FlexViolation::SecondSubstitution(side));
        }
    }

    Ok(())
}

/// Restores both of a side's slots to the original schedule, unlocking the
/// side for a fresh substitution.
pub fn reset_side(m: &MatchFact, proposed: &ProposedLineup, side: Side) -> ProposedLineup {
    let mut next = proposed.clone();

    for slot in ALL_SLOTS {
        if slot.side() == side {
            *next.slot_mut(slot) = original_slot(m, slot).clone();
        }
    }

    next
}
