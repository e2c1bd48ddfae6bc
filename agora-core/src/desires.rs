// Desire ledgers: what a pop wants, how urgently, and for how long.
//
// Each turn the ledger produces a ranked demand list. Lower effective
// weight means more fundamental, so the list is ascending: subsistence
// desires outrank luxuries. Desires with identical effective weight form a
// tie-group whose internal order is re-drawn every refresh from a seeded
// generator, so no agent is permanently favored by insertion order.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use serde::{Deserialize, Serialize};

use crate::errors::DesireConfigError;
use crate::types::{ClassId, KeyToU64, PopId, SpecificId, Turn, WantId};

// === TARGETS ===

/// What a desire points at. Goods advertise which targets they satisfy
/// through their satisfaction map; the market clearer joins the two sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesireTarget {
    Want(WantId),
    Class(ClassId),
    Specific(SpecificId),
    /// Satisfied by AMV-weighted inventory value, never by the ranked pass.
    Wealth,
}

// === SPECS AND PROFILES ===

/// One desire as configured, before it is installed in a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesireSpec {
    pub target: DesireTarget,
    pub weight: f64,
    /// Per-turn weight delta, signed.
    pub step: f64,
    /// `None` = infinite; `Some(n)` = retires after n fulfillments.
    pub remaining: Option<u32>,
}

/// Ordered list of desire specs handed to `World::add_pop`. Plays the role
/// the pop's species/culture configuration would in a richer setup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DesireProfile {
    specs: Vec<DesireSpec>,
}

impl DesireProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Infinite want desire with zero step.
    pub fn with_want(self, want: WantId, weight: f64) -> Self {
        self.with_desire(DesireTarget::Want(want), weight, 0.0, None)
    }

    pub fn with_class(self, class: ClassId, weight: f64) -> Self {
        self.with_desire(DesireTarget::Class(class), weight, 0.0, None)
    }

    pub fn with_specific(self, specific: SpecificId, weight: f64) -> Self {
        self.with_desire(DesireTarget::Specific(specific), weight, 0.0, None)
    }

    /// Override the implicit wealth desire's weight.
    pub fn with_wealth_weight(self, weight: f64) -> Self {
        self.with_desire(DesireTarget::Wealth, weight, 0.0, None)
    }

    pub fn with_desire(
        mut self,
        target: DesireTarget,
        weight: f64,
        step: f64,
        remaining: Option<u32>,
    ) -> Self {
        self.specs.push(DesireSpec {
            target,
            weight,
            step,
            remaining,
        });
        self
    }

    pub fn specs(&self) -> &[DesireSpec] {
        &self.specs
    }
}

// === LEDGER ===

/// A desire as it lives in a pop's ledger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesireState {
    pub target: DesireTarget,
    pub starting_weight: f64,
    pub step: f64,
    pub remaining: Option<u32>,
    pub created_turn: Turn,
}

impl DesireState {
    /// Weight after stepping, before the ledger floor is applied.
    pub fn effective_weight(&self, turn: Turn) -> f64 {
        let elapsed = turn.saturating_sub(self.created_turn);
        self.starting_weight + self.step * elapsed as f64
    }
}

/// One entry of a refreshed demand list. `desire` indexes into the ledger
/// and stays valid until the next refresh, which is the only operation that
/// removes entries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemandEntry {
    pub desire: usize,
    pub target: DesireTarget,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesireLedger {
    desires: Vec<DesireState>,
    /// Effective weights clamp here. `None` lets stepping cross zero.
    weight_floor: Option<f64>,
}

impl DesireLedger {
    /// Validate a profile and install it. The implicit wealth desire is
    /// appended if the profile does not configure one.
    pub fn from_profile(profile: &DesireProfile, turn: Turn) -> Result<Self, DesireConfigError> {
        let mut desires = Vec::with_capacity(profile.specs().len() + 1);
        for spec in profile.specs() {
            if !spec.weight.is_finite() {
                return Err(DesireConfigError::NonFiniteWeight { value: spec.weight });
            }
            if !spec.step.is_finite() {
                return Err(DesireConfigError::NonFiniteStep { value: spec.step });
            }
            if spec.remaining == Some(0) {
                return Err(DesireConfigError::EmptyFinite);
            }
            desires.push(DesireState {
                target: spec.target,
                starting_weight: spec.weight,
                step: spec.step,
                remaining: spec.remaining,
                created_turn: turn,
            });
        }
        if !desires
            .iter()
            .any(|d| d.target == DesireTarget::Wealth)
        {
            desires.push(DesireState {
                target: DesireTarget::Wealth,
                starting_weight: 1.0,
                step: 0.0,
                remaining: None,
                created_turn: turn,
            });
        }
        Ok(Self {
            desires,
            weight_floor: Some(0.0),
        })
    }

    pub fn with_weight_floor(mut self, floor: Option<f64>) -> Self {
        self.weight_floor = floor;
        self
    }

    /// Drop exhausted finite desires, then produce the ranked demand list
    /// for this turn. Ascending by clamped effective weight; tie-groups are
    /// shuffled with `seed` (see [`refresh_seed`]). Wealth never appears in
    /// the ranked list.
    pub fn refresh(&mut self, turn: Turn, seed: u64) -> Vec<DemandEntry> {
        self.desires.retain(|d| d.remaining != Some(0));

        let floor = self.weight_floor;
        let mut entries: Vec<DemandEntry> = self
            .desires
            .iter()
            .enumerate()
            .filter(|(_, d)| d.target != DesireTarget::Wealth)
            .map(|(i, d)| {
                let mut weight = d.effective_weight(turn);
                if let Some(floor) = floor {
                    weight = weight.max(floor);
                }
                DemandEntry {
                    desire: i,
                    target: d.target,
                    weight,
                }
            })
            .collect();

        entries.sort_by(|a, b| a.weight.total_cmp(&b.weight));

        let mut rng = StdRng::seed_from_u64(seed);
        let mut start = 0;
        while start < entries.len() {
            let mut end = start + 1;
            while end < entries.len() && entries[end].weight == entries[start].weight {
                end += 1;
            }
            if end - start > 1 {
                entries[start..end].shuffle(&mut rng);
            }
            start = end;
        }
        entries
    }

    /// Count one successful match against a desire. Finite counters clamp
    /// at zero; removal happens at the next refresh.
    pub fn record_fulfillment(&mut self, index: usize) {
        if let Some(desire) = self.desires.get_mut(index) {
            if let Some(remaining) = desire.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
            }
        }
    }

    pub fn wealth_weight(&self) -> f64 {
        self.desires
            .iter()
            .find(|d| d.target == DesireTarget::Wealth)
            .map(|d| d.starting_weight)
            .unwrap_or(1.0)
    }

    pub fn desires(&self) -> &[DesireState] {
        &self.desires
    }

    pub fn len(&self) -> usize {
        self.desires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desires.is_empty()
    }
}

/// Seed for one pop's refresh in one turn. Mixing the turn with the pop key
/// keeps permutations independent across both axes while staying fully
/// reproducible.
pub fn refresh_seed(turn: Turn, pop: PopId) -> u64 {
    turn.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ pop.to_u64().rotate_left(17)
}
