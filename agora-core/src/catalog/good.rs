// Good definitions: decay, satisfaction claims, tags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ClassId, GoodId, Quantity, SpecificId, WantId};

// === TAGS ===

/// Behavior flags carried by a good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoodTag {
    /// Not storable across turns and never offered from stock.
    Service,
    /// Purged from every inventory at end of turn.
    EndOfDayConsumed,
    /// Never decays, regardless of decay rate.
    NoDecay,
    /// Satisfaction through this good charges no time cost.
    NoTimeCost,
}

// === SATISFACTION ===

/// How a want is gained from a good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GainMode {
    Consumption,
    Use,
    Own,
}

/// One entry of a good's want-satisfaction table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WantSatisfaction {
    /// Want units gained per good unit.
    pub efficiency: f64,
    /// Time-good units charged per unit gained. Always zero for Own.
    pub time_cost: Quantity,
}

/// Membership of a good in a class.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassMembership {
    pub class: ClassId,
    pub is_example: bool,
    /// None for the class example, mandatory for every other member.
    pub variant: Option<String>,
}

/// What a decayed unit leaves behind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayTarget {
    pub target: GoodId,
    /// Surviving fraction, floor-rounded at conversion. In (0, 1].
    pub ratio: f64,
}

/// Everything a good claims to satisfy. A single good may satisfy wealth,
/// several wants, a class, and a specific desire at the same time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SatisfactionMap {
    /// Whether the good counts toward AMV-weighted wealth.
    pub wealth: bool,
    pub wants: BTreeMap<(WantId, GainMode), WantSatisfaction>,
    pub class: Option<ClassMembership>,
    pub specific: Option<SpecificId>,
}

// === GOOD ===

#[derive(Clone, Debug, PartialEq)]
pub struct Good {
    pub id: GoodId,
    pub name: String,
    /// Turns until an unused unit decays. 0 = never decays.
    pub decay_turns: u32,
    pub decays_into: Option<DecayTarget>,
    pub satisfaction: SatisfactionMap,
    pub tags: Vec<GoodTag>,
    pub bulk: f64,
    pub mass: f64,
}

impl Good {
    pub fn new(id: GoodId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            decay_turns: 0,
            decays_into: None,
            satisfaction: SatisfactionMap::default(),
            tags: Vec::new(),
            bulk: 1.0,
            mass: 1.0,
        }
    }

    pub fn with_decay(mut self, turns: u32) -> Self {
        self.decay_turns = turns;
        self
    }

    pub fn with_decay_into(mut self, turns: u32, target: GoodId, ratio: f64) -> Self {
        self.decay_turns = turns;
        self.decays_into = Some(DecayTarget { target, ratio });
        self
    }

    pub fn with_wealth(mut self) -> Self {
        self.satisfaction.wealth = true;
        self
    }

    pub fn with_want(
        mut self,
        want: WantId,
        mode: GainMode,
        efficiency: f64,
        time_cost: Quantity,
    ) -> Self {
        let time_cost = if mode == GainMode::Own { 0 } else { time_cost };
        self.satisfaction.wants.insert(
            (want, mode),
            WantSatisfaction {
                efficiency,
                time_cost,
            },
        );
        self
    }

    pub fn with_class_example(mut self, class: ClassId) -> Self {
        self.satisfaction.class = Some(ClassMembership {
            class,
            is_example: true,
            variant: None,
        });
        self
    }

    pub fn with_class_variant(mut self, class: ClassId, variant: impl Into<String>) -> Self {
        self.satisfaction.class = Some(ClassMembership {
            class,
            is_example: false,
            variant: Some(variant.into()),
        });
        self
    }

    pub fn with_specific(mut self, specific: SpecificId) -> Self {
        self.satisfaction.specific = Some(specific);
        self
    }

    pub fn with_tag(mut self, tag: GoodTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn with_bulk_mass(mut self, bulk: f64, mass: f64) -> Self {
        self.bulk = bulk;
        self.mass = mass;
        self
    }

    pub fn has_tag(&self, tag: GoodTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Whether decay applies to this good at all.
    pub fn decays(&self) -> bool {
        self.decay_turns > 0 && !self.has_tag(GoodTag::NoDecay) && !self.has_tag(GoodTag::Service)
    }

    /// Whether units vanish from inventories at end of turn.
    pub fn is_transient(&self) -> bool {
        self.has_tag(GoodTag::EndOfDayConsumed) || self.has_tag(GoodTag::Service)
    }

    /// Derived quality: the sum of all satisfaction magnitudes. Wealth,
    /// class membership, and a specific claim each count 1, want entries
    /// count their efficiency. Always recomputed from the satisfaction map,
    /// never stored.
    pub fn quality(&self) -> f64 {
        let mut q = 0.0;
        if self.satisfaction.wealth {
            q += 1.0;
        }
        q += self
            .satisfaction
            .wants
            .values()
            .map(|s| s.efficiency)
            .sum::<f64>();
        if self.satisfaction.class.is_some() {
            q += 1.0;
        }
        if self.satisfaction.specific.is_some() {
            q += 1.0;
        }
        q
    }

    /// Best want-satisfaction entry for a want, preferring higher efficiency
    /// and breaking ties by gain mode order (Consumption, Use, Own).
    pub fn best_gain(&self, want: WantId) -> Option<(GainMode, WantSatisfaction)> {
        let mut best: Option<(GainMode, WantSatisfaction)> = None;
        for ((w, mode), sat) in &self.satisfaction.wants {
            if *w != want {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_mode, best_sat)) => {
                    sat.efficiency > best_sat.efficiency
                        || (sat.efficiency == best_sat.efficiency && *mode < best_mode)
                }
            };
            if better {
                best = Some((*mode, *sat));
            }
        }
        best
    }

    /// Time cost charged when gaining a want through this good, honoring the
    /// NoTimeCost tag.
    pub fn gain_time_cost(&self, sat: WantSatisfaction) -> Quantity {
        if self.has_tag(GoodTag::NoTimeCost) {
            0
        } else {
            sat.time_cost
        }
    }
}
