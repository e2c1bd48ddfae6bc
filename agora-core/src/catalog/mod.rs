// Catalog: the immutable registry of goods, wants, processes, and classes.
//
// Loaded and validated once per simulation; every other component refers to
// entries by id. Cyclic relationships (good <-> class <-> example good) are
// resolved through the id indexes here, never through ownership.

pub mod good;
pub mod load;
pub mod process;
pub mod want;

pub use good::{
    ClassMembership, DecayTarget, GainMode, Good, GoodTag, SatisfactionMap, WantSatisfaction,
};
pub use load::{CatalogDef, GoodDef, ProcessDef, WantDef};
pub use process::{InputMode, ItemRef, Process, ProcessInput, ProcessOutput};
pub use want::{EffectRef, Want};

use std::collections::BTreeMap;

use crate::desires::DesireTarget;
use crate::errors::CatalogError;
use crate::types::{ClassId, GoodId, ProcessId, Quantity, WantId};

/// Members of one class, with its single example good.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassEntry {
    pub example: GoodId,
    pub members: Vec<GoodId>,
}

#[derive(Debug)]
pub struct Catalog {
    goods: BTreeMap<GoodId, Good>,
    wants: BTreeMap<WantId, Want>,
    processes: BTreeMap<ProcessId, Process>,
    classes: BTreeMap<ClassId, ClassEntry>,
    time_good: GoodId,
}

impl Catalog {
    /// Build and validate a catalog. Any structural fault is fatal: the
    /// simulation must not start on a malformed registry.
    pub fn new(
        goods: Vec<Good>,
        wants: Vec<Want>,
        processes: Vec<Process>,
        time_good: GoodId,
    ) -> Result<Self, CatalogError> {
        let mut good_map = BTreeMap::new();
        for good in goods {
            if good_map.insert(good.id, good.clone()).is_some() {
                return Err(CatalogError::DuplicateGood(good.id));
            }
        }

        let mut want_map = BTreeMap::new();
        for want in wants {
            if want_map.insert(want.id, want.clone()).is_some() {
                return Err(CatalogError::DuplicateWant(want.id));
            }
        }

        let mut process_map = BTreeMap::new();
        for process in processes {
            if process_map.insert(process.id, process.clone()).is_some() {
                return Err(CatalogError::DuplicateProcess(process.id));
            }
        }

        let catalog = Self {
            classes: build_class_index(&good_map)?,
            goods: good_map,
            wants: want_map,
            processes: process_map,
            time_good,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for good in self.goods.values() {
            if let Some(decay) = good.decays_into {
                if !self.goods.contains_key(&decay.target) {
                    return Err(CatalogError::DanglingDecayTarget {
                        good: good.id,
                        target: decay.target,
                    });
                }
                if !(decay.ratio > 0.0 && decay.ratio <= 1.0) {
                    return Err(CatalogError::InvalidDecayRatio {
                        good: good.id,
                        ratio: decay.ratio,
                    });
                }
            }
            for (want, _) in good.satisfaction.wants.keys() {
                if !self.wants.contains_key(want) {
                    return Err(CatalogError::DanglingWantRef {
                        good: good.id,
                        want: *want,
                    });
                }
            }
        }

        for want in self.wants.values() {
            for (index, reference) in want.indirect.iter().enumerate() {
                let known = match reference {
                    EffectRef::Good(good) => self.goods.contains_key(good),
                    EffectRef::Class(class) => self.classes.contains_key(class),
                };
                if !known {
                    return Err(CatalogError::DanglingEffectRef {
                        want: want.id,
                        index,
                    });
                }
            }
        }

        for process in self.processes.values() {
            if !(process.time > 0.0) {
                return Err(CatalogError::NonPositiveTime {
                    process: process.id,
                    time: process.time,
                });
            }
            for (index, input) in process.inputs.iter().enumerate() {
                self.check_slot(process.id, index, input.item, input.quantity, true)?;
            }
            for (index, output) in process.outputs.iter().enumerate() {
                self.check_slot(process.id, index, output.item, output.quantity, false)?;
            }
        }

        match self.goods.get(&self.time_good) {
            None => {
                return Err(CatalogError::MissingTimeGood {
                    good: self.time_good,
                });
            }
            // Time can never be hoarded across turns.
            Some(time) if !time.is_transient() => {
                return Err(CatalogError::TimeGoodNotTransient { good: time.id });
            }
            Some(_) => {}
        }

        Ok(())
    }

    fn check_slot(
        &self,
        process: ProcessId,
        index: usize,
        item: ItemRef,
        quantity: f64,
        is_input: bool,
    ) -> Result<(), CatalogError> {
        let known = match item {
            ItemRef::Good(good) => self.goods.contains_key(&good),
            ItemRef::Want(want) => self.wants.contains_key(&want),
        };
        if !known {
            return Err(if is_input {
                CatalogError::DanglingProcessInput { process, index }
            } else {
                CatalogError::DanglingProcessOutput { process, index }
            });
        }
        if !(quantity > 0.0) {
            return Err(CatalogError::NonPositiveQuantity {
                process,
                index,
                quantity,
            });
        }
        // Goods are atomic trade units; recipes may not reference fractions.
        if matches!(item, ItemRef::Good(_)) && quantity.fract() != 0.0 {
            return Err(CatalogError::FractionalQuantity {
                process,
                index,
                quantity,
            });
        }
        Ok(())
    }

    // === ACCESSORS ===

    pub fn good(&self, id: GoodId) -> Option<&Good> {
        self.goods.get(&id)
    }

    pub fn want(&self, id: WantId) -> Option<&Want> {
        self.wants.get(&id)
    }

    pub fn process(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(&id)
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassEntry> {
        self.classes.get(&id)
    }

    pub fn goods(&self) -> impl Iterator<Item = &Good> {
        self.goods.values()
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    pub fn time_good(&self) -> GoodId {
        self.time_good
    }

    // === MATCHING ===

    /// Whether a good can serve a ranked desire target. Wealth never matches
    /// here: it is satisfied from inventory valuation, outside the ranked
    /// demand pass.
    pub fn good_matches_target(&self, good: GoodId, target: DesireTarget) -> bool {
        self.marginal_gain(good, target).is_some()
    }

    /// Satisfaction rate and time cost a buyer realizes when acquiring one
    /// unit of `good` for `target`. Class and specific matches trade at full
    /// rate with no time charge; want matches use the good's best entry.
    pub fn marginal_gain(&self, good: GoodId, target: DesireTarget) -> Option<(f64, Quantity)> {
        let good = self.goods.get(&good)?;
        match target {
            DesireTarget::Want(want) => {
                let (_, sat) = good.best_gain(want)?;
                Some((sat.efficiency, good.gain_time_cost(sat)))
            }
            DesireTarget::Class(class) => match &good.satisfaction.class {
                Some(membership) if membership.class == class => Some((1.0, 0)),
                _ => None,
            },
            DesireTarget::Specific(specific) => {
                if good.satisfaction.specific == Some(specific) {
                    Some((1.0, 0))
                } else {
                    None
                }
            }
            DesireTarget::Wealth => None,
        }
    }

    /// Goods able to cover a want through consumption, ascending by id.
    pub fn consumption_sources(&self, want: WantId) -> Vec<(GoodId, f64)> {
        self.goods
            .values()
            .filter_map(|good| {
                good.satisfaction
                    .wants
                    .get(&(want, GainMode::Consumption))
                    .map(|sat| (good.id, sat.efficiency))
            })
            .filter(|(_, efficiency)| *efficiency > 0.0)
            .collect()
    }
}

fn build_class_index(
    goods: &BTreeMap<GoodId, Good>,
) -> Result<BTreeMap<ClassId, ClassEntry>, CatalogError> {
    let mut examples: BTreeMap<ClassId, GoodId> = BTreeMap::new();
    let mut members: BTreeMap<ClassId, Vec<GoodId>> = BTreeMap::new();

    for good in goods.values() {
        let Some(membership) = &good.satisfaction.class else {
            continue;
        };
        members.entry(membership.class).or_default().push(good.id);
        if membership.is_example {
            if membership.variant.is_some() {
                return Err(CatalogError::ExampleWithVariant { good: good.id });
            }
            if examples.insert(membership.class, good.id).is_some() {
                return Err(CatalogError::DuplicateClassExample {
                    class: membership.class,
                });
            }
        } else if membership.variant.is_none() {
            return Err(CatalogError::MissingVariant {
                good: good.id,
                class: membership.class,
            });
        }
    }

    let mut classes = BTreeMap::new();
    for (class, members) in members {
        let Some(example) = examples.get(&class) else {
            return Err(CatalogError::MissingClassExample { class });
        };
        classes.insert(
            class,
            ClassEntry {
                example: *example,
                members,
            },
        );
    }
    Ok(classes)
}
