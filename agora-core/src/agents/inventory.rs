// Lot-based inventory: integer quantities with a per-lot decay clock.
//
// Exclusively owned by one pop, firm, or locality pool. Mutations happen
// only through the scheduler (own firm), the market clearer (transfers),
// decay, and external injections; the phase order of the turn guarantees
// no interleaving.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::InventoryError;
use crate::types::{GoodId, Price, Quantity};

/// A batch of units acquired at the same freshness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub quantity: Quantity,
    /// Decay steps survived so far.
    pub age: u32,
}

/// Units destroyed or converted by one decay pass, per good.
#[derive(Clone, Debug, PartialEq)]
pub struct DecayEvent {
    pub good: GoodId,
    pub lost: Quantity,
    pub converted: Option<(GoodId, Quantity)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Lots kept youngest-first; at most one lot per age value.
    lots: BTreeMap<GoodId, Vec<Lot>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add freshly produced or injected units (age zero).
    pub fn add(&mut self, good: GoodId, quantity: Quantity) {
        if quantity == 0 {
            return;
        }
        self.merge_lot(good, Lot { quantity, age: 0 });
    }

    /// Add units that keep the freshness they arrived with (trades).
    pub fn add_lots(&mut self, good: GoodId, lots: Vec<Lot>) {
        for lot in lots {
            if lot.quantity > 0 {
                self.merge_lot(good, lot);
            }
        }
    }

    fn merge_lot(&mut self, good: GoodId, lot: Lot) {
        let lots = self.lots.entry(good).or_default();
        match lots.binary_search_by_key(&lot.age, |l| l.age) {
            Ok(i) => lots[i].quantity += lot.quantity,
            Err(i) => lots.insert(i, lot),
        }
    }

    /// Withdraw and destroy units, oldest lots first.
    pub fn withdraw(&mut self, good: GoodId, quantity: Quantity) -> Result<(), InventoryError> {
        self.withdraw_lots(good, quantity).map(|_| ())
    }

    /// Withdraw units oldest-first, returning the removed lots so a
    /// transfer can preserve freshness. Checks availability before touching
    /// anything: the withdrawal either happens in full or not at all.
    pub fn withdraw_lots(
        &mut self,
        good: GoodId,
        quantity: Quantity,
    ) -> Result<Vec<Lot>, InventoryError> {
        if quantity == 0 {
            return Ok(Vec::new());
        }
        let available = self.quantity(good);
        if available < quantity {
            return Err(InventoryError::Underflow {
                good,
                requested: quantity,
                available,
            });
        }

        let mut taken = Vec::new();
        let mut remaining = quantity;
        if let Some(lots) = self.lots.get_mut(&good) {
            while remaining > 0 {
                let Some(oldest) = lots.last_mut() else {
                    break;
                };
                if oldest.quantity <= remaining {
                    remaining -= oldest.quantity;
                    taken.push(*oldest);
                    lots.pop();
                } else {
                    oldest.quantity -= remaining;
                    taken.push(Lot {
                        quantity: remaining,
                        age: oldest.age,
                    });
                    remaining = 0;
                }
            }
            if lots.is_empty() {
                self.lots.remove(&good);
            }
        }
        Ok(taken)
    }

    pub fn quantity(&self, good: GoodId) -> Quantity {
        self.lots
            .get(&good)
            .map(|lots| lots.iter().map(|l| l.quantity).sum())
            .unwrap_or(0)
    }

    pub fn total_units(&self) -> Quantity {
        self.lots
            .values()
            .flat_map(|lots| lots.iter().map(|l| l.quantity))
            .sum()
    }

    /// Goods currently held, ascending by id.
    pub fn goods(&self) -> impl Iterator<Item = GoodId> + '_ {
        self.lots.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// One decay pass: every lot ages one step, then lots of decaying goods
    /// that reached their decay rate convert (floor of quantity x ratio into
    /// the target, fresh) or are destroyed. Conversion products never age in
    /// the pass that created them.
    pub fn apply_decay(&mut self, catalog: &Catalog) -> Vec<DecayEvent> {
        let mut events = Vec::new();
        let mut conversions: Vec<(GoodId, Quantity)> = Vec::new();

        for (&good_id, lots) in self.lots.iter_mut() {
            for lot in lots.iter_mut() {
                lot.age += 1;
            }
            let Some(good) = catalog.good(good_id) else {
                continue;
            };
            if !good.decays() {
                continue;
            }

            let mut lost = 0;
            lots.retain(|lot| {
                if lot.age >= good.decay_turns {
                    lost += lot.quantity;
                    false
                } else {
                    true
                }
            });
            if lost == 0 {
                continue;
            }

            let converted = good.decays_into.and_then(|decay| {
                let surviving = (lost as f64 * decay.ratio).floor() as Quantity;
                (surviving > 0).then_some((decay.target, surviving))
            });
            if let Some((target, quantity)) = converted {
                conversions.push((target, quantity));
            }
            events.push(DecayEvent {
                good: good_id,
                lost,
                converted,
            });
        }

        self.lots.retain(|_, lots| !lots.is_empty());
        for (target, quantity) in conversions {
            self.add(target, quantity);
        }
        events
    }

    /// Remove everything tagged transient (end-of-day consumed goods and
    /// services, including the time good).
    pub fn purge_transient(&mut self, catalog: &Catalog) -> Vec<(GoodId, Quantity)> {
        let mut purged = Vec::new();
        self.lots.retain(|&good_id, lots| {
            let transient = catalog
                .good(good_id)
                .is_some_and(|good| good.is_transient());
            if transient {
                let quantity: Quantity = lots.iter().map(|l| l.quantity).sum();
                if quantity > 0 {
                    purged.push((good_id, quantity));
                }
                false
            } else {
                true
            }
        });
        purged
    }

    /// AMV-weighted value of wealth-flagged holdings. This is the canonical
    /// satisfier of the implicit wealth desire.
    pub fn wealth_value(&self, catalog: &Catalog, amv: impl Fn(GoodId) -> Price) -> f64 {
        self.lots
            .iter()
            .filter(|(good_id, _)| {
                catalog
                    .good(**good_id)
                    .is_some_and(|good| good.satisfaction.wealth)
            })
            .map(|(good_id, lots)| {
                let units: Quantity = lots.iter().map(|l| l.quantity).sum();
                units as f64 * amv(*good_id)
            })
            .sum()
    }
}

/// Move units between two inventories, preserving lot freshness. Atomic:
/// either the full quantity moves or nothing does.
pub fn transfer(
    from: &mut Inventory,
    to: &mut Inventory,
    good: GoodId,
    quantity: Quantity,
) -> Result<(), InventoryError> {
    let lots = from.withdraw_lots(good, quantity)?;
    to.add_lots(good, lots);
    Ok(())
}
