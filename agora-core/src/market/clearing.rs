// Turn-level auction for one locality.
//
// Per good, in ascending id order: apply last turn's pressure, gather
// asks, derive single-unit bids from the ranked demand lists, match
// strictly in priority order, commit transfers atomically, then update
// the AMV once. Residual imbalance becomes next turn's pressure, never a
// standing order.

use std::collections::{BTreeMap, BTreeSet};

use slotmap::SlotMap;

use crate::agents::{Firm, Pop};
use crate::catalog::Catalog;
use crate::desires::{DemandEntry, DesireTarget};
use crate::errors::{Shortfall, SimError};
use crate::external::{TaxTable, TransportTable};
use crate::market::orders::{Ask, Bid, Seller, Settlement};
use crate::market::state::{MarketConfig, MarketState};
use crate::types::{FirmId, GoodId, LocalityId, PopId, Quantity, Turn};
use crate::world::Locality;

#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// Everything one locality's clearing produced.
#[derive(Clone, Debug, Default)]
pub struct LocalityClearing {
    pub settlements: Vec<Settlement>,
    pub shortfalls: Vec<Shortfall>,
    /// Matches skipped because the buyer could not pay the time cost.
    pub time_skips: u32,
}

/// True for goods that never appear on the ask side: services and the
/// time good itself.
fn never_asked(catalog: &Catalog, good: GoodId) -> bool {
    good == catalog.time_good()
        || catalog
            .good(good)
            .is_some_and(|g| g.has_tag(crate::catalog::GoodTag::Service))
}

/// A pop only offers stock no active ranked desire of its own targets.
/// The implicit wealth desire protects nothing, otherwise wealth-flagged
/// goods could never change hands.
fn pop_protects(pop: &Pop, good: GoodId, catalog: &Catalog) -> bool {
    pop.ledger.desires().iter().any(|desire| {
        desire.target != DesireTarget::Wealth
            && desire.remaining != Some(0)
            && catalog.good_matches_target(good, desire.target)
    })
}

pub fn clear_locality(
    turn: Turn,
    locality_id: LocalityId,
    locality: &mut Locality,
    pops: &mut SlotMap<PopId, Pop>,
    firms: &mut SlotMap<FirmId, Firm>,
    demand: &BTreeMap<PopId, Vec<DemandEntry>>,
    catalog: &Catalog,
    config: &MarketConfig,
    transport: &TransportTable,
    taxes: &TaxTable,
) -> Result<LocalityClearing, SimError> {
    // Last turn's imbalance moves the price before anything else happens.
    for market in locality.markets.values_mut() {
        if market.pressure != 0.0 {
            market.amv = (market.amv * (1.0 + config.pressure_rate * market.pressure))
                .max(config.price_floor);
            market.pressure = 0.0;
        }
    }

    // Gather supply: firms offer everything, pops only untargeted stock,
    // the pool offers injected goods with their origin attached.
    let mut supply: BTreeMap<GoodId, Vec<(Seller, Quantity, LocalityId)>> = BTreeMap::new();
    for (fid, firm) in firms.iter() {
        if firm.home != locality_id {
            continue;
        }
        for good in firm.inventory.goods() {
            if never_asked(catalog, good) {
                continue;
            }
            let quantity = firm.inventory.quantity(good);
            if quantity > 0 {
                supply
                    .entry(good)
                    .or_default()
                    .push((Seller::Firm(fid), quantity, locality_id));
            }
        }
    }
    for (pid, pop) in pops.iter() {
        if pop.home != locality_id {
            continue;
        }
        for good in pop.inventory.goods() {
            if never_asked(catalog, good) || pop_protects(pop, good, catalog) {
                continue;
            }
            let quantity = pop.inventory.quantity(good);
            if quantity > 0 {
                supply
                    .entry(good)
                    .or_default()
                    .push((Seller::Pop(pid), quantity, locality_id));
            }
        }
    }
    for good in locality.pool.goods() {
        if never_asked(catalog, good) {
            continue;
        }
        let quantity = locality.pool.quantity(good);
        if quantity > 0 {
            let origin = locality
                .pool_origins
                .get(&good)
                .copied()
                .unwrap_or(locality_id);
            supply
                .entry(good)
                .or_default()
                .push((Seller::Pool, quantity, origin));
        }
    }

    // Price the asks. Quoting a good here for the first time creates its
    // market at the configured initial AMV.
    let mut asks: BTreeMap<GoodId, Vec<Ask>> = BTreeMap::new();
    for (&good, offers) in &supply {
        let market = locality
            .markets
            .entry(good)
            .or_insert_with(|| MarketState::new(config.initial_amv));
        let reservation = (market.amv * config.reservation_ratio).max(config.price_floor);
        let tax = 1.0 + taxes.rate(locality_id, good);
        let book = asks.entry(good).or_default();
        for &(seller, quantity, origin) in offers {
            let price = (reservation + transport.surcharge(good, origin, locality_id)) * tax;
            book.push(Ask {
                seller,
                quantity,
                price,
            });
        }
        book.sort_by(|a, b| a.price.total_cmp(&b.price));
    }

    // Match per good. A desire fills at most once per turn, tracked
    // across goods so the lowest-id satisfier wins for multi-good targets.
    let mut result = LocalityClearing::default();
    let mut fulfilled: BTreeSet<(PopId, usize)> = BTreeSet::new();
    let good_ids: Vec<GoodId> = locality.markets.keys().copied().collect();
    let time_good = catalog.time_good();

    for good in good_ids {
        let Some(amv) = locality.markets.get(&good).map(|m| m.amv) else {
            continue;
        };

        let mut bids: Vec<Bid> = Vec::new();
        for (&pid, entries) in demand {
            let Some(pop) = pops.get(pid) else {
                continue;
            };
            if pop.home != locality_id {
                continue;
            }
            for (position, entry) in entries.iter().enumerate() {
                if let Some((rate, time_cost)) = catalog.marginal_gain(good, entry.target) {
                    bids.push(Bid {
                        pop: pid,
                        desire: entry.desire,
                        weight: entry.weight,
                        position,
                        limit: amv * rate,
                        time_cost,
                    });
                }
            }
        }
        bids.sort_by(|a, b| {
            a.weight
                .total_cmp(&b.weight)
                .then_with(|| a.pop.cmp(&b.pop))
                .then_with(|| a.position.cmp(&b.position))
        });

        let mut book = asks.remove(&good).unwrap_or_default();
        let offered_units: Quantity = book.iter().map(|a| a.quantity).sum();
        let mut unmet_bids: u32 = 0;
        let mut traded_units: Quantity = 0;
        let mut traded_value: f64 = 0.0;

        for bid in &bids {
            if fulfilled.contains(&(bid.pop, bid.desire)) {
                continue;
            }
            let Some(slot) = book
                .iter()
                .position(|a| a.quantity > 0 && a.price <= bid.limit)
            else {
                unmet_bids += 1;
                continue;
            };

            if bid.time_cost > 0 {
                let buyer = pops.get_mut(bid.pop).ok_or(SimError::MissingAgent)?;
                if buyer.inventory.quantity(time_good) < bid.time_cost {
                    result.time_skips += 1;
                    continue;
                }
                buyer
                    .inventory
                    .withdraw(time_good, bid.time_cost)
                    .map_err(|source| SimError::Inventory {
                        phase: "clearing",
                        source,
                    })?;
            }

            let seller = book[slot].seller;
            let price = book[slot].price;
            let lots = match seller {
                Seller::Pop(id) => pops
                    .get_mut(id)
                    .ok_or(SimError::MissingAgent)?
                    .inventory
                    .withdraw_lots(good, 1),
                Seller::Firm(id) => firms
                    .get_mut(id)
                    .ok_or(SimError::MissingAgent)?
                    .inventory
                    .withdraw_lots(good, 1),
                Seller::Pool => locality.pool.withdraw_lots(good, 1),
            }
            .map_err(|source| SimError::Inventory {
                phase: "clearing",
                source,
            })?;
            book[slot].quantity -= 1;

            let buyer = pops.get_mut(bid.pop).ok_or(SimError::MissingAgent)?;
            buyer.inventory.add_lots(good, lots);
            buyer.ledger.record_fulfillment(bid.desire);
            fulfilled.insert((bid.pop, bid.desire));
            traded_units += 1;
            traded_value += price;
            result.settlements.push(Settlement {
                turn,
                locality: locality_id,
                good,
                seller,
                buyer: bid.pop,
                quantity: 1,
                price,
            });

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "settlement",
                turn = turn,
                locality_id = locality_id.to_u64(),
                good_id = good.0,
                buyer_id = bid.pop.to_u64(),
                price = price,
                quantity = 1u64,
            );
        }

        // Single AMV write per good per turn, then the pressure snapshot
        // for the next clearing.
        let leftover: Quantity = book.iter().map(|a| a.quantity).sum();
        if let Some(market) = locality.markets.get_mut(&good) {
            let next_amv = if traded_units > 0 {
                traded_value / traded_units as f64
            } else {
                market.amv
            };
            market.record(next_amv);
            let excess = unmet_bids as f64 + leftover as f64;
            market.pressure = if excess > 0.0 {
                (unmet_bids as f64 - leftover as f64) / excess
            } else {
                0.0
            };

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "market",
                turn = turn,
                locality_id = locality_id.to_u64(),
                good_id = good.0,
                amv = market.amv,
                traded = traded_units,
                unmet_bids = unmet_bids,
                leftover_asks = leftover,
                pressure = market.pressure,
            );
        }
        if offered_units == 0 && unmet_bids > 0 {
            result.shortfalls.push(Shortfall::Liquidity {
                locality: locality_id,
                good,
                unmet_bids,
            });
        }
    }

    Ok(result)
}
