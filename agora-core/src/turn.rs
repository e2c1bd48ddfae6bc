// Turn orchestrator: the fixed phase sequence every simulated turn runs.
//
// 1. decay, 2. grace release and injections, 3. production, 4. desire
// refresh, 5. market clearing, 6. transient purge. Because release (2)
// happens after decay (1) and production (3) only stages, nothing a firm
// makes in a turn can be sold in the turn that made it.

use std::collections::BTreeMap;

use crate::agents::Inventory;
use crate::catalog::Catalog;
use crate::desires::{DemandEntry, refresh_seed};
use crate::errors::{Shortfall, SimError};
use crate::external::{TaxTable, TransportTable};
use crate::market::{MarketConfig, Settlement, clear_locality};
use crate::production::{ScheduleConfig, schedule_firm};
use crate::types::{FirmId, GoodId, KeyToU64, LocalityId, PopId, Price, Quantity, Turn};
use crate::world::World;

// === CONFIG AND REPORT ===

/// All tuning for one simulation run. Passed by reference into the turn
/// loop rather than owned by world state, so callers may vary it between
/// turns without touching the checkpoint format.
#[derive(Clone, Debug, Default)]
pub struct SimConfig {
    pub schedule: ScheduleConfig,
    pub market: MarketConfig,
    pub transport: TransportTable,
    pub taxes: TaxTable,
}

/// Everything one turn produced, returned to the caller and logged.
#[derive(Clone, Debug, Default)]
pub struct TurnReport {
    /// The turn that ran, i.e. the world's counter before advancing.
    pub turn: Turn,
    pub settlements: Vec<Settlement>,
    pub shortfalls: Vec<Shortfall>,
    /// Production blocks scheduled across all firms.
    pub blocks: u32,
    /// Clearing matches skipped because the buyer could not pay time.
    pub time_skips: u32,
    /// Units lost to decay this turn per good, conversion not credited.
    pub decay_losses: BTreeMap<GoodId, Quantity>,
}

// === ORCHESTRATION ===

/// Advance the world by exactly one turn. Shortfalls accumulate in the
/// report and never interrupt the sequence; an `Err` is a logic fault and
/// the world should be discarded or restored from a checkpoint.
pub fn run_turn(
    world: &mut World,
    catalog: &Catalog,
    config: &SimConfig,
) -> Result<TurnReport, SimError> {
    let turn = world.turn;
    let mut report = TurnReport {
        turn,
        ..TurnReport::default()
    };

    // 1. Decay everything that sat in an inventory overnight.
    phase_marker(turn, "decay");
    for (pid, pop) in world.pops.iter_mut() {
        decay_inventory(
            turn,
            "pop",
            pid.to_u64(),
            &mut pop.inventory,
            catalog,
            &mut report.decay_losses,
        );
    }
    for (fid, firm) in world.firms.iter_mut() {
        decay_inventory(
            turn,
            "firm",
            fid.to_u64(),
            &mut firm.inventory,
            catalog,
            &mut report.decay_losses,
        );
    }
    for (lid, locality) in world.localities.iter_mut() {
        decay_inventory(
            turn,
            "pool",
            lid.to_u64(),
            &mut locality.pool,
            catalog,
            &mut report.decay_losses,
        );
    }

    // 2. Grace buffers built last turn become live stock, then queued
    // deliveries land in the pools. Both arrive fresh, after this turn's
    // decay pass.
    phase_marker(turn, "release");
    for firm in world.firms.values_mut() {
        firm.release_staged();
    }
    for injection in std::mem::take(&mut world.pending_injections) {
        let locality = world
            .localities
            .get_mut(injection.locality)
            .ok_or(SimError::MissingLocality)?;
        locality.pool.add(injection.good, injection.quantity);
        match injection.origin {
            Some(origin) => {
                locality.pool_origins.insert(injection.good, origin);
            }
            None => {
                locality.pool_origins.remove(&injection.good);
            }
        }
    }

    // 3. Production in ascending firm key order. Prices come from the home
    // locality's markets; unquoted goods fall back to the initial AMV.
    phase_marker(turn, "production");
    let mut firm_ids: Vec<FirmId> = world.firms.keys().collect();
    firm_ids.sort();
    {
        let World {
            localities, firms, ..
        } = &mut *world;
        for fid in firm_ids {
            let Some(firm) = firms.get_mut(fid) else {
                continue;
            };
            let locality = localities.get(firm.home).ok_or(SimError::MissingLocality)?;
            let prices: BTreeMap<GoodId, Price> = locality
                .markets
                .iter()
                .map(|(&good, market)| (good, market.amv))
                .collect();
            let scheduled = schedule_firm(
                turn,
                fid,
                firm,
                catalog,
                &prices,
                config.market.initial_amv,
                &config.schedule,
            )?;
            report.blocks += scheduled.blocks.len() as u32;
            report.shortfalls.extend(scheduled.shortfalls);
        }
    }

    // 4. Grant the day's time and rebuild every demand list.
    phase_marker(turn, "refresh");
    let time_good = catalog.time_good();
    let mut demand: BTreeMap<PopId, Vec<DemandEntry>> = BTreeMap::new();
    for (pid, pop) in world.pops.iter_mut() {
        pop.inventory.add(time_good, pop.time_rate);
        demand.insert(pid, pop.ledger.refresh(turn, refresh_seed(turn, pid)));
    }

    // 5. Clear every locality's market in ascending key order.
    phase_marker(turn, "clearing");
    let mut locality_ids: Vec<LocalityId> = world.localities.keys().collect();
    locality_ids.sort();
    {
        let World {
            localities,
            pops,
            firms,
            ..
        } = &mut *world;
        for lid in locality_ids {
            let Some(locality) = localities.get_mut(lid) else {
                continue;
            };
            let cleared = clear_locality(
                turn,
                lid,
                locality,
                pops,
                firms,
                &demand,
                catalog,
                &config.market,
                &config.transport,
                &config.taxes,
            )?;
            report.settlements.extend(cleared.settlements);
            report.shortfalls.extend(cleared.shortfalls);
            report.time_skips += cleared.time_skips;
        }
    }

    // 6. Transient goods vanish, the clock advances.
    phase_marker(turn, "purge");
    for pop in world.pops.values_mut() {
        pop.inventory.purge_transient(catalog);
    }
    for firm in world.firms.values_mut() {
        firm.inventory.purge_transient(catalog);
    }
    for locality in world.localities.values_mut() {
        locality.pool.purge_transient(catalog);
    }
    world.turn += 1;

    #[cfg(feature = "instrument")]
    {
        log_shortfalls(turn, &report.shortfalls);
        // The implicit wealth desire reads as a valuation, not a bid.
        for (pid, pop) in world.pops.iter() {
            let Some(home) = world.localities.get(pop.home) else {
                continue;
            };
            let value = pop.inventory.wealth_value(catalog, |good| {
                home.amv(good).unwrap_or(config.market.initial_amv)
            });
            tracing::info!(
                target: "wealth",
                turn = turn,
                pop_id = pid.to_u64(),
                value = value,
                weight = pop.ledger.wealth_weight(),
            );
        }
        tracing::info!(
            target: "turn",
            turn = turn,
            phase = "complete",
            settlements = report.settlements.len() as u64,
            shortfalls = report.shortfalls.len() as u64,
            blocks = report.blocks,
            time_skips = report.time_skips,
            decay_lost = report.decay_losses.values().copied().sum::<Quantity>(),
        );
    }

    Ok(report)
}

// === HELPERS ===

fn phase_marker(turn: Turn, phase: &str) {
    #[cfg(feature = "instrument")]
    tracing::info!(target: "turn", turn = turn, phase = phase,);
    let _ = (turn, phase); // Suppress unused warnings
}

/// Age one inventory and fold its losses into the turn tally.
fn decay_inventory(
    turn: Turn,
    owner_kind: &str,
    owner: u64,
    inventory: &mut Inventory,
    catalog: &Catalog,
    losses: &mut BTreeMap<GoodId, Quantity>,
) {
    for event in inventory.apply_decay(catalog) {
        *losses.entry(event.good).or_default() += event.lost;

        #[cfg(feature = "instrument")]
        match event.converted {
            Some((into, converted)) => tracing::info!(
                target: "decay",
                turn = turn,
                owner_kind = owner_kind,
                owner = owner,
                good = event.good.0,
                lost = event.lost,
                into = into.0,
                converted = converted,
            ),
            None => tracing::info!(
                target: "decay",
                turn = turn,
                owner_kind = owner_kind,
                owner = owner,
                good = event.good.0,
                lost = event.lost,
            ),
        }
    }
    let _ = (turn, owner_kind, owner); // Suppress unused warnings
}

#[cfg(feature = "instrument")]
fn log_shortfalls(turn: Turn, shortfalls: &[Shortfall]) {
    for &shortfall in shortfalls {
        match shortfall {
            Shortfall::Scheduling { firm, process } => tracing::info!(
                target: "shortfall",
                turn = turn,
                kind = "scheduling",
                firm = firm.to_u64(),
                process = process.0,
            ),
            Shortfall::InsufficientTime { firm } => tracing::info!(
                target: "shortfall",
                turn = turn,
                kind = "insufficient_time",
                firm = firm.to_u64(),
            ),
            Shortfall::Liquidity {
                locality,
                good,
                unmet_bids,
            } => tracing::info!(
                target: "shortfall",
                turn = turn,
                kind = "liquidity",
                locality = locality.to_u64(),
                good = good.0,
                unmet_bids = unmet_bids,
            ),
        }
    }
}
