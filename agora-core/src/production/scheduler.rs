// Time-budgeted process sequencing for one firm.
//
// Greedy highest-score-first: pick the best value-per-effort process, run
// it as a maximal contiguous block (inputs and budget permitting), then
// re-evaluate. Friction is charged on every block entry, including the
// first of the turn. Outputs land in the firm's grace buffer, never in
// live inventory.

use std::collections::{BTreeMap, BTreeSet};

use crate::agents::{Firm, Inventory};
use crate::catalog::{Catalog, InputMode, ItemRef, Process};
use crate::errors::{Shortfall, SimError};
use crate::production::scoring::{ScheduleConfig, engagement_factor};
use crate::types::{FirmId, GoodId, Price, ProcessId, Quantity, TimeUnits, Turn};

#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// Slack for time-budget comparisons, well below any meaningful time cost.
const TIME_EPS: f64 = 1e-9;

// === RESULTS ===

/// One maximal contiguous run of a single process.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledBlock {
    pub process: ProcessId,
    pub runs: u32,
    /// Run time of the block, friction not included.
    pub time: TimeUnits,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScheduleResult {
    pub blocks: Vec<ScheduledBlock>,
    /// Run time plus friction actually spent.
    pub time_used: TimeUnits,
    pub friction_paid: TimeUnits,
    pub shortfalls: Vec<Shortfall>,
}

// === RUN PLANNING ===

/// Everything one invocation would withdraw, plus its engagement.
struct RunPlan {
    withdrawals: Vec<(GoodId, Quantity)>,
    engagement: f64,
}

fn free_stock(inventory: &Inventory, pending: &BTreeMap<GoodId, Quantity>, good: GoodId) -> Quantity {
    inventory
        .quantity(good)
        .saturating_sub(pending.get(&good).copied().unwrap_or(0))
}

/// Try to satisfy one input slot against current stock less what this run
/// already claimed. Consume-mode claims units; Use-mode only requires
/// presence. Want-referencing slots walk consumption sources ascending by
/// good id and take the first with sufficient stock.
fn stage_input(
    item: ItemRef,
    quantity: f64,
    mode: InputMode,
    inventory: &Inventory,
    catalog: &Catalog,
    pending: &mut BTreeMap<GoodId, Quantity>,
) -> bool {
    match item {
        ItemRef::Good(good) => {
            let need = quantity as Quantity;
            if free_stock(inventory, pending, good) < need {
                return false;
            }
            if mode == InputMode::Consume {
                *pending.entry(good).or_insert(0) += need;
            }
            true
        }
        ItemRef::Want(want) => {
            for (good, efficiency) in catalog.consumption_sources(want) {
                let units = (quantity / efficiency).ceil() as Quantity;
                if free_stock(inventory, pending, good) >= units {
                    if mode == InputMode::Consume {
                        *pending.entry(good).or_insert(0) += units;
                    }
                    return true;
                }
            }
            false
        }
    }
}

/// Plan one invocation. `None` when a non-excludable input is missing;
/// otherwise the plan engages every excludable it can cover.
fn plan_run(process: &Process, inventory: &Inventory, catalog: &Catalog) -> Option<RunPlan> {
    let mut pending = BTreeMap::new();
    let mut engaged_excludables = 0;

    for input in process.inputs.iter().filter(|i| !i.excludable) {
        if !stage_input(
            input.item,
            input.quantity,
            input.mode,
            inventory,
            catalog,
            &mut pending,
        ) {
            return None;
        }
    }
    for input in process.inputs.iter().filter(|i| i.excludable) {
        if stage_input(
            input.item,
            input.quantity,
            input.mode,
            inventory,
            catalog,
            &mut pending,
        ) {
            engaged_excludables += 1;
        }
    }

    let engagement = engagement_factor(
        process.required_count(),
        engaged_excludables,
        process.input_count(),
    );
    Some(RunPlan {
        withdrawals: pending.into_iter().collect(),
        engagement,
    })
}

/// Value of one invocation at current prices. Want outputs never price.
fn run_value(
    process: &Process,
    engagement: f64,
    prices: &BTreeMap<GoodId, Price>,
    default_price: Price,
) -> f64 {
    process
        .outputs
        .iter()
        .filter_map(|output| match output.item {
            ItemRef::Good(good) => {
                let price = prices.get(&good).copied().unwrap_or(default_price);
                Some(output.quantity * engagement * price)
            }
            ItemRef::Want(_) => None,
        })
        .sum()
}

// === SCHEDULER ===

#[derive(Clone, Copy, PartialEq)]
enum SkipReason {
    Time,
    Inputs,
    NoValue,
}

/// Fill one firm's turn. Consumes inputs from live inventory, stages
/// outputs into the grace buffer, and records friction on the firm.
/// The only fatal outcome is an inventory underflow, which indicates a
/// planning fault rather than a bad world state.
pub fn schedule_firm(
    turn: Turn,
    firm_id: FirmId,
    firm: &mut Firm,
    catalog: &Catalog,
    prices: &BTreeMap<GoodId, Price>,
    default_price: Price,
    config: &ScheduleConfig,
) -> Result<ScheduleResult, SimError> {
    let mut distinct: Vec<ProcessId> = Vec::new();
    for &pid in &firm.processes {
        if !distinct.contains(&pid) {
            distinct.push(pid);
        }
    }

    let mut result = ScheduleResult::default();
    let mut skip_reasons: BTreeMap<ProcessId, SkipReason> = BTreeMap::new();
    let mut unknown: BTreeSet<ProcessId> = BTreeSet::new();
    let mut ran: BTreeSet<ProcessId> = BTreeSet::new();
    let budget = firm.time_budget;
    let mut used: TimeUnits = 0.0;

    loop {
        // Evaluate every candidate against what is left of the budget.
        let mut best: Option<(ProcessId, &Process, RunPlan, f64)> = None;
        for &pid in &distinct {
            let Some(process) = catalog.process(pid) else {
                unknown.insert(pid);
                continue;
            };
            if used + config.friction + process.time > budget + TIME_EPS {
                // Keep the first recorded reason: exhausting the budget in
                // a later pass does not erase a missing-inputs skip.
                skip_reasons.entry(pid).or_insert(SkipReason::Time);
                continue;
            }
            let Some(plan) = plan_run(process, &firm.inventory, catalog) else {
                skip_reasons.insert(pid, SkipReason::Inputs);
                continue;
            };
            let value = run_value(process, plan.engagement, prices, default_price);
            if value <= 0.0 {
                skip_reasons.insert(pid, SkipReason::NoValue);
                continue;
            }
            let score = value / (process.time * config.complexity.rate(process));
            let better = match &best {
                None => true,
                Some((best_pid, _, _, best_score)) => {
                    score > *best_score || (score == *best_score && pid < *best_pid)
                }
            };
            if better {
                best = Some((pid, process, plan, score));
            }
        }

        let Some((pid, process, first_plan, _)) = best else {
            break;
        };

        // Enter the block: friction, then the already-planned first run.
        used += config.friction;
        result.friction_paid += config.friction;
        let mut runs: u32 = 0;
        let mut block_time: TimeUnits = 0.0;
        let mut block_out: BTreeMap<GoodId, f64> = BTreeMap::new();

        let mut plan = first_plan;
        loop {
            for &(good, quantity) in &plan.withdrawals {
                firm.inventory
                    .withdraw(good, quantity)
                    .map_err(|source| SimError::Inventory {
                        phase: "scheduler",
                        source,
                    })?;
            }
            runs += 1;
            used += process.time;
            block_time += process.time;
            for output in &process.outputs {
                if let ItemRef::Good(good) = output.item {
                    *block_out.entry(good).or_insert(0.0) += output.quantity * plan.engagement;
                }
            }

            if used + process.time > budget + TIME_EPS {
                break;
            }
            match plan_run(process, &firm.inventory, catalog) {
                Some(next) => plan = next,
                None => break,
            }
        }

        ran.insert(pid);
        skip_reasons.remove(&pid);
        for (good, produced) in block_out {
            firm.stage(good, produced.floor() as Quantity);
        }
        result.blocks.push(ScheduledBlock {
            process: pid,
            runs,
            time: block_time,
        });

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "production",
            turn = turn,
            firm_id = firm_id.to_u64(),
            process_id = pid.0,
            runs = runs,
            time = block_time,
        );
        let _ = turn; // Suppress unused warnings
    }

    // Processes that never ran: missing inputs are reported, a tight
    // budget only when nothing at all fit.
    for pid in unknown {
        result
            .shortfalls
            .push(Shortfall::Scheduling { firm: firm_id, process: pid });
    }
    for (&pid, &reason) in &skip_reasons {
        if reason == SkipReason::Inputs && !ran.contains(&pid) {
            result
                .shortfalls
                .push(Shortfall::Scheduling { firm: firm_id, process: pid });
        }
    }
    if result.blocks.is_empty()
        && skip_reasons.values().any(|&r| r == SkipReason::Time)
    {
        result.shortfalls.push(Shortfall::InsufficientTime { firm: firm_id });
    }

    result.time_used = used;
    firm.friction_spent = result.friction_paid;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::StagedOutput;
    use crate::catalog::{GainMode, Good, GoodTag, Want};
    use crate::types::{LocalityId, WantId};
    use slotmap::SlotMap;

    const TIME: GoodId = GoodId(0);
    const IRON: GoodId = GoodId(1);
    const COAL: GoodId = GoodId(2);
    const STEEL: GoodId = GoodId(3);
    const PLANK: GoodId = GoodId(4);
    const CHARCOAL: GoodId = GoodId(5);
    const OIL: GoodId = GoodId(6);
    const FUEL: WantId = WantId(1);

    const SMELT: ProcessId = ProcessId(1);
    const WHITTLE: ProcessId = ProcessId(2);
    const BURN: ProcessId = ProcessId(3);

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                Good::new(TIME, "Time").with_tag(GoodTag::EndOfDayConsumed),
                Good::new(IRON, "Iron"),
                Good::new(COAL, "Coal"),
                Good::new(STEEL, "Steel"),
                Good::new(PLANK, "Plank"),
                Good::new(CHARCOAL, "Charcoal").with_want(FUEL, GainMode::Consumption, 0.5, 0),
                Good::new(OIL, "Oil").with_want(FUEL, GainMode::Consumption, 1.0, 0),
            ],
            vec![Want::new(FUEL, "Fuel")],
            vec![
                Process::new(SMELT, "Smelt", 1.0)
                    .with_input(ItemRef::Good(IRON), 1.0, InputMode::Consume)
                    .with_excludable_input(ItemRef::Good(COAL), 1.0, InputMode::Consume)
                    .with_output(ItemRef::Good(STEEL), 2.0),
                Process::new(WHITTLE, "Whittle", 1.0).with_output(ItemRef::Good(PLANK), 1.0),
                Process::new(BURN, "Burn", 1.0)
                    .with_input(ItemRef::Want(FUEL), 1.0, InputMode::Consume)
                    .with_output(ItemRef::Good(STEEL), 1.0),
            ],
            TIME,
        )
        .unwrap()
    }

    fn fid() -> FirmId {
        let mut arena: SlotMap<FirmId, ()> = SlotMap::with_key();
        arena.insert(())
    }

    fn home() -> LocalityId {
        let mut arena: SlotMap<LocalityId, ()> = SlotMap::with_key();
        arena.insert(())
    }

    fn prices(pairs: &[(GoodId, Price)]) -> BTreeMap<GoodId, Price> {
        pairs.iter().copied().collect()
    }

    fn run(firm: &mut Firm, table: &[(GoodId, Price)]) -> ScheduleResult {
        schedule_firm(
            0,
            fid(),
            firm,
            &catalog(),
            &prices(table),
            1.0,
            &ScheduleConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_budget_bounds_runs_with_switch_in_friction() {
        let mut firm = Firm::new(home(), 24.0).with_process(WHITTLE);
        let result = run(&mut firm, &[]);

        // 23 runs plus one friction charge fit in 24; a 24th run would not.
        assert_eq!(result.blocks, vec![ScheduledBlock { process: WHITTLE, runs: 23, time: 23.0 }]);
        assert!((result.time_used - 23.1).abs() < 1e-9);
        assert!((firm.friction_spent - 0.1).abs() < 1e-12);
        assert_eq!(firm.staged, vec![StagedOutput { good: PLANK, quantity: 23 }]);
        assert!(result.shortfalls.is_empty());

        let mut tighter = Firm::new(home(), 22.0).with_process(WHITTLE);
        let result = run(&mut tighter, &[]);
        assert_eq!(result.blocks[0].runs, 21);
    }

    #[test]
    fn test_friction_charged_once_per_block() {
        let mut firm = Firm::new(home(), 5.0)
            .with_process(SMELT)
            .with_process(WHITTLE)
            .with_stock(IRON, 2);
        let result = run(&mut firm, &[(STEEL, 10.0), (PLANK, 1.0)]);

        // Smelting scores higher, runs until iron is gone, then one switch
        // to whittling. Two blocks, two friction charges.
        assert_eq!(
            result.blocks,
            vec![
                ScheduledBlock { process: SMELT, runs: 2, time: 2.0 },
                ScheduledBlock { process: WHITTLE, runs: 2, time: 2.0 },
            ]
        );
        assert!((firm.friction_spent - 0.2).abs() < 1e-12);
        assert!(result.shortfalls.is_empty(), "a process that ran is never a shortfall");
    }

    #[test]
    fn test_omitted_excludable_scales_output() {
        let mut firm = Firm::new(home(), 4.5)
            .with_process(SMELT)
            .with_stock(IRON, 4)
            .with_stock(COAL, 2);
        let result = run(&mut firm, &[(STEEL, 10.0)]);

        // Two runs fully engaged (2 steel each), two without coal at
        // engagement 1/2 (1 steel each).
        assert_eq!(result.blocks, vec![ScheduledBlock { process: SMELT, runs: 4, time: 4.0 }]);
        assert_eq!(firm.staged, vec![StagedOutput { good: STEEL, quantity: 6 }]);
        assert_eq!(firm.inventory.quantity(IRON), 0);
        assert_eq!(firm.inventory.quantity(COAL), 0);
        // Output is staged, never live in the same turn.
        assert_eq!(firm.inventory.quantity(STEEL), 0);
    }

    #[test]
    fn test_missing_required_input_is_skipped_and_reported() {
        // Whittling fills the whole budget, so smelt is re-evaluated after
        // the time is gone; its missing-iron record must still surface.
        let firm_id = fid();
        let mut firm = Firm::new(home(), 3.0)
            .with_process(SMELT)
            .with_process(WHITTLE);
        let result = schedule_firm(
            0,
            firm_id,
            &mut firm,
            &catalog(),
            &prices(&[(STEEL, 10.0)]),
            1.0,
            &ScheduleConfig::default(),
        )
        .unwrap();

        assert_eq!(result.blocks, vec![ScheduledBlock { process: WHITTLE, runs: 2, time: 2.0 }]);
        assert_eq!(
            result.shortfalls,
            vec![Shortfall::Scheduling { firm: firm_id, process: SMELT }]
        );
    }

    #[test]
    fn test_insufficient_time_when_nothing_fits() {
        let firm_id = fid();
        let mut firm = Firm::new(home(), 0.5).with_process(WHITTLE);
        let result = schedule_firm(
            0,
            firm_id,
            &mut firm,
            &catalog(),
            &BTreeMap::new(),
            1.0,
            &ScheduleConfig::default(),
        )
        .unwrap();

        assert!(result.blocks.is_empty());
        assert_eq!(result.shortfalls, vec![Shortfall::InsufficientTime { firm: firm_id }]);
    }

    #[test]
    fn test_unfittable_budget_reports_time_before_inputs() {
        // Smelt lacks its iron and does not fit the budget either. The
        // budget check runs first, so the report blames time alone and
        // never plans the inputs.
        let firm_id = fid();
        let mut firm = Firm::new(home(), 0.5).with_process(SMELT);
        let result = schedule_firm(
            0,
            firm_id,
            &mut firm,
            &catalog(),
            &prices(&[(STEEL, 10.0)]),
            1.0,
            &ScheduleConfig::default(),
        )
        .unwrap();

        assert!(result.blocks.is_empty());
        assert_eq!(result.shortfalls, vec![Shortfall::InsufficientTime { firm: firm_id }]);
    }

    #[test]
    fn test_want_input_consumes_cheapest_source() {
        let mut firm = Firm::new(home(), 2.2)
            .with_process(BURN)
            .with_stock(CHARCOAL, 10)
            .with_stock(OIL, 10);
        let result = run(&mut firm, &[(STEEL, 10.0)]);

        // Charcoal has the lower id, so it covers the fuel want at
        // ceil(1.0 / 0.5) = 2 units per run; oil is untouched.
        assert_eq!(result.blocks[0].runs, 2);
        assert_eq!(firm.inventory.quantity(CHARCOAL), 6);
        assert_eq!(firm.inventory.quantity(OIL), 10);
        assert_eq!(firm.staged, vec![StagedOutput { good: STEEL, quantity: 2 }]);
    }
}
