use serde::{Deserialize, Serialize};

use crate::agents::inventory::Inventory;
use crate::types::{GoodId, LocalityId, ProcessId, Quantity, TimeUnits};

// === STAGED OUTPUT ===

/// Output produced this turn but held back from the market until the next.
/// The grace buffer is what stops a firm from trading goods it made in the
/// same turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedOutput {
    pub good: GoodId,
    pub quantity: Quantity,
}

// === FIRM ===

/// A producer bound to one locality. Runs processes under a fixed time
/// budget each turn and sells surplus through the local market.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Firm {
    pub home: LocalityId,
    /// Processes this firm can run, in configuration order.
    pub processes: Vec<ProcessId>,
    pub inventory: Inventory,
    /// Time available to the scheduler each turn.
    pub time_budget: TimeUnits,
    /// Friction charged in the most recent scheduling pass. Diagnostic,
    /// overwritten every turn.
    pub friction_spent: TimeUnits,
    /// Grace buffer, released at the start of the next turn.
    pub staged: Vec<StagedOutput>,
}

impl Firm {
    pub fn new(home: LocalityId, time_budget: TimeUnits) -> Self {
        Self {
            home,
            processes: Vec::new(),
            inventory: Inventory::new(),
            time_budget,
            friction_spent: 0.0,
            staged: Vec::new(),
        }
    }

    pub fn with_process(mut self, process: ProcessId) -> Self {
        self.processes.push(process);
        self
    }

    pub fn with_stock(mut self, good: GoodId, quantity: Quantity) -> Self {
        self.inventory.add(good, quantity);
        self
    }

    /// Move last turn's staged outputs into inventory as fresh stock.
    /// Returns what was released.
    pub fn release_staged(&mut self) -> Vec<StagedOutput> {
        let released = std::mem::take(&mut self.staged);
        for output in &released {
            self.inventory.add(output.good, output.quantity);
        }
        released
    }

    /// Queue output for release at the start of the next turn, merging
    /// with any already-staged quantity of the same good.
    pub fn stage(&mut self, good: GoodId, quantity: Quantity) {
        if quantity == 0 {
            return;
        }
        if let Some(existing) = self.staged.iter_mut().find(|s| s.good == good) {
            existing.quantity += quantity;
        } else {
            self.staged.push(StagedOutput { good, quantity });
        }
    }
}
