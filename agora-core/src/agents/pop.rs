use serde::{Deserialize, Serialize};

use crate::agents::inventory::Inventory;
use crate::desires::DesireLedger;
use crate::types::{GoodId, LocalityId, Quantity};

// === POP ===

/// A household-scale agent bound to one locality. Holds a desire ledger
/// that drives its bids and an inventory that receives what it wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pop {
    pub home: LocalityId,
    pub ledger: DesireLedger,
    pub inventory: Inventory,
    /// Time good units granted at each desire refresh. Unspent time is
    /// purged at end of turn, never banked.
    pub time_rate: Quantity,
}

impl Pop {
    pub fn new(home: LocalityId, ledger: DesireLedger) -> Self {
        Self {
            home,
            ledger,
            inventory: Inventory::new(),
            time_rate: 24,
        }
    }

    pub fn with_time_rate(mut self, time_rate: Quantity) -> Self {
        self.time_rate = time_rate;
        self
    }

    pub fn with_stock(mut self, good: GoodId, quantity: Quantity) -> Self {
        self.inventory.add(good, quantity);
        self
    }
}
