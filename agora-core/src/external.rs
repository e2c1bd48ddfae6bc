// External collaborators: transport surcharges from the territory layer,
// tax rates from the institution layer, and resource injections queued by
// either. All consulted by the market clearer, never mutated by it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{GoodId, LocalityId, Price, Quantity};

/// Per-route shipping surcharge added to an ask's price when pool stock
/// sells away from its origin.
#[derive(Debug, Clone, Default)]
pub struct TransportTable {
    surcharges: HashMap<(GoodId, LocalityId, LocalityId), Price>,
}

impl TransportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surcharge(
        mut self,
        good: GoodId,
        origin: LocalityId,
        destination: LocalityId,
        surcharge: Price,
    ) -> Self {
        self.surcharges.insert((good, origin, destination), surcharge);
        self
    }

    /// Zero when no rule matches. Local sales are always surcharge-free.
    pub fn surcharge(&self, good: GoodId, origin: LocalityId, destination: LocalityId) -> Price {
        if origin == destination {
            return 0.0;
        }
        self.surcharges
            .get(&(good, origin, destination))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Ad valorem rate applied multiplicatively to settlement prices.
#[derive(Debug, Clone, Default)]
pub struct TaxTable {
    rates: HashMap<(LocalityId, GoodId), f64>,
}

impl TaxTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, locality: LocalityId, good: GoodId, rate: f64) -> Self {
        self.rates.insert((locality, good), rate);
        self
    }

    pub fn rate(&self, locality: LocalityId, good: GoodId) -> f64 {
        self.rates.get(&(locality, good)).copied().unwrap_or(0.0)
    }
}

/// One queued delivery into a locality pool, applied at the grace-release
/// phase of the next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInjection {
    pub locality: LocalityId,
    pub good: GoodId,
    pub quantity: Quantity,
    /// Where the stock came from; selling it here pays the route
    /// surcharge. `None` means locally sourced.
    pub origin: Option<LocalityId>,
}
