use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::Price;

/// Entries kept in each market's AMV ring.
pub const AMV_HISTORY: usize = 32;

// === MARKET STATE ===

/// Per-(good, locality) price signal. Created the first turn the good is
/// quoted here, then persists indefinitely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Abstract market value: quantity-weighted mean of the latest
    /// clearing's settlement prices, sticky across tradeless turns.
    pub amv: Price,
    /// Recent post-clearing AMVs, newest last.
    pub history: VecDeque<Price>,
    /// Imbalance signal from the previous clearing, in [-1, 1]. Positive
    /// means excess bids. Applied to the AMV at the start of the next
    /// clearing, then reset.
    pub pressure: f64,
}

impl MarketState {
    pub fn new(initial: Price) -> Self {
        Self {
            amv: initial,
            history: VecDeque::new(),
            pressure: 0.0,
        }
    }

    /// Ring-push the post-clearing AMV.
    pub fn record(&mut self, amv: Price) {
        self.amv = amv;
        if self.history.len() == AMV_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(amv);
    }
}

// === CONFIG ===

/// Clearing tuning shared by every locality.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarketConfig {
    /// AMV assigned when a good is first quoted in a locality.
    pub initial_amv: Price,
    /// Sellers reserve at this fraction of AMV.
    pub reservation_ratio: f64,
    /// Lower bound for reservation prices and pressured AMVs.
    pub price_floor: Price,
    /// Largest per-turn relative AMV move the pressure signal can cause.
    pub pressure_rate: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            initial_amv: 1.0,
            reservation_ratio: 0.9,
            price_floor: 0.01,
            pressure_rate: 0.05,
        }
    }
}
