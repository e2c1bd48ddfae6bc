use serde::{Deserialize, Serialize};

use crate::types::{FirmId, GoodId, LocalityId, PopId, Price, Quantity, Turn};

// === SELLERS ===

/// Who stands behind an ask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seller {
    Pop(PopId),
    Firm(FirmId),
    /// The locality's injected-resource pool.
    Pool,
}

// === BOOK ENTRIES ===

/// Offered stock at an effective price (reservation plus surcharge, taxed).
/// `quantity` counts down as matches consume it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ask {
    pub seller: Seller,
    pub quantity: Quantity,
    pub price: Price,
}

/// One single-unit bid derived from a demand-list entry. Priority is
/// (weight, pop key, list position), ascending.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bid {
    pub pop: PopId,
    /// Index into the pop's desire ledger.
    pub desire: usize,
    pub weight: f64,
    pub position: usize,
    /// Willingness-to-pay: AMV times the marginal satisfaction rate.
    pub limit: Price,
    /// Time-good units the buyer pays at match time.
    pub time_cost: Quantity,
}

// === SETTLEMENTS ===

/// One committed trade.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub turn: Turn,
    pub locality: LocalityId,
    pub good: GoodId,
    pub seller: Seller,
    pub buyer: PopId,
    pub quantity: Quantity,
    /// Effective ask price, seller-determined.
    pub price: Price,
}
