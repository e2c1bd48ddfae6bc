use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

// ============================================================================
// IDs - slotmap generational keys for agents, plain newtypes for the catalog
// ============================================================================

new_key_type! {
    pub struct PopId;
    pub struct FirmId;
    pub struct LocalityId;
}

/// Trait for folding slotmap keys into u64, used for seed derivation and
/// event fields.
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for PopId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for FirmId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for LocalityId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

// Catalog entries are cross-referenced from definition files, so their ids
// are stable integers chosen by the data author, not arena keys.

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GoodId(pub u32);

impl GoodId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WantId(pub u32);

impl WantId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

impl ProcessId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SpecificId(pub u32);

impl SpecificId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

// === TYPE ALIASES ===

/// Inventory units. Goods are atomic: quantities are whole, never negative.
pub type Quantity = u64;
pub type Price = f64;
pub type TimeUnits = f64;
pub type Turn = u64;
