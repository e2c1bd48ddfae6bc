// Error taxonomy: fatal configuration errors, fatal logic errors, and
// non-fatal per-turn shortfalls.

use thiserror::Error;

use crate::types::{ClassId, FirmId, GoodId, LocalityId, ProcessId, Quantity, WantId};

/// Malformed catalog definitions. Fatal: the simulation never starts.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog definitions: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate good id {0:?}")]
    DuplicateGood(GoodId),
    #[error("duplicate want id {0:?}")]
    DuplicateWant(WantId),
    #[error("duplicate process id {0:?}")]
    DuplicateProcess(ProcessId),
    #[error("good {good:?} decays into unknown good {target:?}")]
    DanglingDecayTarget { good: GoodId, target: GoodId },
    #[error("good {good:?} has a non-positive or out-of-range decay ratio {ratio}")]
    InvalidDecayRatio { good: GoodId, ratio: f64 },
    #[error("good {good:?} references unknown want {want:?}")]
    DanglingWantRef { good: GoodId, want: WantId },
    #[error("process {process:?} input {index} references an unknown item")]
    DanglingProcessInput { process: ProcessId, index: usize },
    #[error("process {process:?} output {index} references an unknown item")]
    DanglingProcessOutput { process: ProcessId, index: usize },
    #[error("process {process:?} input {index} has a fractional good quantity {quantity}")]
    FractionalQuantity {
        process: ProcessId,
        index: usize,
        quantity: f64,
    },
    #[error("process {process:?} slot {index} has non-positive quantity {quantity}")]
    NonPositiveQuantity {
        process: ProcessId,
        index: usize,
        quantity: f64,
    },
    #[error("want {want:?} indirect effect {index} references an unknown item")]
    DanglingEffectRef { want: WantId, index: usize },
    #[error("process {process:?} has non-positive time cost {time}")]
    NonPositiveTime { process: ProcessId, time: f64 },
    #[error("class {class:?} has members but no example good")]
    MissingClassExample { class: ClassId },
    #[error("class {class:?} declares more than one example good")]
    DuplicateClassExample { class: ClassId },
    #[error("good {good:?} is a class example but carries a variant name")]
    ExampleWithVariant { good: GoodId },
    #[error("good {good:?} belongs to class {class:?} without a variant name")]
    MissingVariant { good: GoodId, class: ClassId },
    #[error("designated time good {good:?} is not defined")]
    MissingTimeGood { good: GoodId },
    #[error("time good {good:?} must carry the EndOfDayConsumed tag")]
    TimeGoodNotTransient { good: GoodId },
}

/// Malformed desire configuration. Fatal at Pop creation: the whole Pop is
/// rejected, the caller may retry with a corrected profile.
#[derive(Debug, Error, PartialEq)]
pub enum DesireConfigError {
    #[error("desire starting weight {value} is not a finite number")]
    NonFiniteWeight { value: f64 },
    #[error("desire step interval {value} is not a finite number")]
    NonFiniteStep { value: f64 },
    #[error("finite desire created with zero remaining quantity")]
    EmptyFinite,
}

/// Negative-quantity arithmetic. Inventories never go below zero; a caller
/// that would drive one negative has a logic fault and the turn call fails.
#[derive(Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("withdrawal of {requested} exceeds stock {available} for good {good:?}")]
    Underflow {
        good: GoodId,
        requested: Quantity,
        available: Quantity,
    },
}

/// Fatal failure inside a turn. Turns never partially commit: on error the
/// caller should discard the world state and retry from a checkpoint.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("inventory fault during {phase}: {source}")]
    Inventory {
        phase: &'static str,
        #[source]
        source: InventoryError,
    },
    #[error("agent references unknown locality")]
    MissingLocality,
    #[error("market references an agent that no longer exists")]
    MissingAgent,
}

/// Non-fatal per-turn diagnostics. Accumulated into the turn report and
/// logged; they never stop the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Shortfall {
    #[error("firm {firm:?} skipped process {process:?}: inputs unavailable")]
    Scheduling { firm: FirmId, process: ProcessId },
    #[error("firm {firm:?} cannot fit any process into its time budget")]
    InsufficientTime { firm: FirmId },
    #[error("{unmet_bids} bids for good {good:?} in locality {locality:?} found no asks")]
    Liquidity {
        locality: LocalityId,
        good: GoodId,
        unmet_bids: u32,
    },
}
