// Process definitions: transformation recipes run by firms.

use serde::{Deserialize, Serialize};

use crate::types::{GoodId, ProcessId, TimeUnits, WantId};

/// Item reference in a process input or output slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRef {
    Good(GoodId),
    Want(WantId),
}

/// Whether an input survives the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    /// Withdrawn from inventory per run.
    Consume,
    /// Must be present, is not withdrawn (a tool).
    Use,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessInput {
    pub item: ItemRef,
    /// Integral for good references; want magnitudes may be fractional.
    pub quantity: f64,
    pub mode: InputMode,
    /// Excludable inputs may be omitted at reduced output.
    pub excludable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessOutput {
    pub item: ItemRef,
    pub quantity: f64,
}

/// A transformation recipe. Inputs are ordered; outputs obey a one-turn
/// grace before they become tradable or usable.
#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub inputs: Vec<ProcessInput>,
    pub outputs: Vec<ProcessOutput>,
    /// Duration of one run, in time units.
    pub time: TimeUnits,
}

impl Process {
    pub fn new(id: ProcessId, name: impl Into<String>, time: TimeUnits) -> Self {
        Self {
            id,
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            time,
        }
    }

    pub fn with_input(mut self, item: ItemRef, quantity: f64, mode: InputMode) -> Self {
        self.inputs.push(ProcessInput {
            item,
            quantity,
            mode,
            excludable: false,
        });
        self
    }

    pub fn with_excludable_input(mut self, item: ItemRef, quantity: f64, mode: InputMode) -> Self {
        self.inputs.push(ProcessInput {
            item,
            quantity,
            mode,
            excludable: true,
        });
        self
    }

    pub fn with_output(mut self, item: ItemRef, quantity: f64) -> Self {
        self.outputs.push(ProcessOutput { item, quantity });
        self
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn excludable_count(&self) -> usize {
        self.inputs.iter().filter(|i| i.excludable).count()
    }

    pub fn required_count(&self) -> usize {
        self.inputs.len() - self.excludable_count()
    }
}
