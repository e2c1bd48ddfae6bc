// Scoring knobs for the scheduler: process complexity and the engagement
// factor for partially-staffed invocations.

use serde::{Deserialize, Serialize};

use crate::catalog::Process;
use crate::types::TimeUnits;

// === COMPLEXITY ===

/// Rates how demanding a process is to coordinate. Only ever used as a
/// scoring divisor; it never gates whether a process can run. Every
/// variant must be non-decreasing in input count and in excludable count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityModel {
    /// 1 + per_input x inputs + per_excludable x excludables.
    Linear {
        per_input: f64,
        per_excludable: f64,
    },
    /// Every process rates 1.0; scoring reduces to value per time unit.
    Uniform,
}

impl Default for ComplexityModel {
    fn default() -> Self {
        Self::Linear {
            per_input: 0.1,
            per_excludable: 0.05,
        }
    }
}

impl ComplexityModel {
    pub fn rate(&self, process: &Process) -> f64 {
        match self {
            Self::Linear {
                per_input,
                per_excludable,
            } => {
                1.0 + per_input * process.input_count() as f64
                    + per_excludable * process.excludable_count() as f64
            }
            Self::Uniform => 1.0,
        }
    }
}

// === ENGAGEMENT ===

/// Output multiplier for one invocation: engaged inputs over total inputs.
/// Non-excludable inputs are always engaged (the run would not happen
/// otherwise); omitting excludables degrades output monotonically.
/// Input-less processes run at full output.
pub fn engagement_factor(required: usize, engaged_excludables: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (required + engaged_excludables) as f64 / total as f64
    }
}

// === CONFIG ===

/// Scheduler tuning shared by every firm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time charged on each entry into a new process block, including the
    /// first block of the turn.
    pub friction: TimeUnits,
    pub complexity: ComplexityModel,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            friction: 0.1,
            complexity: ComplexityModel::default(),
        }
    }
}
