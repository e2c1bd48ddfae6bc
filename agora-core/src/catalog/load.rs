// Definition-file layer: serde shapes and conversion into the validated
// catalog. Structural faults surface as CatalogError at load time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::good::{GainMode, Good, GoodTag};
use super::process::{InputMode, ItemRef, Process};
use super::want::{EffectRef, Want};
use super::Catalog;
use crate::errors::CatalogError;
use crate::types::{ClassId, GoodId, ProcessId, Quantity, SpecificId, WantId};

fn default_unit() -> f64 {
    1.0
}

fn default_mode() -> InputMode {
    InputMode::Consume
}

/// Root of a catalog definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDef {
    /// The good granted to pops each turn and spent on satisfaction time.
    pub time_good: GoodId,
    pub goods: Vec<GoodDef>,
    #[serde(default)]
    pub wants: Vec<WantDef>,
    #[serde(default)]
    pub processes: Vec<ProcessDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodDef {
    pub id: GoodId,
    pub name: String,
    #[serde(default)]
    pub decay_turns: u32,
    #[serde(default)]
    pub decays_into: Option<DecayDef>,
    #[serde(default)]
    pub wealth: bool,
    #[serde(default)]
    pub satisfies: Vec<SatisfactionDef>,
    #[serde(default)]
    pub class: Option<ClassDef>,
    #[serde(default)]
    pub specific: Option<SpecificId>,
    #[serde(default)]
    pub tags: Vec<GoodTag>,
    #[serde(default = "default_unit")]
    pub bulk: f64,
    #[serde(default = "default_unit")]
    pub mass: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecayDef {
    pub target: GoodId,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SatisfactionDef {
    pub want: WantId,
    pub mode: GainMode,
    pub efficiency: f64,
    #[serde(default)]
    pub time_cost: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: ClassId,
    #[serde(default)]
    pub is_example: bool,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WantDef {
    pub id: WantId,
    pub name: String,
    #[serde(default)]
    pub direct: BTreeMap<String, f64>,
    #[serde(default)]
    pub indirect: Vec<EffectRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDef {
    pub id: ProcessId,
    pub name: String,
    pub time: f64,
    #[serde(default)]
    pub inputs: Vec<InputDef>,
    #[serde(default)]
    pub outputs: Vec<OutputDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InputDef {
    pub item: ItemRef,
    pub quantity: f64,
    #[serde(default = "default_mode")]
    pub mode: InputMode,
    #[serde(default)]
    pub excludable: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutputDef {
    pub item: ItemRef,
    pub quantity: f64,
}

impl GoodDef {
    fn into_good(self) -> Good {
        let mut good = Good::new(self.id, self.name).with_bulk_mass(self.bulk, self.mass);
        good.decay_turns = self.decay_turns;
        if let Some(decay) = self.decays_into {
            good = good.with_decay_into(self.decay_turns, decay.target, decay.ratio);
        }
        if self.wealth {
            good = good.with_wealth();
        }
        for sat in self.satisfies {
            good = good.with_want(sat.want, sat.mode, sat.efficiency, sat.time_cost);
        }
        if let Some(class) = self.class {
            good = match class.variant {
                Some(variant) if !class.is_example => good.with_class_variant(class.id, variant),
                _ => {
                    // Preserve inconsistent definitions so validation can
                    // reject them with a precise error.
                    good.satisfaction.class = Some(super::good::ClassMembership {
                        class: class.id,
                        is_example: class.is_example,
                        variant: class.variant,
                    });
                    good
                }
            };
        }
        if let Some(specific) = self.specific {
            good = good.with_specific(specific);
        }
        for tag in self.tags {
            good = good.with_tag(tag);
        }
        good
    }
}

impl WantDef {
    fn into_want(self) -> Want {
        let mut want = Want::new(self.id, self.name);
        want.direct = self.direct;
        want.indirect = self.indirect;
        want
    }
}

impl ProcessDef {
    fn into_process(self) -> Process {
        let mut process = Process::new(self.id, self.name, self.time);
        for input in self.inputs {
            process = if input.excludable {
                process.with_excludable_input(input.item, input.quantity, input.mode)
            } else {
                process.with_input(input.item, input.quantity, input.mode)
            };
        }
        for output in self.outputs {
            process = process.with_output(output.item, output.quantity);
        }
        process
    }
}

impl Catalog {
    /// Build a catalog from parsed definitions.
    pub fn from_defs(def: CatalogDef) -> Result<Self, CatalogError> {
        Catalog::new(
            def.goods.into_iter().map(GoodDef::into_good).collect(),
            def.wants.into_iter().map(WantDef::into_want).collect(),
            def.processes
                .into_iter()
                .map(ProcessDef::into_process)
                .collect(),
            def.time_good,
        )
    }

    /// Parse and validate a JSON definition file.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::from_defs(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_catalog_parses() {
        let json = r#"{
            "time_good": 0,
            "goods": [
                { "id": 0, "name": "Time", "tags": ["EndOfDayConsumed"] },
                { "id": 1, "name": "Bread", "decay_turns": 3, "wealth": true,
                  "satisfies": [
                    { "want": 1, "mode": "Consumption", "efficiency": 2.0, "time_cost": 1 }
                  ] }
            ],
            "wants": [ { "id": 1, "name": "Hunger" } ],
            "processes": [
                { "id": 1, "name": "Bake", "time": 2.0,
                  "inputs": [ { "item": { "good": 1 }, "quantity": 2 } ],
                  "outputs": [ { "item": { "good": 1 }, "quantity": 3 } ] }
            ]
        }"#;

        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.time_good(), GoodId(0));
        let bread = catalog.good(GoodId(1)).unwrap();
        assert_eq!(bread.decay_turns, 3);
        assert!(bread.satisfaction.wealth);
        let bake = catalog.process(ProcessId(1)).unwrap();
        assert_eq!(bake.inputs[0].mode, InputMode::Consume);
        assert!(!bake.inputs[0].excludable);
    }

    #[test]
    fn test_rejects_dangling_decay_target() {
        let json = r#"{
            "time_good": 0,
            "goods": [
                { "id": 0, "name": "Time", "tags": ["EndOfDayConsumed"] },
                { "id": 1, "name": "Bread", "decay_turns": 2,
                  "decays_into": { "target": 99, "ratio": 0.5 } }
            ]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DanglingDecayTarget { .. }));
    }

    #[test]
    fn test_rejects_fractional_good_quantity() {
        let json = r#"{
            "time_good": 0,
            "goods": [
                { "id": 0, "name": "Time", "tags": ["EndOfDayConsumed"] },
                { "id": 1, "name": "Bread" }
            ],
            "processes": [
                { "id": 1, "name": "Bake", "time": 1.0,
                  "inputs": [ { "item": { "good": 1 }, "quantity": 1.5 } ] }
            ]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::FractionalQuantity { .. }));
    }

    #[test]
    fn test_rejects_missing_time_good() {
        let json = r#"{
            "time_good": 7,
            "goods": [ { "id": 1, "name": "Bread" } ]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::MissingTimeGood { .. }));
    }

    #[test]
    fn test_rejects_storable_time_good() {
        let json = r#"{
            "time_good": 0,
            "goods": [ { "id": 0, "name": "Time" } ]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::TimeGoodNotTransient { .. }));
    }

    #[test]
    fn test_rejects_zero_time_process() {
        let json = r#"{
            "time_good": 0,
            "goods": [ { "id": 0, "name": "Time", "tags": ["EndOfDayConsumed"] } ],
            "processes": [ { "id": 1, "name": "Idle", "time": 0.0 } ]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::NonPositiveTime { .. }));
    }
}
