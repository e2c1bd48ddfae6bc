// Want definitions: abstract desires satisfied through goods.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ClassId, GoodId, WantId};

/// Reference used by a want's indirect-effect table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectRef {
    Good(GoodId),
    Class(ClassId),
}

/// An abstract desire. Wants carry no cross-turn state: whatever
/// satisfaction accumulates during a turn is discarded at turn end.
#[derive(Clone, Debug, PartialEq)]
pub struct Want {
    pub id: WantId,
    pub name: String,
    /// Effect kind to signed magnitude, applied while the want is satisfied.
    pub direct: BTreeMap<String, f64>,
    /// Goods or classes this want's effects require to be present.
    pub indirect: Vec<EffectRef>,
}

impl Want {
    pub fn new(id: WantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            direct: BTreeMap::new(),
            indirect: Vec::new(),
        }
    }

    pub fn with_direct(mut self, kind: impl Into<String>, magnitude: f64) -> Self {
        self.direct.insert(kind.into(), magnitude);
        self
    }

    pub fn with_indirect(mut self, reference: EffectRef) -> Self {
        self.indirect.push(reference);
        self
    }
}
