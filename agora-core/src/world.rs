// World state: agent arenas, localities with their pools and markets, and
// queued external injections. The world is the checkpoint; everything
// needed to resume at the next turn boundary serializes from here, while
// the catalog and configuration travel separately as read-only inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::agents::{Firm, Inventory, Pop};
use crate::desires::{DesireLedger, DesireProfile};
use crate::errors::DesireConfigError;
use crate::external::ResourceInjection;
use crate::market::MarketState;
use crate::types::{FirmId, GoodId, LocalityId, PopId, Price, Quantity, Turn};

// === LOCALITY ===

/// The smallest unit with an independent market. Holds the shared
/// injected-resource pool and one market state per quoted good.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Locality {
    pub name: String,
    /// Injected stock, sold on behalf of no particular agent.
    pub pool: Inventory,
    /// Origin of pooled stock, consulted for transport surcharges.
    pub pool_origins: BTreeMap<GoodId, LocalityId>,
    pub markets: BTreeMap<GoodId, MarketState>,
}

impl Locality {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pool: Inventory::new(),
            pool_origins: BTreeMap::new(),
            markets: BTreeMap::new(),
        }
    }

    pub fn amv(&self, good: GoodId) -> Option<Price> {
        self.markets.get(&good).map(|m| m.amv)
    }
}

// === WORLD ===

/// Complete mutable state of the simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    pub turn: Turn,
    pub localities: SlotMap<LocalityId, Locality>,
    pub pops: SlotMap<PopId, Pop>,
    pub firms: SlotMap<FirmId, Firm>,
    /// Deliveries applied at the next grace-release phase.
    pub pending_injections: Vec<ResourceInjection>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            turn: 0,
            localities: SlotMap::with_key(),
            pops: SlotMap::with_key(),
            firms: SlotMap::with_key(),
            pending_injections: Vec::new(),
        }
    }

    // === Locality Management ===

    /// Add a locality, returns its key.
    pub fn add_locality(&mut self, name: impl Into<String>) -> LocalityId {
        self.localities.insert(Locality::new(name))
    }

    pub fn get_locality(&self, id: LocalityId) -> Option<&Locality> {
        self.localities.get(id)
    }

    pub fn get_locality_mut(&mut self, id: LocalityId) -> Option<&mut Locality> {
        self.localities.get_mut(id)
    }

    // === Pop Management ===

    /// Validate a desire profile and install the pop. A malformed profile
    /// rejects the whole pop.
    pub fn add_pop(
        &mut self,
        home: LocalityId,
        profile: &DesireProfile,
        time_rate: Quantity,
    ) -> Result<PopId, DesireConfigError> {
        let ledger = DesireLedger::from_profile(profile, self.turn)?;
        Ok(self
            .pops
            .insert(Pop::new(home, ledger).with_time_rate(time_rate)))
    }

    pub fn get_pop(&self, id: PopId) -> Option<&Pop> {
        self.pops.get(id)
    }

    pub fn get_pop_mut(&mut self, id: PopId) -> Option<&mut Pop> {
        self.pops.get_mut(id)
    }

    // === Firm Management ===

    pub fn add_firm(&mut self, firm: Firm) -> FirmId {
        self.firms.insert(firm)
    }

    pub fn get_firm(&self, id: FirmId) -> Option<&Firm> {
        self.firms.get(id)
    }

    pub fn get_firm_mut(&mut self, id: FirmId) -> Option<&mut Firm> {
        self.firms.get_mut(id)
    }

    // === External Inflow ===

    /// Queue a delivery into a locality pool. Applied at the next turn's
    /// grace-release phase, so injected stock is tradable one turn later.
    pub fn inject_resources(&mut self, injection: ResourceInjection) {
        self.pending_injections.push(injection);
    }

    // === Checkpointing ===

    pub fn checkpoint_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_checkpoint_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desires::DesireTarget;
    use crate::types::WantId;

    const HUNGER: WantId = WantId(1);
    const GRAIN: GoodId = GoodId(1);

    #[test]
    fn test_add_agents() {
        let mut world = World::new();
        let agora = world.add_locality("Agora");

        let pop = world
            .add_pop(agora, &DesireProfile::new().with_want(HUNGER, 1.0), 24)
            .unwrap();
        let firm = world.add_firm(Firm::new(agora, 10.0).with_stock(GRAIN, 5));

        assert_eq!(world.get_pop(pop).unwrap().home, agora);
        assert_eq!(world.get_pop(pop).unwrap().ledger.len(), 2);
        assert_eq!(world.get_firm(firm).unwrap().inventory.quantity(GRAIN), 5);
        assert_eq!(world.get_locality(agora).unwrap().name, "Agora");
    }

    #[test]
    fn test_bad_profile_rejects_pop() {
        let mut world = World::new();
        let agora = world.add_locality("Agora");

        let err = world
            .add_pop(
                agora,
                &DesireProfile::new().with_desire(DesireTarget::Want(HUNGER), 1.0, 0.0, Some(0)),
                24,
            )
            .unwrap_err();
        assert_eq!(err, DesireConfigError::EmptyFinite);
        assert!(world.pops.is_empty());
    }

    #[test]
    fn test_checkpoint_round_trips() {
        let mut world = World::new();
        let agora = world.add_locality("Agora");
        world
            .add_pop(agora, &DesireProfile::new().with_want(HUNGER, 1.0), 24)
            .unwrap();
        world.add_firm(Firm::new(agora, 10.0).with_stock(GRAIN, 5));
        world.inject_resources(ResourceInjection {
            locality: agora,
            good: GRAIN,
            quantity: 3,
            origin: None,
        });
        world.turn = 7;

        let json = world.checkpoint_json().unwrap();
        let restored = World::from_checkpoint_json(&json).unwrap();
        assert_eq!(restored.turn, 7);
        assert_eq!(restored.pops.len(), 1);
        assert_eq!(restored.pending_injections.len(), 1);
        assert_eq!(restored.checkpoint_json().unwrap(), json);
    }
}
