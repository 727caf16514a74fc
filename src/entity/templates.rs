//! Initial component sets for freshly created entities

use std::collections::BTreeMap;

use rand::Rng;

use crate::core::types::{DVec3, RegionCoords};
use crate::entity::components::*;
use crate::entity::EntityDraft;
use crate::generation::region_rng;

const ASTEROID_VARIANTS: [&str; 6] = [
    "Asteroid1", "Asteroid2", "Asteroid3", "Asteroid4", "Asteroid5", "Asteroid6",
];

pub const STARTER_SHIP: &str = "StarterShip";

/// Flight controller value meaning "no input"
pub const FLIGHT_IDLE_BITS: u32 = 21;

const ASTEROID_WORKER: &str = "asteroid";
const SHIP_WORKER: &str = "ship";
const GAME_LOGIC_WORKER: &str = "game_logic";
const CLIENT_WORKER: &str = "client";

const VARIANT_STREAM: u64 = 0x7A41_0003;

/// Template factory
///
/// Shared between the population stage (called from rayon workers) and the
/// vessel stages. Holds no mutable state.
pub struct EntityTemplates {
    seed: u64,
}

impl EntityTemplates {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Visual variant of the `index`th placement in `region`
    pub fn asteroid_variant(&self, region: RegionCoords, index: usize) -> &'static str {
        let stream = VARIANT_STREAM.wrapping_add(index as u64);
        let mut rng = region_rng(self.seed, region, stream);
        ASTEROID_VARIANTS[rng.gen_range(0..ASTEROID_VARIANTS.len())]
    }

    pub fn asteroid(&self, region: RegionCoords, index: usize, position: DVec3) -> EntityDraft {
        let variant = self.asteroid_variant(region, index);

        let write = [
            ComponentKind::Acl,
            ComponentKind::Metadata,
            ComponentKind::Position,
            ComponentKind::Harvestable,
        ]
        .into_iter()
        .map(|kind| (kind, ASTEROID_WORKER.to_owned()))
        .collect();

        let mut draft = EntityDraft::new();
        draft.add(Component::Acl(AclData {
            read: vec![ASTEROID_WORKER.into(), GAME_LOGIC_WORKER.into(), CLIENT_WORKER.into()],
            write,
        }));
        draft.add(Component::Position(position));
        draft.add(Component::Metadata {
            entity_type: variant.into(),
        });
        draft.add(Component::Harvestable);
        draft
    }

    /// Identity and controller components of a vessel entering the pipeline
    pub fn scout_vessel(&self, user_id: &str, vessel_id: &str, caller_id: &str) -> EntityDraft {
        let client = format!("workerId:{}", caller_id);

        let mut write: BTreeMap<ComponentKind, String> = [
            ComponentKind::Acl,
            ComponentKind::Metadata,
            ComponentKind::Identification,
            ComponentKind::Mobile,
            ComponentKind::Damageable,
            ComponentKind::Rechargeable,
            ComponentKind::Modular,
            ComponentKind::Sensor,
            ComponentKind::Scanner,
            ComponentKind::Sampler,
            ComponentKind::ModuleInventory,
            ComponentKind::ResourceInventory,
        ]
        .into_iter()
        .map(|kind| (kind, SHIP_WORKER.to_owned()))
        .collect();
        for kind in [
            ComponentKind::Position,
            ComponentKind::Physical,
            ComponentKind::ExplorationPhysics,
        ] {
            write.insert(kind, GAME_LOGIC_WORKER.into());
        }
        for kind in [
            ComponentKind::ClientConnection,
            ComponentKind::FlightController,
            ComponentKind::TriggerController,
        ] {
            write.insert(kind, client.clone());
        }

        let mut draft = EntityDraft::new();
        draft.add(Component::Acl(AclData {
            read: vec![SHIP_WORKER.into(), GAME_LOGIC_WORKER.into(), CLIENT_WORKER.into()],
            write,
        }));
        draft.add(Component::Metadata {
            entity_type: STARTER_SHIP.into(),
        });
        draft.add(Component::ClientConnection);
        draft.add(Component::Identification(Identification {
            user_id: user_id.into(),
            vessel_id: vessel_id.into(),
            caller_id: caller_id.into(),
        }));
        draft.add(Component::ExplorationPhysics);
        draft.add(Component::Mobile(default_mobile()));
        draft.add(Component::FlightController {
            action_bits: FLIGHT_IDLE_BITS,
        });
        draft.add(Component::TriggerController);
        draft
    }
}

fn default_mobile() -> MobileData {
    use std::f32::consts::PI;

    MobileData {
        max_speed: 55.0,
        max_turn_rate: PI / 13.0,
        acceleration: 0.0,
        max_roll: PI / 8.0,
        boost_speed: 34.0,
        drag: 0.0,
    }
}

pub fn set_starting_position(draft: &mut EntityDraft, position: DVec3) {
    draft.add(Component::Position(position));
    draft.add(Component::Physical(PhysicalData::at(position)));
}

/// Loadout of a vessel with no stored record: sensor, scanner and sampler
/// in slots 0, 1 and 2, all installed
pub fn add_starter_kit(draft: &mut EntityDraft) {
    draft.add(Component::Damageable(DamageableData::default()));

    draft.add(Component::Rechargeable(RechargeableData {
        module_ids: vec![0, 1, 2],
        drains_sustained: vec![0; 3],
        drains_left: vec![0; 3],
        drains_rates: vec![0; 3],
        use_drains_total: vec![30_000; 3],
        use_drains_rate: vec![30_000; 3],
        thresholds: vec![0; 3],
    }));

    draft.add(Component::Modular(ModularData {
        installed: vec![0, 1, 2],
        hull: HullClass::Starter,
    }));

    draft.add(Component::Sensor(SensorData {
        sensors: BTreeMap::from([(
            0,
            SensorStat {
                precision: 10,
                dimensions: vec![
                    Dimensionality { range: 1000, resolution: 250 },
                    Dimensionality { range: 360, resolution: 45 },
                ],
            },
        )]),
    }));

    draft.add(Component::Scanner(ScannerData {
        scanners: BTreeMap::from([(
            1,
            ScannerStat {
                speed: 100,
                range: 100,
                power: 200,
                resource_filter: ANY_RESOURCE,
            },
        )]),
    }));

    draft.add(Component::Sampler(SamplerData {
        samplers: BTreeMap::from([(2, SamplerStat { capacity: 100 })]),
    }));
}
