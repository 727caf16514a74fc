//! Component payloads attached to drafts
//!
//! These are opaque to the host boundary: a finished entity is shipped as a
//! bag of components and the host interprets them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::DVec3;

/// Stable key of each component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ComponentKind {
    Acl,
    Metadata,
    Position,
    Physical,
    Harvestable,
    ClientConnection,
    Identification,
    ExplorationPhysics,
    Mobile,
    FlightController,
    TriggerController,
    Damageable,
    Rechargeable,
    Modular,
    Sensor,
    Scanner,
    Sampler,
    ModuleInventory,
    ResourceInventory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Component {
    Acl(AclData),
    Metadata { entity_type: String },
    Position(DVec3),
    Physical(PhysicalData),
    Harvestable,
    ClientConnection,
    Identification(Identification),
    ExplorationPhysics,
    Mobile(MobileData),
    FlightController { action_bits: u32 },
    TriggerController,
    Damageable(DamageableData),
    Rechargeable(RechargeableData),
    Modular(ModularData),
    Sensor(SensorData),
    Scanner(ScannerData),
    Sampler(SamplerData),
    ModuleInventory(ModuleInventory),
    ResourceInventory(ResourceInventory),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Acl(_) => ComponentKind::Acl,
            Self::Metadata { .. } => ComponentKind::Metadata,
            Self::Position(_) => ComponentKind::Position,
            Self::Physical(_) => ComponentKind::Physical,
            Self::Harvestable => ComponentKind::Harvestable,
            Self::ClientConnection => ComponentKind::ClientConnection,
            Self::Identification(_) => ComponentKind::Identification,
            Self::ExplorationPhysics => ComponentKind::ExplorationPhysics,
            Self::Mobile(_) => ComponentKind::Mobile,
            Self::FlightController { .. } => ComponentKind::FlightController,
            Self::TriggerController => ComponentKind::TriggerController,
            Self::Damageable(_) => ComponentKind::Damageable,
            Self::Rechargeable(_) => ComponentKind::Rechargeable,
            Self::Modular(_) => ComponentKind::Modular,
            Self::Sensor(_) => ComponentKind::Sensor,
            Self::Scanner(_) => ComponentKind::Scanner,
            Self::Sampler(_) => ComponentKind::Sampler,
            Self::ModuleInventory(_) => ComponentKind::ModuleInventory,
            Self::ResourceInventory(_) => ComponentKind::ResourceInventory,
        }
    }
}

/// Who may read the entity and which worker owns each writable component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AclData {
    pub read: Vec<String>,
    pub write: BTreeMap<ComponentKind, String>,
}

/// Physics state; the position is packed as three little-endian f32s
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalData {
    pub encoded_position: Vec<u8>,
    pub speed: f32,
    pub angular_speed: f32,
}

impl PhysicalData {
    pub fn at(position: DVec3) -> Self {
        let mut encoded_position = Vec::with_capacity(12);
        for axis in [position.x, position.y, position.z] {
            encoded_position.extend_from_slice(&(axis as f32).to_le_bytes());
        }
        Self {
            encoded_position,
            speed: 0.0,
            angular_speed: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    pub user_id: String,
    pub vessel_id: String,
    pub caller_id: String,
}

/// Flight envelope of a hull
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobileData {
    pub max_speed: f32,
    pub max_turn_rate: f32,
    pub acceleration: f32,
    pub max_roll: f32,
    pub boost_speed: f32,
    pub drag: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DamageableData {
    pub damage: u32,
}

/// Energy bookkeeping per installed module, index-aligned with `module_ids`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RechargeableData {
    pub module_ids: Vec<u32>,
    pub drains_sustained: Vec<i32>,
    pub drains_left: Vec<i32>,
    pub drains_rates: Vec<i32>,
    pub use_drains_total: Vec<i32>,
    pub use_drains_rate: Vec<i32>,
    pub thresholds: Vec<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum HullClass {
    #[default]
    Starter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModularData {
    /// Module slots currently installed
    pub installed: Vec<u32>,
    pub hull: HullClass,
}

/// One detection band of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensionality {
    pub range: i32,
    pub resolution: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorStat {
    pub precision: i32,
    pub dimensions: Vec<Dimensionality>,
}

/// Scanner filter value matching any resource type
pub const ANY_RESOURCE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScannerStat {
    pub speed: i32,
    pub range: i32,
    pub power: i32,
    pub resource_filter: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplerStat {
    pub capacity: i32,
}

/// Capability components, keyed by module slot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorData {
    pub sensors: BTreeMap<u32, SensorStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScannerData {
    pub scanners: BTreeMap<u32, ScannerStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SamplerData {
    pub samplers: BTreeMap<u32, SamplerStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    pub module_type: String,
    pub creator: String,
    pub properties: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInfo {
    pub id: String,
    pub resource_type: String,
    pub quantity: i64,
}

/// Installed and stored modules plus the resources each one holds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleInventory {
    pub modules: BTreeMap<u32, ModuleInfo>,
    pub module_resources: BTreeMap<u32, Vec<ResourceInfo>>,
}

/// Resources held directly by the vessel's hull
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceInventory {
    pub resources: BTreeMap<u32, ResourceInfo>,
}
