//! Capability derivation from installed modules
//!
//! Every module carries a type tag and an opaque integer payload. The closed
//! set of [`ModuleType`]s decides how that payload decodes:
//!
//! - sensor: `[precision, range0, resolution0, range1, resolution1, ...]`
//! - scanner: `[speed, range, power, resource_filter]`
//! - sampler: `[capacity]`
//!
//! Unknown tags and malformed payloads contribute nothing.

use std::collections::BTreeMap;

use crate::entity::components::{
    Dimensionality, ModuleInfo, SamplerData, SamplerStat, ScannerData, ScannerStat, SensorData,
    SensorStat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleType {
    Sensor,
    Scanner,
    Sampler,
}

impl ModuleType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sensor" => Some(Self::Sensor),
            "scanner" => Some(Self::Scanner),
            "sampler" => Some(Self::Sampler),
            _ => None,
        }
    }
}

/// Decoded statistic block of one module
#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    Sensor(SensorStat),
    Scanner(ScannerStat),
    Sampler(SamplerStat),
}

impl Capability {
    pub fn decode(module_type: ModuleType, payload: &[i64]) -> Option<Self> {
        match module_type {
            ModuleType::Sensor => decode_sensor(payload).map(Self::Sensor),
            ModuleType::Scanner => decode_scanner(payload).map(Self::Scanner),
            ModuleType::Sampler => decode_sampler(payload).map(Self::Sampler),
        }
    }
}

fn narrow(value: i64) -> Option<i32> {
    i32::try_from(value).ok()
}

fn decode_sensor(payload: &[i64]) -> Option<SensorStat> {
    let (&precision, rest) = payload.split_first()?;
    if rest.len() % 2 != 0 {
        return None;
    }

    let dimensions = rest
        .chunks_exact(2)
        .map(|pair| {
            Some(Dimensionality {
                range: narrow(pair[0])?,
                resolution: narrow(pair[1])?,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    Some(SensorStat {
        precision: narrow(precision)?,
        dimensions,
    })
}

fn decode_scanner(payload: &[i64]) -> Option<ScannerStat> {
    match payload {
        [speed, range, power, resource_filter] => Some(ScannerStat {
            speed: narrow(*speed)?,
            range: narrow(*range)?,
            power: narrow(*power)?,
            resource_filter: narrow(*resource_filter)?,
        }),
        _ => None,
    }
}

fn decode_sampler(payload: &[i64]) -> Option<SamplerStat> {
    match payload {
        [capacity] => Some(SamplerStat {
            capacity: narrow(*capacity)?,
        }),
        _ => None,
    }
}

/// Capability components derived from a slot-keyed module inventory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub sensors: SensorData,
    pub scanners: ScannerData,
    pub samplers: SamplerData,
}

pub fn derive_capabilities(modules: &BTreeMap<u32, ModuleInfo>) -> Capabilities {
    let mut capabilities = Capabilities::default();

    for (&slot, module) in modules {
        let Some(module_type) = ModuleType::from_tag(&module.module_type) else {
            continue;
        };
        match Capability::decode(module_type, &module.properties) {
            Some(Capability::Sensor(stat)) => {
                capabilities.sensors.sensors.insert(slot, stat);
            }
            Some(Capability::Scanner(stat)) => {
                capabilities.scanners.scanners.insert(slot, stat);
            }
            Some(Capability::Sampler(stat)) => {
                capabilities.samplers.samplers.insert(slot, stat);
            }
            None => {
                tracing::debug!(
                    "Module {} in slot {} has a malformed {:?} payload",
                    module.id,
                    slot,
                    module_type
                );
            }
        }
    }

    capabilities
}
