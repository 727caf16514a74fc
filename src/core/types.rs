//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use glam::{DVec2, DVec3};

/// Unique identifier for finished entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier correlating an inbound command with its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler tick counter
pub type Tick = u64;

/// Integer coordinates of one spatial region
///
/// Regions tile the horizontal plane; `x` runs along world X and `z` along
/// world Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionCoords {
    pub x: i32,
    pub z: i32,
}

impl RegionCoords {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Square block of regions centered on this one, row by row
    pub fn neighborhood(&self, radius: i32) -> Vec<RegionCoords> {
        (-radius..=radius)
            .flat_map(|dz| (-radius..=radius).map(move |dx| self.offset(dx, dz)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    #[test]
    fn test_region_equality_and_hash() {
        let mut set = AHashSet::new();
        assert!(set.insert(RegionCoords::new(3, -2)));
        assert!(!set.insert(RegionCoords::new(3, -2)));
        assert_ne!(RegionCoords::new(3, -2), RegionCoords::new(-2, 3));
    }

    #[test]
    fn test_neighborhood_is_three_by_three() {
        let center = RegionCoords::new(10, 10);
        let cells = center.neighborhood(1);
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&center));
        assert!(cells.contains(&RegionCoords::new(9, 9)));
        assert!(cells.contains(&RegionCoords::new(11, 11)));

        let unique: AHashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn test_zero_radius_is_just_the_region() {
        assert_eq!(RegionCoords::new(0, 0).neighborhood(0), vec![RegionCoords::new(0, 0)]);
    }
}
