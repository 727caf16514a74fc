//! Procedural placement geometry
//!
//! Everything here is a pure function of the region, the world seed and the
//! generation config, so it can be called from any number of rayon workers
//! without coordination.
//!
//! Placement happens in the horizontal plane: `DVec2::x` is world X and
//! `DVec2::y` is world Z.

pub mod correction;
pub mod sphere;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::{GenerationConfig, ANCHOR_MARGIN};
use crate::core::types::{DVec2, DVec3, RegionCoords};

pub use correction::correct;
pub use sphere::{point_on_sphere, random_point_on_sphere};

const ANCHOR_STREAM: u64 = 0xA4C4_0001;
const CANDIDATE_STREAM: u64 = 0xCA4D_0002;

/// Axis-aligned extent of one region (or a union of regions)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl RegionBounds {
    pub fn of(region: RegionCoords, region_size: f64) -> Self {
        let min = DVec2::new(region.x as f64, region.z as f64) * region_size;
        Self {
            min,
            max: min + DVec2::splat(region_size),
        }
    }

    /// Bounds of the square neighborhood around `center`
    pub fn of_neighborhood(center: RegionCoords, radius: i32, region_size: f64) -> Self {
        let low = Self::of(center.offset(-radius, -radius), region_size);
        let high = Self::of(center.offset(radius, radius), region_size);
        Self {
            min: low.min,
            max: high.max,
        }
    }

    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn clamp(&self, point: DVec2) -> DVec2 {
        point.clamp(self.min, self.max)
    }
}

/// Per-region anchor and candidate generation
#[derive(Debug, Clone)]
pub struct RegionGenerator {
    config: GenerationConfig,
}

impl RegionGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn bounds(&self, region: RegionCoords) -> RegionBounds {
        RegionBounds::of(region, self.config.region_size)
    }

    /// Anchor points of a region, always `anchor_count` long
    ///
    /// Anchors sit one per cell of a jittered lattice, each at least
    /// `min_separation * ANCHOR_MARGIN` inside its cell. That keeps every
    /// pair of anchors more than twice the separation apart, so `correct`
    /// resolves every candidate with a single push that stays in the region.
    pub fn anchors_for(&self, region: RegionCoords) -> Vec<DVec2> {
        let mut rng = region_rng(self.config.seed, region, ANCHOR_STREAM);
        let bounds = self.bounds(region);
        let dim = self.config.lattice_dim();
        let cell = self.config.lattice_cell();
        let margin = (self.config.min_separation * ANCHOR_MARGIN).min(cell / 2.0);

        (0..self.config.anchor_count)
            .map(|i| {
                let col = (i % dim) as f64;
                let row = (i / dim) as f64;
                let cell_min = bounds.min + DVec2::new(col * cell, row * cell);
                DVec2::new(
                    rng.gen_range(cell_min.x + margin..=cell_min.x + cell - margin),
                    rng.gen_range(cell_min.y + margin..=cell_min.y + cell - margin),
                )
            })
            .collect()
    }

    /// Raw candidate placements, uniform over the region
    pub fn candidates_for(&self, region: RegionCoords) -> Vec<DVec2> {
        let mut rng = region_rng(self.config.seed, region, CANDIDATE_STREAM);
        let bounds = self.bounds(region);

        (0..self.config.candidate_density)
            .map(|_| {
                DVec2::new(
                    rng.gen_range(bounds.min.x..bounds.max.x),
                    rng.gen_range(bounds.min.y..bounds.max.y),
                )
            })
            .collect()
    }

    /// Correct a candidate owned by `region` against that region's anchors
    pub fn correct(&self, region: RegionCoords, candidate: DVec2, anchors: &[DVec2]) -> Option<DVec2> {
        correct(candidate, anchors, self.config.min_separation, &self.bounds(region))
    }
}

/// Lift a planar placement into world space
pub fn to_world(point: DVec2) -> DVec3 {
    DVec3::new(point.x, 0.0, point.y)
}

/// Independent random stream per (seed, region, purpose)
pub(crate) fn region_rng(seed: u64, region: RegionCoords, stream: u64) -> ChaCha8Rng {
    let mut h = seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h = (h ^ (region.x as i64 as u64)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (region.z as i64 as u64)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    ChaCha8Rng::seed_from_u64(h)
}
