//! Pipeline configuration with documented constants
//!
//! Every tunable that used to be a hard-coded constant lives here. The
//! defaults reproduce the reference behavior; a TOML file can override any
//! subset of them.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::{PipelineError, Result};

/// Anchors are kept this much further than the minimum separation from the
/// edges of their lattice cell, so a candidate pushed off an anchor never
/// lands outside its region or inside a neighboring anchor's exclusion disk.
pub const ANCHOR_MARGIN: f64 = 1.001;

/// Top-level configuration for the construction pipeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tick: TickConfig,
    pub generation: GenerationConfig,
    pub spawn: SpawnConfig,
    pub store: StoreConfig,
}

/// Cadence of the fixed-rate driver
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Wall-clock budget of one tick in milliseconds
    ///
    /// A tick finishing early sleeps out the remainder; a tick running over
    /// starts the next one immediately and logs a warning.
    pub budget_ms: u64,

    /// Consecutive deferred ticks before a stage is reported as stalled
    ///
    /// At the default budget (100ms), 50 ticks is five seconds of no
    /// progress against the record store.
    pub stall_warning_ticks: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            budget_ms: 100,
            stall_warning_ticks: 50,
        }
    }
}

/// Procedural region population
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// World seed mixed into every per-region random stream
    pub seed: u64,

    /// Edge length of one square region (world units)
    pub region_size: f64,

    /// Neighborhood radius in regions around a requested region
    ///
    /// 1 gives the 3x3 block; the neighborhood is generated together so
    /// correction near a region boundary never leaves visible seams.
    pub neighborhood_radius: i32,

    /// Anchor points per region
    ///
    /// Anchors are laid out on a jittered lattice of ceil(sqrt(n)) cells per
    /// axis, so 9 gives a 3x3 lattice.
    pub anchor_count: usize,

    /// Candidate placements drawn per region
    pub candidate_density: usize,

    /// Minimum distance between a corrected placement and every anchor of
    /// its region (world units)
    pub min_separation: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_F1EE7,
            region_size: 1000.0,
            neighborhood_radius: 1,
            anchor_count: 9,
            candidate_density: 16,
            min_separation: 60.0,
        }
    }
}

impl GenerationConfig {
    /// Lattice cells per axis used to spread the anchors
    pub fn lattice_dim(&self) -> usize {
        (self.anchor_count as f64).sqrt().ceil().max(1.0) as usize
    }

    /// Edge length of one anchor lattice cell
    pub fn lattice_cell(&self) -> f64 {
        self.region_size / self.lattice_dim() as f64
    }
}

/// Vessel spawning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Distance from the origin at which fresh vessels appear
    pub spawn_radius: f64,

    /// Characters of the identity token holding the user id
    pub user_id_len: usize,

    /// Characters following the user id holding the vessel id
    pub vessel_id_len: usize,

    /// Caller attribute required on spawn commands
    pub client_attribute: String,

    /// Seed for vessel id minting and spawn positions; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_radius: 2500.0,
            user_id_len: 20,
            vessel_id_len: 20,
            client_attribute: "client".into(),
            seed: None,
        }
    }
}

/// How a stage advances a batch whose fetches partially failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advancement {
    /// Nothing in the batch advances unless every fetch resolved
    #[default]
    Batch,
    /// Every item whose own fetches resolved advances; the rest stay pending
    PerItem,
}

/// External record store access
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on one stage's fetch graph; unbounded when absent
    pub fetch_timeout_ms: Option<u64>,

    pub advancement: Advancement,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick.budget_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.store.fetch_timeout_ms.map(Duration::from_millis)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let gen = &self.generation;

        if self.tick.budget_ms == 0 {
            return Err(PipelineError::Config("tick.budget_ms must be positive".into()));
        }

        if gen.anchor_count == 0 || gen.candidate_density == 0 {
            return Err(PipelineError::Config(
                "anchor_count and candidate_density must be positive".into(),
            ));
        }

        if gen.region_size <= 0.0 || gen.min_separation < 0.0 {
            return Err(PipelineError::Config(format!(
                "region_size ({}) must be positive and min_separation ({}) non-negative",
                gen.region_size, gen.min_separation
            )));
        }

        if gen.neighborhood_radius < 0 {
            return Err(PipelineError::Config("neighborhood_radius must be >= 0".into()));
        }

        // Anchors sit at least margin * separation inside their lattice cell
        let required = 2.0 * gen.min_separation * ANCHOR_MARGIN;
        if gen.lattice_cell() < required {
            return Err(PipelineError::Config(format!(
                "lattice cell ({:.1}) too small for min_separation ({}); need >= {:.1}",
                gen.lattice_cell(),
                gen.min_separation,
                required
            )));
        }

        if self.spawn.spawn_radius <= 0.0 {
            return Err(PipelineError::Config("spawn_radius must be positive".into()));
        }

        if self.spawn.user_id_len == 0 || self.spawn.vessel_id_len == 0 {
            return Err(PipelineError::Config("token segment lengths must be positive".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_budget(), Duration::from_millis(100));
        assert_eq!(config.generation.lattice_dim(), 3);
        assert!(config.fetch_timeout().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [generation]
            candidate_density = 4

            [store]
            fetch_timeout_ms = 250
            advancement = "per_item"
            "#,
        )
        .unwrap();

        assert_eq!(config.generation.candidate_density, 4);
        assert_eq!(config.generation.anchor_count, 9);
        assert_eq!(config.fetch_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.store.advancement, Advancement::PerItem);
        assert_eq!(config.spawn.spawn_radius, 2500.0);
    }

    #[test]
    fn test_separation_too_large_for_lattice() {
        let mut config = PipelineConfig::default();
        config.generation.min_separation = 200.0;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let result = PipelineConfig::from_toml_str("[tick]\nbudget_ms = 0\n");
        assert!(result.is_err());
    }
}
