//! Fleet Spawner - staged world-entity construction pipeline
//!
//! Region population fills space around requested regions with asteroids;
//! vessel intake, hydration and assembly turn verified spawn commands into
//! fully equipped player vessels backed by an external record store. A tick
//! scheduler drives every stage at a fixed rate and flushes the results to
//! the simulation host.

pub mod core;
pub mod entity;
pub mod generation;
pub mod host;
pub mod population;
pub mod requests;
pub mod scheduler;
pub mod stage;
pub mod store;
pub mod vessel;
