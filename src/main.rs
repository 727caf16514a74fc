//! Fleet Spawner - demo driver
//!
//! Runs the construction pipeline against an in-memory record store and a
//! loopback host. A handful of scripted commands are queued before the first
//! tick: one region population request, a first-time vessel, a returning
//! vessel with a stored loadout, and a spawn from a non-client caller.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::runtime::Runtime;

use fleet_spawner::core::error::Result;
use fleet_spawner::core::types::RegionCoords;
use fleet_spawner::core::PipelineConfig;
use fleet_spawner::host::{InboundEvent, LoopbackConnection, LoopbackHandle};
use fleet_spawner::population::PopulateRegionRequest;
use fleet_spawner::requests::{SpawnCommand, StaticVerifier};
use fleet_spawner::scheduler::Scheduler;
use fleet_spawner::store::MemoryStore;
use fleet_spawner::vessel::{VesselKey, MODULE_COLLECTION, RESOURCE_COLLECTION};

const NEW_PILOT: &str = "NewPilot000000000001";
const VETERAN: &str = "VeteranPilot00000002";
const VETERAN_SHIP: &str = "OldFaithful000000001";

/// Fleet Spawner - staged entity construction demo
#[derive(Parser, Debug)]
#[command(name = "fleet-spawner")]
#[command(about = "Run the spawn pipeline against an in-memory store and host")]
struct Args {
    /// TOML configuration file; defaults apply when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run before disconnecting
    #[arg(long, default_value_t = 10)]
    ticks: u64,

    /// Seed for region generation and vessel spawning
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_spawner=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.generation.seed = seed;
        config.spawn.seed = Some(seed);
    }

    tracing::info!("Fleet Spawner starting...");

    let store = Arc::new(seeded_store());
    let credentials = Arc::new(
        StaticVerifier::new()
            .with("new-pilot", NEW_PILOT)
            .with("veteran", format!("{}{}", VETERAN, VETERAN_SHIP)),
    );
    let (connection, handle) = LoopbackConnection::new();
    script_commands(&handle);

    let rt = Runtime::new()?;
    let ticks = rt.block_on(async {
        let mut scheduler = Scheduler::new(config, store, credentials, connection)?;
        let ticks = scheduler.run_for(args.ticks).await?;
        handle.disconnect("demo finished");
        scheduler.run_tick().await?;
        Ok::<_, fleet_spawner::core::PipelineError>(ticks + 1)
    })?;

    print_summary(&handle, ticks);
    Ok(())
}

/// Store with one returning vessel: a sensor and a sampler holding ore
fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    let vessel = VesselKey {
        user_id: VETERAN.into(),
        vessel_id: VETERAN_SHIP.into(),
    }
    .reference();

    store.insert(&vessel, json!({ "coords": [120.0, -40.0, 880.0] }));

    let modules = vessel.collection(MODULE_COLLECTION);
    store.insert(
        &modules.doc("eye"),
        json!({ "name": "Long Eye", "type": "sensor", "creator": "yard", "properties": [12, 2000, 200], "equip": true }),
    );
    store.insert(
        &modules.doc("hold"),
        json!({ "name": "Ore Hold", "type": "sampler", "creator": "yard", "properties": [250], "equip": true }),
    );
    store.insert(
        &modules.doc("hold").collection(RESOURCE_COLLECTION).doc("ore"),
        json!({ "type": "iron", "quantity": 42 }),
    );
    store.insert(
        &vessel.collection(RESOURCE_COLLECTION).doc("fuel"),
        json!({ "type": "fuel", "quantity": 900 }),
    );
    store
}

fn script_commands(handle: &LoopbackHandle) {
    handle.send(InboundEvent::PopulateRegion(PopulateRegionRequest::new(RegionCoords::new(0, 0))));
    handle.send(InboundEvent::PopulateRegion(PopulateRegionRequest::new(RegionCoords::new(1, 0))));
    handle.send(InboundEvent::Spawn(SpawnCommand::new("new-pilot", "client-1", &["client"])));
    handle.send(InboundEvent::Spawn(SpawnCommand::new("veteran", "client-2", &["client"])));
    handle.send(InboundEvent::Spawn(SpawnCommand::new("veteran", "logic-1", &["game_logic"])));
}

fn print_summary(handle: &LoopbackHandle, ticks: u64) {
    let created = handle.created();
    let responses = handle.responses();
    let vessels = created
        .iter()
        .filter(|e| e.entity_type() == Some("StarterShip"))
        .count();

    println!("\n=== FLEET SPAWNER ===");
    println!("Ticks run:         {}", ticks);
    println!("Entities created:  {}", created.len());
    println!("  asteroids:       {}", created.len() - vessels);
    println!("  vessels:         {}", vessels);
    println!(
        "Responses:         {} ({} accepted)",
        responses.len(),
        responses.iter().filter(|r| r.success).count()
    );
    println!("Host log messages: {}", handle.logs().len());
    if let Some(reason) = handle.disconnect_reason() {
        println!("Disconnected:      {}", reason);
    }
}
