//! Integration tests for the spawn pipeline
//!
//! These tests drive the full scheduler against the in-memory store and the
//! loopback host:
//! - Spawn commands become vessel entities (first-time and returning)
//! - Rejected commands get a negative response and no entity
//! - Region population is idempotent and paced at one request per tick
//! - A stalled record store defers vessels without losing them

use std::sync::Arc;

use fleet_spawner::core::config::Advancement;
use fleet_spawner::core::types::{DVec3, RegionCoords};
use fleet_spawner::core::PipelineConfig;
use fleet_spawner::entity::{Component, ComponentKind, FinishedEntity};
use fleet_spawner::host::{InboundEvent, LogLevel, LoopbackConnection, LoopbackHandle};
use fleet_spawner::population::PopulateRegionRequest;
use fleet_spawner::requests::{SpawnCommand, StaticVerifier};
use fleet_spawner::scheduler::Scheduler;
use fleet_spawner::store::MemoryStore;
use fleet_spawner::vessel::{VesselKey, MODULE_COLLECTION, RESOURCE_COLLECTION};
use serde_json::json;

const USER: &str = "AbCdEfGhIjKlMnOpQrSt";
const VESSEL: &str = "uvwxyz0123456789ABCD";

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.tick.budget_ms = 5;
    config.tick.stall_warning_ticks = 3;
    config.generation.seed = 99;
    config.spawn.seed = Some(99);
    config
}

fn pipeline(
    config: PipelineConfig,
    store: Arc<MemoryStore>,
) -> (Scheduler<MemoryStore, LoopbackConnection>, LoopbackHandle) {
    let credentials = StaticVerifier::new()
        .with("fresh", USER)
        .with("returning", format!("{}{}", USER, VESSEL))
        .with("garbled", "abc");
    let (connection, handle) = LoopbackConnection::new();
    let scheduler = Scheduler::new(config, store, Arc::new(credentials), connection).unwrap();
    (scheduler, handle)
}

fn vessels(handle: &LoopbackHandle) -> Vec<FinishedEntity> {
    handle
        .created()
        .into_iter()
        .filter(|e| e.entity_type() == Some("StarterShip"))
        .collect()
}

fn spawn(handle: &LoopbackHandle, credential: &str, attributes: &[&str]) -> SpawnCommand {
    let command = SpawnCommand::new(credential, "client-7", attributes);
    handle.send(InboundEvent::Spawn(command.clone()));
    command
}

// ============================================================================
// Vessel spawning
// ============================================================================

#[tokio::test]
async fn test_first_time_vessel_spawns_with_starter_kit() {
    let (mut scheduler, handle) = pipeline(config(), Arc::new(MemoryStore::new()));
    spawn(&handle, "fresh", &["client"]);

    scheduler.run_for(4).await.unwrap();

    let vessels = vessels(&handle);
    assert_eq!(vessels.len(), 1);
    let vessel = &vessels[0];

    let position = vessel.position().unwrap();
    assert!((position.length() - config().spawn.spawn_radius).abs() < 1e-6);
    assert!(matches!(
        vessel.get(ComponentKind::Modular),
        Some(Component::Modular(m)) if m.installed == vec![0, 1, 2]
    ));
    assert!(matches!(
        vessel.get(ComponentKind::Identification),
        Some(Component::Identification(id)) if id.user_id == USER && id.vessel_id.len() == 20
    ));
}

#[tokio::test]
async fn test_returning_vessel_rebuilt_from_store() {
    let store = Arc::new(MemoryStore::new());
    let reference = VesselKey {
        user_id: USER.into(),
        vessel_id: VESSEL.into(),
    }
    .reference();
    store.insert(&reference, json!({ "coords": [10.0, 20.0, 30.0] }));

    let modules = reference.collection(MODULE_COLLECTION);
    for (id, kind, properties) in [
        ("a", "sensor", json!([3, 100, 10])),
        ("b", "scanner", json!([1, 2, 3, -1])),
        ("c", "sampler", json!([64])),
    ] {
        store.insert(
            &modules.doc(id),
            json!({ "name": id, "type": kind, "properties": properties, "equip": true }),
        );
    }
    let nested = modules.doc("b").collection(RESOURCE_COLLECTION);
    store.insert(&nested.doc("r1"), json!({ "type": "ice", "quantity": 1 }));
    store.insert(&nested.doc("r2"), json!({ "type": "gold", "quantity": 2 }));
    store.insert(
        &reference.collection(RESOURCE_COLLECTION).doc("hull"),
        json!({ "type": "fuel", "quantity": 50 }),
    );

    let (mut scheduler, handle) = pipeline(config(), store);
    spawn(&handle, "returning", &["client"]);
    scheduler.run_for(4).await.unwrap();

    let vessels = vessels(&handle);
    assert_eq!(vessels.len(), 1);
    let vessel = &vessels[0];
    assert_eq!(vessel.position(), Some(DVec3::new(10.0, 20.0, 30.0)));

    let Some(Component::ModuleInventory(inventory)) = vessel.get(ComponentKind::ModuleInventory) else {
        panic!("returning vessel has no module inventory");
    };
    assert_eq!(inventory.modules.len(), 3);
    assert_eq!(inventory.module_resources[&1].len(), 2);
    assert!(inventory.module_resources[&0].is_empty());

    let Some(Component::ResourceInventory(hull)) = vessel.get(ComponentKind::ResourceInventory) else {
        panic!("returning vessel has no resource inventory");
    };
    assert_eq!(hull.resources.len(), 1);
    assert_eq!(hull.resources[&0].resource_type, "fuel");
}

#[tokio::test]
async fn test_every_spawn_command_gets_one_response() {
    let (mut scheduler, handle) = pipeline(config(), Arc::new(MemoryStore::new()));
    let commands = [
        spawn(&handle, "fresh", &["client"]),
        spawn(&handle, "fresh", &["game_logic"]),
        spawn(&handle, "unknown", &["client"]),
        spawn(&handle, "garbled", &["client"]),
    ];

    scheduler.run_for(4).await.unwrap();

    let responses = handle.responses();
    assert_eq!(responses.len(), commands.len());
    for (command, accepted) in commands.iter().zip([true, false, false, false]) {
        let response = responses
            .iter()
            .find(|r| r.request_id == command.request_id)
            .unwrap();
        assert_eq!(response.success, accepted);
    }
    assert_eq!(vessels(&handle).len(), 1);

    let warnings = handle
        .logs()
        .into_iter()
        .filter(|l| l.level == LogLevel::Warn && l.source == "SpawnRequests")
        .count();
    assert_eq!(warnings, 3);
}

// ============================================================================
// Region population
// ============================================================================

#[tokio::test]
async fn test_region_population_is_idempotent() {
    let config = config();
    let per_region = config.generation.candidate_density;
    let (mut scheduler, handle) = pipeline(config, Arc::new(MemoryStore::new()));

    for _ in 0..4 {
        handle.send(InboundEvent::PopulateRegion(PopulateRegionRequest::new(RegionCoords::new(3, -2))));
    }

    let first = scheduler.run_tick().await.unwrap();
    assert_eq!(first.population.as_ref().unwrap().generated.len(), 9);
    assert_eq!(first.flushed.entities, 9 * per_region);

    for _ in 0..3 {
        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.flushed.entities, 0);
        assert!(report.population.unwrap().generated.is_empty());
    }

    assert_eq!(handle.created().len(), 9 * per_region);
    assert_eq!(handle.responses().len(), 4);
    assert!(handle.responses().iter().all(|r| r.success));
}

#[tokio::test]
async fn test_first_tick_flushes_every_output_kind() {
    let (mut scheduler, handle) = pipeline(config(), Arc::new(MemoryStore::new()));
    handle.send(InboundEvent::PopulateRegion(PopulateRegionRequest::new(RegionCoords::new(0, 0))));

    let report = scheduler.run_tick().await.unwrap();
    assert_eq!(report.flushed.responses, 1);
    assert!(report.flushed.entities > 0);
    assert!(report.flushed.logs >= 1);
}

// ============================================================================
// Stalled store
// ============================================================================

#[tokio::test]
async fn test_stalled_store_defers_then_recovers() {
    let store = Arc::new(MemoryStore::new());
    store.set_available(false);
    let (mut scheduler, handle) = pipeline(config(), Arc::clone(&store));
    spawn(&handle, "fresh", &["client"]);
    spawn(&handle, "returning", &["client"]);

    for _ in 0..6 {
        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.flushed.entities, 0);
    }

    let stall_reports = handle
        .logs()
        .into_iter()
        .filter(|l| l.level == LogLevel::Error && l.source == "Hydration")
        .count();
    assert_eq!(stall_reports, 2);

    store.set_available(true);
    scheduler.run_for(4).await.unwrap();
    assert_eq!(vessels(&handle).len(), 2);
}

#[tokio::test]
async fn test_fetch_timeout_leaves_fast_store_unaffected() {
    let mut config = config();
    config.store.fetch_timeout_ms = Some(1);
    config.store.advancement = Advancement::PerItem;
    let store = Arc::new(MemoryStore::new());
    let (mut scheduler, handle) = pipeline(config, store);
    spawn(&handle, "fresh", &["client"]);

    scheduler.run_for(4).await.unwrap();
    assert_eq!(vessels(&handle).len(), 1);
}

#[tokio::test]
async fn test_disconnect_ends_run() {
    let (mut scheduler, handle) = pipeline(config(), Arc::new(MemoryStore::new()));
    spawn(&handle, "fresh", &["client"]);
    handle.disconnect("server shutdown");

    let ticks = scheduler.run().await.unwrap();
    assert_eq!(ticks, 1);
    assert_eq!(handle.disconnect_reason().as_deref(), Some("server shutdown"));
    assert_eq!(handle.responses().len(), 1);
}
