//! Vessel assembly stage
//!
//! Joins a returning vessel's stored modules and resources into inventory
//! and capability components, then hands the finished entity to the sink.
//!
//! Per vessel the fetches form a small dependency graph:
//!
//! ```text
//!   A: list modules ──► B: list resources of every module (fan-out)
//!   C: list vessel resources                                  │
//!   └──────────────────────── barrier {A, B*, C} ◄───────────┘
//! ```
//!
//! C starts together with A; B launches only once A has resolved.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use futures::future::{join_all, try_join_all};
use serde::Deserialize;

use crate::core::config::Advancement;
use crate::core::error::{PipelineError, Result};
use crate::entity::components::{
    Component, DamageableData, HullClass, ModularData, ModuleInfo, ModuleInventory, ResourceInfo,
    ResourceInventory,
};
use crate::host::OutputSink;
use crate::stage::{StageStatus, WorkQueue};
use crate::store::{DocumentRef, DocumentSnapshot, RecordStore};
use crate::vessel::capability::derive_capabilities;
use crate::vessel::{
    with_timeout, VesselOrigin, VesselRecord, VesselState, MODULE_COLLECTION, RESOURCE_COLLECTION,
};

/// Stored module document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ModuleRecord {
    name: String,
    #[serde(rename = "type")]
    module_type: String,
    creator: String,
    properties: Vec<i64>,
    equip: bool,
}

/// Stored resource document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ResourceRecord {
    #[serde(rename = "type")]
    resource_type: String,
    quantity: i64,
}

/// Everything fetched for one vessel
#[derive(Debug, Clone, Default)]
pub struct VesselTree {
    /// Graph A, ordered by module id
    pub modules: Vec<DocumentSnapshot>,
    /// Graph B, keyed by module id
    pub module_resources: AHashMap<String, Vec<DocumentSnapshot>>,
    /// Graph C
    pub resources: Vec<DocumentSnapshot>,
}

pub async fn fetch_vessel_tree<S: RecordStore>(store: &S, vessel: &DocumentRef) -> Result<VesselTree> {
    let modules_collection = vessel.collection(MODULE_COLLECTION);
    let resources_collection = vessel.collection(RESOURCE_COLLECTION);

    let modules_then_nested = async {
        let modules = store.list(&modules_collection).await?;
        let nested = try_join_all(modules.iter().map(|module| {
            let collection = module.reference.collection(RESOURCE_COLLECTION);
            async move {
                let resources = store.list(&collection).await?;
                Ok::<_, PipelineError>((module.id().to_owned(), resources))
            }
        }))
        .await?;
        Ok::<_, PipelineError>((modules, nested.into_iter().collect::<AHashMap<_, _>>()))
    };
    let vessel_resources = store.list(&resources_collection);

    let ((modules, module_resources), resources) =
        futures::try_join!(modules_then_nested, vessel_resources)?;

    Ok(VesselTree {
        modules,
        module_resources,
        resources,
    })
}

fn resource_info(snapshot: &DocumentSnapshot) -> Option<ResourceInfo> {
    let record: ResourceRecord = snapshot.decode()?;
    Some(ResourceInfo {
        id: snapshot.id().to_owned(),
        resource_type: record.resource_type,
        quantity: record.quantity,
    })
}

fn resource_list(snapshots: &[DocumentSnapshot]) -> Vec<ResourceInfo> {
    snapshots.iter().filter_map(resource_info).collect()
}

/// Attach the stored loadout to a returning vessel's draft
///
/// Slots are list positions: the n-th module (by id) lives in slot n, and the
/// same goes for vessel resources. Documents that fail to decode leave their
/// slot empty.
pub fn apply_tree(record: &mut VesselRecord, tree: &VesselTree) {
    let mut inventory = ModuleInventory::default();
    let mut installed = Vec::new();

    for (slot, snapshot) in (0u32..).zip(&tree.modules) {
        let Some(module) = snapshot.decode::<ModuleRecord>() else {
            tracing::debug!("Skipping malformed module {}", snapshot.reference);
            continue;
        };

        if module.equip {
            installed.push(slot);
        }

        let nested = tree
            .module_resources
            .get(snapshot.id())
            .map(|snapshots| resource_list(snapshots.as_slice()))
            .unwrap_or_default();
        inventory.module_resources.insert(slot, nested);
        inventory.modules.insert(
            slot,
            ModuleInfo {
                id: snapshot.id().to_owned(),
                name: module.name,
                module_type: module.module_type,
                creator: module.creator,
                properties: module.properties,
            },
        );
    }

    let resources: BTreeMap<u32, ResourceInfo> = (0u32..)
        .zip(&tree.resources)
        .filter_map(|(slot, snapshot)| resource_info(snapshot).map(|info| (slot, info)))
        .collect();

    let capabilities = derive_capabilities(&inventory.modules);

    let draft = &mut record.draft;
    draft.add(Component::Damageable(DamageableData::default()));
    draft.add(Component::Modular(ModularData {
        installed,
        hull: HullClass::Starter,
    }));
    draft.add(Component::ModuleInventory(inventory));
    draft.add(Component::ResourceInventory(ResourceInventory { resources }));
    draft.add(Component::Sensor(capabilities.sensors));
    draft.add(Component::Scanner(capabilities.scanners));
    draft.add(Component::Sampler(capabilities.samplers));
}

pub struct AssemblyStage<S> {
    store: Arc<S>,
    inbox: WorkQueue<VesselRecord>,
    pending: Vec<VesselRecord>,
    sink: OutputSink,
    timeout: Option<Duration>,
    advancement: Advancement,
}

impl<S: RecordStore> AssemblyStage<S> {
    pub fn new(store: Arc<S>, sink: OutputSink) -> Self {
        Self {
            store,
            inbox: WorkQueue::new(),
            pending: Vec::new(),
            sink,
            timeout: None,
            advancement: Advancement::Batch,
        }
    }

    pub fn with_fetch_policy(mut self, timeout: Option<Duration>, advancement: Advancement) -> Self {
        self.timeout = timeout;
        self.advancement = advancement;
        self
    }

    /// Producer handle for hydration
    pub fn inbox(&self) -> WorkQueue<VesselRecord> {
        self.inbox.clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub async fn update(&mut self) -> StageStatus {
        self.pending.extend(self.inbox.drain());
        if self.pending.is_empty() {
            return StageStatus::Idle;
        }

        let store = &*self.store;
        let timeout = self.timeout;

        // Fresh vessels keep their starter kit and never touch the store
        let fetches = self
            .pending
            .iter()
            .filter(|record| record.origin == Some(VesselOrigin::Returning))
            .map(|record| async move {
                let tree = with_timeout(
                    fetch_vessel_tree(store, &record.reference),
                    timeout,
                    &record.reference,
                )
                .await;
                (record.reference.clone(), tree)
            });

        let mut trees: AHashMap<DocumentRef, VesselTree> = AHashMap::new();
        let mut failures: Vec<PipelineError> = Vec::new();
        for (reference, tree) in join_all(fetches).await {
            match tree {
                Ok(tree) => {
                    trees.insert(reference, tree);
                }
                Err(e) => failures.push(e),
            }
        }

        if !failures.is_empty() && self.advancement == Advancement::Batch {
            tracing::warn!(
                "Assembly deferred {} vessels: {} fetch graphs failed, first: {}",
                self.pending.len(),
                failures.len(),
                failures[0]
            );
            return StageStatus::Deferred {
                pending: self.pending.len(),
                reason: failures[0].to_string(),
            };
        }

        let mut emitted = 0;
        let mut still_pending = Vec::new();
        for mut record in self.pending.drain(..) {
            let ready = match record.origin {
                Some(VesselOrigin::Returning) => match trees.get(&record.reference) {
                    Some(tree) => {
                        apply_tree(&mut record, tree);
                        true
                    }
                    None => false,
                },
                _ => true,
            };

            if !ready {
                still_pending.push(record);
                continue;
            }

            record.state = VesselState::Assembled;
            tracing::debug!("Assembled vessel {}", record.reference);
            self.sink.create_entity(record.emit());
            emitted += 1;
        }
        self.pending = still_pending;

        if self.pending.is_empty() {
            StageStatus::Advanced(emitted)
        } else {
            tracing::warn!("Assembly kept {} vessels pending", self.pending.len());
            StageStatus::Deferred {
                pending: self.pending.len(),
                reason: match failures.first() {
                    Some(e) => e.to_string(),
                    None => "unresolved fetch graph".into(),
                },
            }
        }
    }
}
