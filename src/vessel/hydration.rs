//! Vessel hydration stage
//!
//! Resolves new-versus-returning for every pending vessel with one batched
//! store fetch and recovers the stored position. Records are correlated with
//! snapshots by document reference, never by position in the batch.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::Advancement;
use crate::core::types::DVec3;
use crate::entity::templates::{add_starter_kit, set_starting_position};
use crate::generation::random_point_on_sphere;
use crate::stage::{StageStatus, WorkQueue};
use crate::store::{DocumentRef, DocumentSnapshot, RecordStore};
use crate::vessel::{with_timeout, VesselOrigin, VesselRecord, VesselState, POSITION_FIELD};

pub struct HydrationStage<S> {
    store: Arc<S>,
    inbox: WorkQueue<VesselRecord>,
    pending: Vec<VesselRecord>,
    assembly: WorkQueue<VesselRecord>,
    rng: ChaCha8Rng,
    spawn_radius: f64,
    timeout: Option<Duration>,
    advancement: Advancement,
}

impl<S: RecordStore> HydrationStage<S> {
    pub fn new(
        store: Arc<S>,
        assembly: WorkQueue<VesselRecord>,
        spawn_radius: f64,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            store,
            inbox: WorkQueue::new(),
            pending: Vec::new(),
            assembly,
            rng,
            spawn_radius,
            timeout: None,
            advancement: Advancement::Batch,
        }
    }

    pub fn with_fetch_policy(mut self, timeout: Option<Duration>, advancement: Advancement) -> Self {
        self.timeout = timeout;
        self.advancement = advancement;
        self
    }

    /// Producer handle for intake
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

        let refs: Vec<DocumentRef> = self.pending.iter().map(|r| r.reference.clone()).collect();
        let batch_ref = refs[0].clone();
        let fetched = with_timeout(self.store.get_all(&refs), self.timeout, &batch_ref).await;

        let snapshots = match fetched {
            Ok(snapshots) => snapshots,
            Err(e) => {
                tracing::warn!("Hydration deferred {} vessels: {}", self.pending.len(), e);
                return StageStatus::Deferred {
                    pending: self.pending.len(),
                    reason: e.to_string(),
                };
            }
        };

        let by_reference: AHashMap<DocumentRef, DocumentSnapshot> = snapshots
            .into_iter()
            .map(|snapshot| (snapshot.reference.clone(), snapshot))
            .collect();

        let unresolved = self
            .pending
            .iter()
            .filter(|r| !by_reference.contains_key(&r.reference))
            .count();
        if unresolved > 0 && self.advancement == Advancement::Batch {
            tracing::warn!("Hydration deferred batch: {} vessels missing from fetch", unresolved);
            return StageStatus::Deferred {
                pending: self.pending.len(),
                reason: format!("{} references unresolved", unresolved),
            };
        }

        let mut advanced = Vec::with_capacity(self.pending.len());
        let mut still_pending = Vec::new();
        for mut record in self.pending.drain(..) {
            // Duplicate references share one snapshot
            match by_reference.get(&record.reference) {
                Some(snapshot) => {
                    hydrate(&mut record, snapshot, &mut self.rng, self.spawn_radius);
                    advanced.push(record);
                }
                None => still_pending.push(record),
            }
        }
        self.pending = still_pending;

        let count = advanced.len();
        self.assembly.extend(advanced);

        if self.pending.is_empty() {
            StageStatus::Advanced(count)
        } else {
            tracing::warn!("Hydration kept {} unresolved vessels pending", self.pending.len());
            StageStatus::Deferred {
                pending: self.pending.len(),
                reason: format!("{} advanced, {} unresolved", count, self.pending.len()),
            }
        }
    }
}

/// Apply a resolved snapshot to its record
fn hydrate(record: &mut VesselRecord, snapshot: &DocumentSnapshot, rng: &mut ChaCha8Rng, spawn_radius: f64) {
    if !snapshot.exists {
        set_starting_position(&mut record.draft, random_point_on_sphere(rng, spawn_radius));
        add_starter_kit(&mut record.draft);
        record.origin = Some(VesselOrigin::Fresh);
    } else {
        let position = match snapshot.get_as::<[f64; 3]>(POSITION_FIELD) {
            Some(xyz) => DVec3::from_array(xyz),
            None => {
                tracing::debug!(
                    "Vessel {} has no usable '{}' field; using random spawn",
                    record.reference,
                    POSITION_FIELD
                );
                random_point_on_sphere(rng, spawn_radius)
            }
        };
        set_starting_position(&mut record.draft, position);
        record.origin = Some(VesselOrigin::Returning);
    }

    record.state = VesselState::Hydrated;
}
