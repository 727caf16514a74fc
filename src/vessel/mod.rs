//! Vessel construction: intake, hydration and assembly
//!
//! A [`VesselRecord`] is created by intake and then owned by exactly one
//! stage at a time. Handing a record to the next stage means pushing it into
//! that stage's [`WorkQueue`](crate::stage::WorkQueue); the sender keeps no
//! copy.

pub mod assembly;
pub mod capability;
pub mod hydration;
pub mod intake;
pub mod token;

use std::future::Future;
use std::time::Duration;

use crate::core::error::{PipelineError, Result};
use crate::entity::{EntityDraft, FinishedEntity};
use crate::store::DocumentRef;

pub use assembly::AssemblyStage;
pub use hydration::HydrationStage;
pub use intake::{IntakeRequest, IntakeStage};
pub use token::{SpawnToken, TokenLayout};

pub const USER_COLLECTION: &str = "users";
pub const VESSEL_COLLECTION: &str = "vessels";
pub const MODULE_COLLECTION: &str = "modules";
pub const RESOURCE_COLLECTION: &str = "resources";

/// Stored position field of a vessel document: `[x, y, z]`
pub const POSITION_FIELD: &str = "coords";

/// Stable identity of a vessel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VesselKey {
    pub user_id: String,
    pub vessel_id: String,
}

impl VesselKey {
    pub fn reference(&self) -> DocumentRef {
        DocumentRef::root(USER_COLLECTION, &self.user_id)
            .collection(VESSEL_COLLECTION)
            .doc(&self.vessel_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesselState {
    New,
    Hydrated,
    Assembled,
    Emitted,
}

/// Whether the store already knew the vessel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesselOrigin {
    /// No stored record; the draft carries the starter kit
    Fresh,
    /// Stored record found; modules and resources come from the store
    Returning,
}

#[derive(Debug)]
pub struct VesselRecord {
    pub key: VesselKey,
    pub reference: DocumentRef,
    pub draft: EntityDraft,
    pub state: VesselState,
    pub origin: Option<VesselOrigin>,
}

impl VesselRecord {
    pub fn new(key: VesselKey, draft: EntityDraft) -> Self {
        let reference = key.reference();
        Self {
            key,
            reference,
            draft,
            state: VesselState::New,
            origin: None,
        }
    }

    /// Seal the draft for the output sink, leaving an empty draft behind
    pub fn emit(&mut self) -> FinishedEntity {
        self.state = VesselState::Emitted;
        std::mem::take(&mut self.draft).finish()
    }
}

/// Bound a fetch by the configured timeout, if any
pub(crate) async fn with_timeout<T>(
    fetch: impl Future<Output = Result<T>>,
    timeout: Option<Duration>,
    reference: &DocumentRef,
) -> Result<T> {
    match timeout {
        None => fetch.await,
        Some(after) => tokio::time::timeout(after, fetch)
            .await
            .unwrap_or_else(|_| {
                Err(PipelineError::FetchTimedOut {
                    reference: reference.to_string(),
                    after,
                })
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_from_key() {
        let key = VesselKey {
            user_id: "u".repeat(20),
            vessel_id: "v".repeat(20),
        };
        let record = VesselRecord::new(key.clone(), EntityDraft::new());
        assert_eq!(
            record.reference.path(),
            format!("users/{}/vessels/{}", key.user_id, key.vessel_id)
        );
        assert_eq!(record.state, VesselState::New);
        assert!(record.origin.is_none());
    }

    #[test]
    fn test_emit_hands_over_draft() {
        let key = VesselKey {
            user_id: "u".repeat(20),
            vessel_id: "v".repeat(20),
        };
        let mut draft = EntityDraft::new();
        draft.add(crate::entity::Component::Harvestable);
        let mut record = VesselRecord::new(key, draft);
        record.state = VesselState::Assembled;

        let finished = record.emit();
        assert!(finished.contains(crate::entity::ComponentKind::Harvestable));
        assert_eq!(record.state, VesselState::Emitted);
        assert!(record.draft.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_reports_reference() {
        let reference = DocumentRef::root("users", "slow");
        let result: Result<()> = with_timeout(
            std::future::pending(),
            Some(Duration::from_millis(5)),
            &reference,
        )
        .await;

        match result {
            Err(PipelineError::FetchTimedOut { reference, .. }) => assert_eq!(reference, "users/slow"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
