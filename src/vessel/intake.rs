//! Vessel intake stage
//!
//! Converts verified spawn tokens into store references and identity drafts.
//! Only verified identities ever reach this stage, so it has no failure path.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::entity::EntityTemplates;
use crate::stage::WorkQueue;
use crate::vessel::{SpawnToken, TokenLayout, VesselKey, VesselRecord};

#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub token: SpawnToken,
    pub caller_id: String,
}

pub struct IntakeStage {
    requests: WorkQueue<IntakeRequest>,
    hydration: WorkQueue<VesselRecord>,
    layout: TokenLayout,
    templates: Arc<EntityTemplates>,
    rng: ChaCha8Rng,
}

impl IntakeStage {
    pub fn new(
        layout: TokenLayout,
        templates: Arc<EntityTemplates>,
        hydration: WorkQueue<VesselRecord>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            requests: WorkQueue::new(),
            hydration,
            layout,
            templates,
            rng,
        }
    }

    /// Producer handle for the request verifier
    pub fn requests(&self) -> WorkQueue<IntakeRequest> {
        self.requests.clone()
    }

    /// Build the record for one verified token
    pub fn intake(&mut self, token: &SpawnToken, caller_id: &str) -> VesselRecord {
        let user_id = token.user_id().to_owned();
        let vessel_id = match token.vessel_id() {
            Some(id) => id.to_owned(),
            None => self.layout.mint_vessel_id(&mut self.rng),
        };

        let draft = self.templates.scout_vessel(&user_id, &vessel_id, caller_id);
        VesselRecord::new(VesselKey { user_id, vessel_id }, draft)
    }

    /// Intake every queued request and hand the records to hydration
    pub fn update(&mut self) -> usize {
        let requests = self.requests.drain();
        if requests.is_empty() {
            return 0;
        }

        let records: Vec<_> = requests
            .iter()
            .map(|request| self.intake(&request.token, &request.caller_id))
            .collect();
        let count = records.len();

        tracing::debug!("Intake produced {} vessel records", count);
        self.hydration.extend(records);
        count
    }
}
