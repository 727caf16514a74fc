//! Region population stage
//!
//! Turns "populate this region" requests into asteroid creation requests.
//! Each tick handles at most one request, expands it to its neighborhood,
//! claims the regions nobody generated yet, and runs the three data-parallel
//! passes: anchors and candidates per region, correction per candidate,
//! emission per corrected candidate.

use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::core::types::{DVec2, RegionCoords, RequestId};
use crate::entity::EntityTemplates;
use crate::generation::{to_world, RegionGenerator};
use crate::host::{CommandResponse, OutputSink};
use crate::stage::WorkQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateRegionRequest {
    pub request_id: RequestId,
    pub region: RegionCoords,
}

impl PopulateRegionRequest {
    pub fn new(region: RegionCoords) -> Self {
        Self {
            request_id: RequestId::new(),
            region,
        }
    }
}

/// Every region generated during this process's lifetime
///
/// Regions are only ever added. `claim` is the atomic test-and-insert that
/// guarantees a region is generated at most once.
#[derive(Debug, Default)]
pub struct PopulatedRegionSet {
    regions: Mutex<AHashSet<RegionCoords>>,
}

impl PopulatedRegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the caller now owns generation of `region`
    pub fn claim(&self, region: RegionCoords) -> bool {
        self.regions.lock().insert(region)
    }

    pub fn contains(&self, region: RegionCoords) -> bool {
        self.regions.lock().contains(&region)
    }

    pub fn len(&self) -> usize {
        self.regions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.lock().is_empty()
    }
}

/// Result of one population tick that dequeued a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationReport {
    pub request_id: RequestId,
    pub requested: RegionCoords,
    pub generated: Vec<RegionCoords>,
    pub placements: usize,
}

/// Candidate placement tagged with its owning region and its index there
struct Placement {
    region: usize,
    index: usize,
    position: DVec2,
}

pub struct RegionPopulationStage {
    requests: WorkQueue<PopulateRegionRequest>,
    populated: Arc<PopulatedRegionSet>,
    generator: RegionGenerator,
    templates: Arc<EntityTemplates>,
    sink: OutputSink,
}

impl RegionPopulationStage {
    pub fn new(
        generator: RegionGenerator,
        populated: Arc<PopulatedRegionSet>,
        templates: Arc<EntityTemplates>,
        sink: OutputSink,
    ) -> Self {
        Self {
            requests: WorkQueue::new(),
            populated,
            generator,
            templates,
            sink,
        }
    }

    /// Producer handle for inbound dispatch
    pub fn requests(&self) -> WorkQueue<PopulateRegionRequest> {
        self.requests.clone()
    }

    pub fn populated(&self) -> &PopulatedRegionSet {
        &self.populated
    }

    /// Run one tick: dequeue at most one request so worst-case tick cost is
    /// bounded no matter how deep the queue gets
    pub fn update(&self) -> Option<PopulationReport> {
        let request = self.requests.pop()?;
        let radius = self.generator.config().neighborhood_radius;

        let regions: Vec<RegionCoords> = request
            .region
            .neighborhood(radius)
            .into_iter()
            .filter(|region| self.populated.claim(*region))
            .collect();

        if regions.is_empty() {
            tracing::debug!("Region {:?} neighborhood already populated", request.region);
            self.sink.respond(CommandResponse::accepted(
                request.request_id,
                "neighborhood already populated",
            ));
            return Some(PopulationReport {
                request_id: request.request_id,
                requested: request.region,
                generated: Vec::new(),
                placements: 0,
            });
        }

        let placements = self.generate(&regions);
        let count = placements.len();

        tracing::debug!(
            "Populated {} regions around {:?} with {} placements",
            regions.len(),
            request.region,
            count
        );
        self.sink.respond(CommandResponse::accepted(
            request.request_id,
            format!("populated {} regions", regions.len()),
        ));

        Some(PopulationReport {
            request_id: request.request_id,
            requested: request.region,
            generated: regions,
            placements: count,
        })
    }

    fn generate(&self, regions: &[RegionCoords]) -> Vec<DVec2> {
        let generator = &self.generator;

        // PARALLEL: anchors and raw candidates, one output slot per region
        let seeded: Vec<(Vec<DVec2>, Vec<DVec2>)> = regions
            .par_iter()
            .map(|region| (generator.anchors_for(*region), generator.candidates_for(*region)))
            .collect();

        let (anchors, candidates): (Vec<_>, Vec<_>) = seeded.into_iter().unzip();

        let placements: Vec<Placement> = candidates
            .into_iter()
            .enumerate()
            .flat_map(|(region, positions)| {
                positions
                    .into_iter()
                    .enumerate()
                    .map(move |(index, position)| Placement { region, index, position })
            })
            .collect();

        // PARALLEL: correct each candidate against its region's anchors
        let placements: Vec<Placement> = placements
            .into_par_iter()
            .filter_map(|placement| {
                let corrected = generator.correct(
                    regions[placement.region],
                    placement.position,
                    &anchors[placement.region],
                );
                if corrected.is_none() {
                    tracing::debug!(
                        "Dropped candidate {} of {:?}: no clear point",
                        placement.index,
                        regions[placement.region]
                    );
                }
                corrected.map(|position| Placement { position, ..placement })
            })
            .collect();

        // PARALLEL: hand every placement to the sink
        placements.par_iter().for_each(|placement| {
            let draft = self.templates.asteroid(
                regions[placement.region],
                placement.index,
                to_world(placement.position),
            );
            self.sink.create_entity(draft.finish());
        });

        placements.into_iter().map(|p| p.position).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GenerationConfig;
    use crate::host::{output_channel, Outbound, OutputDrain};

    fn stage() -> (RegionPopulationStage, OutputDrain) {
        let (sink, drain) = output_channel();
        let stage = RegionPopulationStage::new(
            RegionGenerator::new(GenerationConfig::default()),
            Arc::new(PopulatedRegionSet::new()),
            Arc::new(EntityTemplates::new(1)),
            sink,
        );
        (stage, drain)
    }

    fn created(drain: &mut OutputDrain) -> usize {
        drain
            .take()
            .into_iter()
            .filter(|o| matches!(o, Outbound::CreateEntity(_)))
            .count()
    }

    #[test]
    fn test_repeated_requests_generate_once() {
        let (stage, mut drain) = stage();
        let density = GenerationConfig::default().candidate_density;
        let region = RegionCoords::new(4, 4);

        for _ in 0..5 {
            stage.requests().push(PopulateRegionRequest::new(region));
        }

        let first = stage.update().unwrap();
        assert_eq!(first.generated.len(), 9);
        assert_eq!(first.placements, 9 * density);
        assert_eq!(created(&mut drain), 9 * density);

        for _ in 0..4 {
            let report = stage.update().unwrap();
            assert!(report.generated.is_empty());
            assert_eq!(report.placements, 0);
        }
        assert_eq!(created(&mut drain), 0);
        assert_eq!(stage.populated().len(), 9);
    }

    #[test]
    fn test_one_request_per_tick() {
        let (stage, _drain) = stage();
        let queue = stage.requests();
        queue.push(PopulateRegionRequest::new(RegionCoords::new(0, 0)));
        queue.push(PopulateRegionRequest::new(RegionCoords::new(10, 0)));
        queue.push(PopulateRegionRequest::new(RegionCoords::new(20, 0)));

        let report = stage.update().unwrap();
        assert_eq!(report.requested, RegionCoords::new(0, 0));
        assert_eq!(queue.len(), 2);
        assert_eq!(stage.populated().len(), 9);
    }

    #[test]
    fn test_overlapping_neighborhood_only_generates_new_regions() {
        let (stage, _drain) = stage();
        stage.requests().push(PopulateRegionRequest::new(RegionCoords::new(0, 0)));
        stage.requests().push(PopulateRegionRequest::new(RegionCoords::new(1, 0)));

        stage.update();
        let second = stage.update().unwrap();

        assert_eq!(second.generated.len(), 3);
        assert!(second.generated.iter().all(|r| r.x == 2));
        assert_eq!(stage.populated().len(), 12);
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let (stage, mut drain) = stage();
        assert!(stage.update().is_none());
        assert!(drain.take().is_empty());
    }

    #[test]
    fn test_placements_keep_separation_from_own_anchors() {
        let (stage, _drain) = stage();
        let regions = vec![RegionCoords::new(0, 0)];
        assert!(stage.populated.claim(regions[0]));

        let positions = stage.generate(&regions);
        let anchors = stage.generator.anchors_for(regions[0]);
        let min_separation = stage.generator.config().min_separation;

        for position in positions {
            assert!(stage.generator.bounds(regions[0]).contains(position));
            for anchor in &anchors {
                assert!(position.distance(*anchor) >= min_separation);
            }
        }
    }

    #[test]
    fn test_emitted_variants_repeat_across_runs() {
        fn emitted(drain: &mut OutputDrain) -> Vec<(String, [u64; 3])> {
            let mut entities: Vec<_> = drain
                .take()
                .into_iter()
                .filter_map(|o| match o {
                    Outbound::CreateEntity(e) => Some((
                        e.entity_type()?.to_owned(),
                        e.position()?.to_array().map(f64::to_bits),
                    )),
                    _ => None,
                })
                .collect();
            entities.sort();
            entities
        }

        let (first, mut first_drain) = stage();
        let (second, mut second_drain) = stage();
        for stage in [&first, &second] {
            stage.requests().push(PopulateRegionRequest::new(RegionCoords::new(-3, 8)));
            stage.update();
        }

        let a = emitted(&mut first_drain);
        assert!(!a.is_empty());
        assert_eq!(a, emitted(&mut second_drain));
    }

    #[test]
    fn test_concurrent_claims_are_exclusive() {
        let set = Arc::new(PopulatedRegionSet::new());
        let wins: usize = (0..64)
            .into_par_iter()
            .map(|_| set.claim(RegionCoords::new(7, 7)) as usize)
            .sum();
        assert_eq!(wins, 1);
    }
}
