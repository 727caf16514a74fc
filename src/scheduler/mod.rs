//! Tick scheduler
//!
//! Drives every stage once per tick at a fixed rate:
//!
//! 1. pull inbound events from the host and dispatch them to stage queues
//! 2. verify spawn commands and run vessel intake
//! 3. run hydration and assembly concurrently with region population
//!    (population is CPU-bound and runs on the blocking pool)
//! 4. flush the output sink to the host
//!
//! then sleep out the remaining budget, or warn and continue at once when
//! the tick ran over.

pub mod health;
pub mod ticker;

use std::sync::Arc;
use std::time::Instant;

use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::types::Tick;
use crate::entity::EntityTemplates;
use crate::generation::RegionGenerator;
use crate::host::{
    output_channel, FlushCounts, HostConnection, InboundEvent, LogLevel, LogMessage, OutputDrain,
    OutputSink,
};
use crate::population::{PopulatedRegionSet, PopulationReport, RegionPopulationStage};
use crate::requests::{CredentialVerifier, RequestVerifier, VerifyCounts};
use crate::stage::StageStatus;
use crate::store::RecordStore;
use crate::vessel::{AssemblyStage, HydrationStage, IntakeStage, TokenLayout};

pub use health::StageHealth;
pub use ticker::{TickTiming, Ticker};

const LOG_SOURCE: &str = "Spawner";
const LOOP_SOURCE: &str = "Game Loop";

/// What one tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub verified: VerifyCounts,
    pub intake: usize,
    pub hydration: StageStatus,
    pub assembly: StageStatus,
    pub population: Option<PopulationReport>,
    pub flushed: FlushCounts,
    /// Set when the host asked to disconnect during this tick
    pub disconnect: Option<String>,
}

pub struct Scheduler<S: RecordStore, C: HostConnection> {
    connection: C,
    ticker: Ticker,
    tick: Tick,
    sink: OutputSink,
    drain: OutputDrain,
    verifier: RequestVerifier<dyn CredentialVerifier>,
    intake: IntakeStage,
    hydration: HydrationStage<S>,
    assembly: AssemblyStage<S>,
    population: Arc<RegionPopulationStage>,
    populated: Arc<PopulatedRegionSet>,
    hydration_health: StageHealth,
    assembly_health: StageHealth,
    disconnect: Option<String>,
}

impl<S: RecordStore, C: HostConnection> Scheduler<S, C> {
    /// Build every stage and wire their queues together
    pub fn new(
        config: PipelineConfig,
        store: Arc<S>,
        credentials: Arc<dyn CredentialVerifier>,
        connection: C,
    ) -> Result<Self> {
        let started = Instant::now();
        config.validate()?;

        let (sink, drain) = output_channel();
        let templates = Arc::new(EntityTemplates::new(config.generation.seed));
        let timeout = config.fetch_timeout();
        let advancement = config.store.advancement;

        let assembly = AssemblyStage::new(Arc::clone(&store), sink.clone())
            .with_fetch_policy(timeout, advancement);
        let hydration = HydrationStage::new(
            Arc::clone(&store),
            assembly.inbox(),
            config.spawn.spawn_radius,
            config.spawn.seed,
        )
        .with_fetch_policy(timeout, advancement);
        let intake = IntakeStage::new(
            TokenLayout::from_config(&config.spawn),
            Arc::clone(&templates),
            hydration.inbox(),
            config.spawn.seed.map(|seed| seed.wrapping_add(1)),
        );
        let verifier = RequestVerifier::new(&config.spawn, credentials, intake.requests(), sink.clone());

        let populated = Arc::new(PopulatedRegionSet::new());
        let population = Arc::new(RegionPopulationStage::new(
            RegionGenerator::new(config.generation.clone()),
            Arc::clone(&populated),
            templates,
            sink.clone(),
        ));

        let stall_ticks = config.tick.stall_warning_ticks;
        let scheduler = Self {
            connection,
            ticker: Ticker::new(config.tick_budget()),
            tick: 0,
            sink,
            drain,
            verifier,
            intake,
            hydration,
            assembly,
            population,
            populated,
            hydration_health: StageHealth::new("Hydration", stall_ticks),
            assembly_health: StageHealth::new("Assembly", stall_ticks),
            disconnect: None,
        };

        scheduler.sink.log(
            LogLevel::Info,
            LOG_SOURCE,
            format!("init time {}ms", started.elapsed().as_millis()),
        );
        Ok(scheduler)
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn populated(&self) -> &PopulatedRegionSet {
        &self.populated
    }

    /// Reason given by the host, once it disconnected
    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect.as_deref()
    }

    fn is_running(&self) -> bool {
        self.disconnect.is_none() && self.connection.is_connected()
    }

    fn dispatch_inbound(&mut self) -> Option<String> {
        let mut disconnect = None;
        for event in self.connection.poll_inbound() {
            match event {
                InboundEvent::PopulateRegion(request) => self.population.requests().push(request),
                InboundEvent::Spawn(command) => self.verifier.commands().push(command),
                InboundEvent::Disconnect { reason } => {
                    tracing::info!("Host disconnected: {}", reason);
                    disconnect = Some(reason);
                }
            }
        }
        disconnect
    }

    fn observe_health(&mut self, hydration: &StageStatus, assembly: &StageStatus) {
        for (health, status) in [
            (&mut self.hydration_health, hydration),
            (&mut self.assembly_health, assembly),
        ] {
            if let Some(report) = health.observe(status) {
                self.sink.log(LogLevel::Error, health.name(), report);
            }
        }
    }

    /// Run every stage once and flush the output
    pub async fn run_tick(&mut self) -> Result<TickReport> {
        self.tick += 1;

        let disconnect = self.dispatch_inbound();
        let verified = self.verifier.update();
        let intake = self.intake.update();

        let population = Arc::clone(&self.population);
        let population_task = tokio::task::spawn_blocking(move || population.update());

        let (hydration, assembly) = tokio::join!(self.hydration.update(), self.assembly.update());

        let population = population_task
            .await
            .map_err(|e| PipelineError::Worker(format!("region population: {}", e)))?;

        self.observe_health(&hydration, &assembly);

        let flushed = self.drain.flush(&mut self.connection);

        if disconnect.is_some() {
            self.disconnect = disconnect.clone();
        }

        Ok(TickReport {
            tick: self.tick,
            verified,
            intake,
            hydration,
            assembly,
            population,
            flushed,
            disconnect,
        })
    }

    fn warn_overrun(&mut self, timing: &TickTiming) {
        let text = format!("Frame Time {}ms", timing.elapsed_ms());
        tracing::warn!("[{}] {}", LOOP_SOURCE, text);
        self.connection
            .send_log(LogMessage::new(LogLevel::Warn, LOOP_SOURCE, text));
    }

    async fn paced_tick(&mut self) -> Result<TickReport> {
        self.ticker.begin_tick();
        let report = self.run_tick().await?;
        if self.is_running() {
            let timing = self.ticker.end_tick().await;
            if timing.overran {
                self.warn_overrun(&timing);
            }
        }
        Ok(report)
    }

    /// Tick at the configured rate until the host disconnects
    pub async fn run(&mut self) -> Result<Tick> {
        let first = self.tick;
        while self.is_running() {
            self.paced_tick().await?;
        }
        tracing::info!("Scheduler stopped after {} ticks", self.tick - first);
        Ok(self.tick - first)
    }

    /// Like [`run`](Self::run), but stops after at most `ticks` ticks
    pub async fn run_for(&mut self, ticks: u64) -> Result<Tick> {
        let first = self.tick;
        while self.is_running() && self.tick - first < ticks {
            self.paced_tick().await?;
        }
        Ok(self.tick - first)
    }
}
