//! Fixed-rate tick pacing

use std::time::{Duration, Instant};

/// Timing of one finished tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTiming {
    pub elapsed: Duration,
    pub budget: Duration,
    pub overran: bool,
}

impl TickTiming {
    pub fn new(elapsed: Duration, budget: Duration) -> Self {
        Self {
            elapsed,
            budget,
            overran: elapsed > budget,
        }
    }

    /// Time left to sleep; zero once the budget is spent
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed)
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Paces the driver loop at one tick per budget
///
/// Knows nothing about stages: call `begin_tick`, do the work, then
/// `end_tick`, which sleeps out the remainder or returns at once on overrun.
pub struct Ticker {
    budget: Duration,
    tick_start: Instant,
    overruns: u64,
}

impl Ticker {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            tick_start: Instant::now(),
            overruns: 0,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Ticks that ran over budget so far
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn begin_tick(&mut self) {
        self.tick_start = Instant::now();
    }

    /// Time the current tick without sleeping
    pub fn measure(&self) -> TickTiming {
        TickTiming::new(self.tick_start.elapsed(), self.budget)
    }

    /// Close the current tick, sleeping out any unused budget
    pub async fn end_tick(&mut self) -> TickTiming {
        let timing = self.measure();
        if timing.overran {
            self.overruns += 1;
        } else {
            tokio::time::sleep(timing.remaining()).await;
        }
        timing
    }
}
