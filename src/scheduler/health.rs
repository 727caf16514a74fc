//! Liveness tracking for store-bound stages

use crate::stage::StageStatus;

/// Counts consecutive deferred ticks of one stage
#[derive(Debug, Clone)]
pub struct StageHealth {
    name: &'static str,
    threshold: u32,
    consecutive: u32,
}

impl StageHealth {
    pub fn new(name: &'static str, threshold: u32) -> Self {
        Self {
            name,
            threshold,
            consecutive: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn consecutive_deferrals(&self) -> u32 {
        self.consecutive
    }

    /// Record one tick's status
    ///
    /// Returns a stall report every `threshold` consecutive deferrals, so a
    /// stage that never recovers keeps being reported without flooding.
    pub fn observe(&mut self, status: &StageStatus) -> Option<String> {
        let StageStatus::Deferred { pending, reason } = status else {
            if self.consecutive >= self.threshold && self.threshold > 0 {
                tracing::info!("{} recovered after {} deferred ticks", self.name, self.consecutive);
            }
            self.consecutive = 0;
            return None;
        };

        self.consecutive += 1;
        if self.threshold == 0 || self.consecutive % self.threshold != 0 {
            return None;
        }

        Some(format!(
            "{} stalled for {} ticks with {} vessels pending: {}",
            self.name, self.consecutive, pending, reason
        ))
    }
}
