//! Clock tied to the tokio timer.

use chrono::{DateTime, Utc};
use survey_core::Clock;
use tokio::time::Instant;

/// Wall-clock time that advances with tokio's timer, so a paused test
/// runtime moves the engine's clock together with the frame scheduler.
#[derive(Debug, Clone)]
pub struct TokioClock {
    base: DateTime<Utc>,
    started: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}
