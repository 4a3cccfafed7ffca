//! Cancellable per-frame task.
//!
//! Runs a step once per frame interval until the step reports
//! [`Frame::Finished`] or the task is cancelled. Dropping the handle cancels
//! the task.

use std::time::Duration;
use survey_core::Frame;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub struct FrameTask {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl FrameTask {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn<F>(generation: u64, period: Duration, mut step: F) -> Self
    where
        F: FnMut() -> Frame + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if step() == Frame::Finished {
                    tracing::debug!(generation, "Frame loop finished");
                    break;
                }
            }
        });

        Self {
            generation,
            handle: Some(handle),
        }
    }

    /// Generation of the engine animation this loop drives.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop. No further step runs after this returns on the
    /// runtime's thread; a step already executing completes.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(generation = self.generation, "Frame loop cancelled");
        }
    }

    /// Wait for the loop to end on its own.
    pub async fn finished(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(generation = self.generation, "Frame loop panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for FrameTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
