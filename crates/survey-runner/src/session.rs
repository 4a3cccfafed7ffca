//! Operator session: store, engine and the frame loop that drives it.
//!
//! Every control operation cancels the retained frame task before the engine
//! mutates any state, then respawns a loop if the engine still has an
//! animation to run.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use survey_core::{
    compute_stats, Clock, FleetStore, FleetSummary, Frame, MissionSimulator, MissionStats,
    SimulationError, SimulationSnapshot,
};
use thiserror::Error;

use crate::config::Config;
use crate::frame_loop::FrameTask;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("simulation engine lock poisoned")]
    EnginePoisoned,
}

pub struct Session {
    store: Arc<FleetStore>,
    engine: Arc<Mutex<MissionSimulator>>,
    frame_interval: Duration,
    task: Option<FrameTask>,
}

impl Session {
    pub fn new(store: Arc<FleetStore>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let engine = MissionSimulator::new(store.clone(), clock, config.simulation.clone());
        Self {
            store,
            engine: Arc::new(Mutex::new(engine)),
            frame_interval: config.frame_interval(),
            task: None,
        }
    }

    pub fn store(&self) -> &Arc<FleetStore> {
        &self.store
    }

    /// Start or continue a mission and schedule its frames.
    pub fn start(&mut self, mission_id: &str) -> Result<(), SessionError> {
        self.cancel_task();
        let generation = self.engine()?.start_mission(mission_id)?;
        if let Some(generation) = generation {
            self.spawn_frames(generation);
        }
        Ok(())
    }

    /// Stop animating; the mission stays in progress.
    pub fn pause(&mut self) -> Result<bool, SessionError> {
        self.cancel_task();
        Ok(self.engine()?.pause_mission())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.cancel_task();
        let generation = self.engine()?.resume_mission()?;
        self.spawn_frames(generation);
        Ok(())
    }

    pub fn abort(&mut self, mission_id: &str) -> Result<(), SessionError> {
        self.cancel_task();
        let result = self.engine()?.abort_mission(mission_id);
        // aborting a mission other than the animating one leaves that one running
        self.respawn_if_animating()?;
        result.map_err(SessionError::from)
    }

    /// Choose the displayed mission. Selecting away from the animating mission
    /// stops it.
    pub fn select(&mut self, mission_id: Option<&str>) -> Result<(), SessionError> {
        self.cancel_task();
        let result = self.engine()?.select_mission(mission_id);
        self.respawn_if_animating()?;
        result.map_err(SessionError::from)
    }

    pub fn snapshot(&self) -> Option<SimulationSnapshot> {
        self.engine().ok()?.snapshot()
    }

    pub fn selected_mission_id(&self) -> Option<String> {
        self.engine()
            .ok()?
            .selected_mission_id()
            .map(str::to_string)
    }

    pub fn stats(&self) -> MissionStats {
        compute_stats(&self.store.missions())
    }

    pub fn fleet_summary(&self) -> FleetSummary {
        self.store.fleet_summary()
    }

    /// True while a frame loop is scheduled.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the current frame loop to end on its own (completion).
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            task.finished().await;
        }
    }

    fn engine(&self) -> Result<MutexGuard<'_, MissionSimulator>, SessionError> {
        self.engine.lock().map_err(|_| SessionError::EnginePoisoned)
    }

    fn cancel_task(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
    }

    fn respawn_if_animating(&mut self) -> Result<(), SessionError> {
        let generation = {
            let engine = self.engine()?;
            engine.is_animating().then(|| engine.generation())
        };
        if let Some(generation) = generation {
            self.spawn_frames(generation);
        }
        Ok(())
    }

    fn spawn_frames(&mut self, generation: u64) {
        let engine = self.engine.clone();
        self.task = Some(FrameTask::spawn(
            generation,
            self.frame_interval,
            move || match engine.lock() {
                Ok(mut engine) => engine.frame(generation),
                Err(_) => {
                    tracing::error!(generation, "Simulation engine lock poisoned; stopping frames");
                    Frame::Finished
                }
            },
        ));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_task();
    }
}
