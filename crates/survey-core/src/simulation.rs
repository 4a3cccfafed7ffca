//! Mission simulation engine.
//!
//! Advances one mission at a time along its waypoint path. The engine is
//! frame-driven: a scheduler calls [`MissionSimulator::frame`] repeatedly with
//! the generation it was handed when the animation started. Every transition
//! out of animation (pause, abort, completion, reselection) bumps the
//! generation, so a callback from an older loop is rejected before it can
//! touch the store.
//!
//! Each segment between consecutive waypoints is flown in a fixed wall-clock
//! duration with linear interpolation of lat and lon. Overall progress is
//! `(index + p) / (waypoints - 1) * 100`, published to the store only when it
//! has moved more than the configured hysteresis since the last write.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{SimulationError, ValidationError};
use crate::models::{DroneStatus, GeoPoint, Mission, MissionStatus, MissionUpdate, Waypoint};
use crate::store::FleetStore;

/// Timing for the simulated flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Wall-clock time to fly one segment, in milliseconds
    pub segment_duration_ms: u64,
    /// Minimum progress change (percentage points) before the store is updated
    pub progress_hysteresis_pct: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            segment_duration_ms: 3000,
            progress_hysteresis_pct: 0.5,
        }
    }
}

impl SimulationConfig {
    fn segment_duration(&self) -> Duration {
        Duration::milliseconds(self.segment_duration_ms.max(1) as i64)
    }
}

/// What the scheduler should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Call again on the next frame.
    Continue,
    /// Stop the loop. Nothing more will happen for this generation.
    Finished,
}

/// Read-only view of the animating (or paused) mission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub mission_id: String,
    pub position: GeoPoint,
    pub waypoint_index: usize,
    pub progress: f64,
    pub paused: bool,
    /// Waypoints already passed followed by the current position.
    pub traversed_path: Vec<GeoPoint>,
}

#[derive(Debug)]
struct ActiveRun {
    mission_id: String,
    drone_id: String,
    waypoints: Vec<Waypoint>,
    index: usize,
    segment_started_at: DateTime<Utc>,
    /// Furthest fraction reached in the current segment
    fraction: f64,
    position: GeoPoint,
    /// Last computed progress
    progress: f64,
    /// Last progress written to the store
    published: f64,
    /// Elapsed time into the current segment when paused
    paused_elapsed: Option<Duration>,
}

impl ActiveRun {
    fn segments(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    fn is_paused(&self) -> bool {
        self.paused_elapsed.is_some()
    }
}

/// Drives mission status, progress and position over time.
pub struct MissionSimulator {
    store: Arc<FleetStore>,
    clock: Arc<dyn Clock>,
    config: SimulationConfig,
    selected: Option<String>,
    run: Option<ActiveRun>,
    generation: u64,
}

impl MissionSimulator {
    pub fn new(store: Arc<FleetStore>, clock: Arc<dyn Clock>, config: SimulationConfig) -> Self {
        Self {
            store,
            clock,
            config,
            selected: None,
            run: None,
            generation: 0,
        }
    }

    pub fn store(&self) -> &Arc<FleetStore> {
        &self.store
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current loop generation. Only a frame carrying this value may run.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while a mission is animating (not paused).
    pub fn is_animating(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.is_paused())
    }

    pub fn selected_mission_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Choose the mission shown to the operator. Switching away from the
    /// animating mission stops its animation; stored state is not touched.
    pub fn select_mission(&mut self, id: Option<&str>) -> Result<(), SimulationError> {
        if let Some(id) = id {
            if self.store.get_mission(id).is_none() {
                return Err(SimulationError::MissionNotFound(id.to_string()));
            }
        }

        let keeps_run = matches!((&self.run, id), (Some(run), Some(id)) if run.mission_id == id);
        if !keeps_run {
            self.cancel_run("mission reselected");
        }
        self.selected = id.map(str::to_string);
        Ok(())
    }

    /// Start (or continue) flying a mission.
    ///
    /// A planned mission moves to in-progress and its drone to in-mission.
    /// Starting the mission that is already animating is a no-op; starting an
    /// in-progress mission that is not animating picks up from its progress.
    /// Returns the generation the scheduler must pass to [`Self::frame`], or
    /// `None` when there is nothing to animate because the mission completed
    /// immediately.
    pub fn start_mission(&mut self, id: &str) -> Result<Option<u64>, SimulationError> {
        let mission = self
            .store
            .get_mission(id)
            .ok_or_else(|| SimulationError::MissionNotFound(id.to_string()))?;

        if mission.waypoints.is_empty() {
            return Err(ValidationError::EmptyPath.into());
        }

        match mission.status {
            MissionStatus::Completed | MissionStatus::Aborted => {
                Err(SimulationError::InvalidTransition {
                    id: id.to_string(),
                    status: mission.status,
                    action: "start",
                })
            }
            MissionStatus::InProgress => {
                if let Some(run) = self.run.as_ref().filter(|run| run.mission_id == id) {
                    if run.is_paused() {
                        return self.resume_mission().map(Some);
                    }
                    tracing::debug!(mission_id = %id, "Mission already animating");
                    return Ok(Some(self.generation));
                }

                self.cancel_run("another mission started");
                self.selected = Some(id.to_string());
                let now = self.clock.now();
                tracing::info!(
                    mission_id = %id,
                    progress = mission.progress,
                    "Continuing in-progress mission"
                );
                Ok(self.begin_run(&mission, mission.progress, now))
            }
            MissionStatus::Planned => {
                self.cancel_run("another mission started");
                self.selected = Some(id.to_string());

                let now = self.clock.now();
                write_mission(
                    &self.store,
                    id,
                    MissionUpdate::status(MissionStatus::InProgress)
                        .with_started_at(now)
                        .with_progress(0.0),
                );
                self.set_drone_status(&mission.drone_id, id, DroneStatus::InMission);
                tracing::info!(
                    mission_id = %id,
                    drone_id = %mission.drone_id,
                    waypoints = mission.waypoints.len(),
                    "Mission started"
                );

                Ok(self.begin_run(&mission, 0.0, now))
            }
        }
    }

    /// Stop animating without changing the stored mission status.
    /// Returns false if nothing was animating.
    pub fn pause_mission(&mut self) -> bool {
        let now = self.clock.now();
        let duration = self.config.segment_duration();
        let Some(run) = self.run.as_mut().filter(|run| !run.is_paused()) else {
            return false;
        };

        let elapsed = clamp_elapsed(now - run.segment_started_at, duration);
        run.paused_elapsed = Some(elapsed);
        tracing::info!(
            mission_id = %run.mission_id,
            progress = run.progress,
            "Mission paused"
        );
        self.generation += 1;
        true
    }

    /// Pick the paused mission up exactly where it stopped.
    pub fn resume_mission(&mut self) -> Result<u64, SimulationError> {
        let Some(run) = self.run.as_ref().filter(|run| run.is_paused()) else {
            return Err(SimulationError::NothingToResume);
        };

        let mission_id = run.mission_id.clone();
        match self.store.get_mission(&mission_id) {
            Some(mission) if mission.status == MissionStatus::InProgress => {}
            Some(mission) => {
                self.cancel_run("paused mission left in-progress");
                return Err(SimulationError::InvalidTransition {
                    id: mission_id,
                    status: mission.status,
                    action: "resume",
                });
            }
            None => {
                self.cancel_run("paused mission removed");
                return Err(SimulationError::MissionNotFound(mission_id));
            }
        }

        let now = self.clock.now();
        if let Some(run) = self.run.as_mut() {
            if let Some(elapsed) = run.paused_elapsed.take() {
                run.segment_started_at = now - elapsed;
            }
            tracing::info!(mission_id = %run.mission_id, progress = run.progress, "Mission resumed");
        }
        self.generation += 1;
        Ok(self.generation)
    }

    /// Terminate an in-progress mission. Progress keeps its last stored value.
    pub fn abort_mission(&mut self, id: &str) -> Result<(), SimulationError> {
        let mission = self
            .store
            .get_mission(id)
            .ok_or_else(|| SimulationError::MissionNotFound(id.to_string()))?;

        if mission.status != MissionStatus::InProgress {
            return Err(SimulationError::InvalidTransition {
                id: id.to_string(),
                status: mission.status,
                action: "abort",
            });
        }

        if self.run.as_ref().is_some_and(|run| run.mission_id == id) {
            self.cancel_run("mission aborted");
        }

        let now = self.clock.now();
        write_mission(
            &self.store,
            id,
            MissionUpdate::status(MissionStatus::Aborted).with_completed_at(now),
        );
        self.set_drone_status(&mission.drone_id, id, DroneStatus::Available);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }

        tracing::info!(mission_id = %id, progress = mission.progress, "Mission aborted");
        Ok(())
    }

    /// Advance the animation by one frame.
    ///
    /// A stale generation, a paused run, or a mission that is no longer
    /// in-progress in the store all end the loop without writing anything.
    pub fn frame(&mut self, generation: u64) -> Frame {
        if generation != self.generation {
            return Frame::Finished;
        }
        let Some(run) = self.run.as_ref() else {
            return Frame::Finished;
        };
        if run.is_paused() {
            return Frame::Finished;
        }

        let still_running = self
            .store
            .get_mission(&run.mission_id)
            .is_some_and(|m| m.status == MissionStatus::InProgress);
        if !still_running {
            self.cancel_run("mission no longer in progress");
            return Frame::Finished;
        }

        let now = self.clock.now();
        let duration = self.config.segment_duration();
        let hysteresis = self.config.progress_hysteresis_pct;
        let Some(run) = self.run.as_mut() else {
            return Frame::Finished;
        };

        let elapsed = clamp_elapsed(now - run.segment_started_at, duration);
        let p = segment_fraction(elapsed, duration).max(run.fraction);
        run.fraction = p;
        let segments = run.segments();
        let start = run.waypoints[run.index];
        let end = run.waypoints[run.index + 1];

        run.position = interpolate(&start, &end, p);
        let overall = overall_progress(run.index, p, segments);
        run.progress = run.progress.max(overall);

        if p >= 1.0 {
            run.index += 1;
            if run.index >= segments {
                let mission_id = run.mission_id.clone();
                let drone_id = run.drone_id.clone();
                self.complete(&mission_id, &drone_id, now);
                return Frame::Finished;
            }
            run.segment_started_at = now;
            run.fraction = 0.0;
            tracing::debug!(
                mission_id = %run.mission_id,
                waypoint = run.index,
                "Waypoint reached, moving to next"
            );
        }

        if run.progress - run.published > hysteresis {
            write_mission(
                &self.store,
                &run.mission_id,
                MissionUpdate::progress(run.progress),
            );
            run.published = run.progress;
            tracing::trace!(mission_id = %run.mission_id, progress = run.progress, "Progress published");
        }

        Frame::Continue
    }

    /// Position and progress of the animating or paused mission.
    pub fn snapshot(&self) -> Option<SimulationSnapshot> {
        let run = self.run.as_ref()?;
        let mut traversed_path: Vec<GeoPoint> = run.waypoints[..=run.index]
            .iter()
            .map(Waypoint::position)
            .collect();
        if traversed_path.last() != Some(&run.position) {
            traversed_path.push(run.position);
        }

        Some(SimulationSnapshot {
            mission_id: run.mission_id.clone(),
            position: run.position,
            waypoint_index: run.index,
            progress: run.progress,
            paused: run.is_paused(),
            traversed_path,
        })
    }

    fn begin_run(&mut self, mission: &Mission, progress: f64, now: DateTime<Utc>) -> Option<u64> {
        let segments = mission.segment_count();
        if segments == 0 {
            self.complete(&mission.id, &mission.drone_id, now);
            return None;
        }

        let duration = self.config.segment_duration();
        let (index, fraction) = cursor_for_progress(progress, segments);
        let offset_ms = (duration.num_milliseconds() as f64 * fraction).round() as i64;
        let position = interpolate(
            &mission.waypoints[index],
            &mission.waypoints[index + 1],
            fraction,
        );

        self.run = Some(ActiveRun {
            mission_id: mission.id.clone(),
            drone_id: mission.drone_id.clone(),
            waypoints: mission.waypoints.clone(),
            index,
            segment_started_at: now - Duration::milliseconds(offset_ms),
            fraction,
            position,
            progress,
            published: progress,
            paused_elapsed: None,
        });
        self.generation += 1;
        Some(self.generation)
    }

    fn complete(&mut self, mission_id: &str, drone_id: &str, now: DateTime<Utc>) {
        write_mission(
            &self.store,
            mission_id,
            MissionUpdate::status(MissionStatus::Completed)
                .with_progress(100.0)
                .with_completed_at(now),
        );
        self.set_drone_status(drone_id, mission_id, DroneStatus::Available);
        self.run = None;
        self.generation += 1;
        tracing::info!(mission_id = %mission_id, "Mission complete");
    }

    fn cancel_run(&mut self, reason: &str) {
        if let Some(run) = self.run.take() {
            tracing::debug!(
                mission_id = %run.mission_id,
                progress = run.progress,
                reason,
                "Animation cancelled"
            );
            self.generation += 1;
        }
    }

    fn set_drone_status(&self, drone_id: &str, mission_id: &str, status: DroneStatus) {
        if !self.store.update_drone_status(drone_id, status) {
            tracing::error!(
                mission_id = %mission_id,
                drone_id = %drone_id,
                ?status,
                "Mission references unknown drone; continuing without drone status updates"
            );
        }
    }
}

/// Apply an engine-driven update. A rejection means the store was changed
/// behind the engine's back; the engine keeps going and logs it.
fn write_mission(store: &FleetStore, mission_id: &str, update: MissionUpdate) {
    match store.update_mission(mission_id, update) {
        Ok(true) => {}
        Ok(false) => tracing::warn!(mission_id = %mission_id, "Mission missing from store"),
        Err(e) => tracing::error!(
            mission_id = %mission_id,
            error = %e,
            "Store rejected simulation update"
        ),
    }
}

fn clamp_elapsed(elapsed: Duration, duration: Duration) -> Duration {
    elapsed.clamp(Duration::zero(), duration)
}

fn segment_fraction(elapsed: Duration, duration: Duration) -> f64 {
    let total = duration.num_milliseconds().max(1) as f64;
    (elapsed.num_milliseconds() as f64 / total).clamp(0.0, 1.0)
}

/// Linear interpolation of lat and lon between two waypoints.
pub fn interpolate(start: &Waypoint, end: &Waypoint, p: f64) -> GeoPoint {
    GeoPoint::new(
        start.lat + (end.lat - start.lat) * p,
        start.lon + (end.lon - start.lon) * p,
    )
}

/// Overall progress percentage for a cursor at `index` with fraction `p` into
/// the next segment.
pub fn overall_progress(index: usize, p: f64, segments: usize) -> f64 {
    if segments == 0 {
        return 100.0;
    }
    ((index as f64 + p) / segments as f64 * 100.0).clamp(0.0, 100.0)
}

/// Segment index and fraction that reproduce a given progress percentage.
fn cursor_for_progress(progress: f64, segments: usize) -> (usize, f64) {
    let progress = if progress.is_finite() {
        progress.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let t = progress / 100.0 * segments as f64;
    let index = (t.floor() as usize).min(segments - 1);
    (index, (t - index as f64).clamp(0.0, 1.0))
}
