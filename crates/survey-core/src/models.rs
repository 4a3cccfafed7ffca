//! Core data models for the survey system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A lat/lon pair without altitude (drone location, animated position).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A drone in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: String,
    pub name: String,
    pub status: DroneStatus,
    /// Battery level percentage (0-100)
    pub battery_level: f64,
    pub location: GeoPoint,
    pub model: String,
    pub last_maintenance: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DroneStatus {
    /// Ready to be assigned a mission
    #[default]
    Available,
    /// Flying an in-progress mission
    InMission,
    Charging,
    Maintenance,
}

/// One point on a mission's flight path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
    /// Flight altitude in meters
    #[serde(alias = "altitude")]
    pub altitude_m: f64,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64, altitude_m: f64) -> Self {
        Self {
            lat,
            lon,
            altitude_m,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionStatus {
    /// Created, waiting to be started
    #[default]
    Planned,
    /// Being flown (or paused by the engine)
    InProgress,
    /// Reached the final waypoint
    Completed,
    /// Stopped by the operator
    Aborted,
}

impl MissionStatus {
    /// Completed and aborted missions never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Aborted)
    }

    /// Lifecycle edges a stored mission may take. Staying put is always allowed.
    pub fn can_transition_to(self, next: MissionStatus) -> bool {
        self == next
            || matches!(
                (self, next),
                (MissionStatus::Planned, MissionStatus::InProgress)
                    | (MissionStatus::InProgress, MissionStatus::Completed)
                    | (MissionStatus::InProgress, MissionStatus::Aborted)
            )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyPattern {
    #[default]
    Crosshatch,
    Perimeter,
}

/// Flight configuration captured when the mission is planned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionParameters {
    pub altitude_m: f64,
    pub speed_mps: f64,
    /// Image overlap percentage for survey coverage
    pub overlap_pct: f64,
    pub pattern: SurveyPattern,
}

impl Default for MissionParameters {
    fn default() -> Self {
        Self {
            altitude_m: 50.0,
            speed_mps: 5.0,
            overlap_pct: 70.0,
            pattern: SurveyPattern::Crosshatch,
        }
    }
}

/// Survey area outline as [lat, lon] pairs. Informational only, not validated
/// as a simple polygon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyArea {
    pub polygon: Vec<[f64; 2]>,
}

impl SurveyArea {
    pub fn from_waypoints(waypoints: &[Waypoint]) -> Self {
        Self {
            polygon: waypoints.iter().map(|wp| [wp.lat, wp.lon]).collect(),
        }
    }
}

/// A drone survey mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub name: String,
    pub drone_id: String,
    pub status: MissionStatus,
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub survey_area: SurveyArea,
    #[serde(default)]
    pub parameters: MissionParameters,
    /// Completion percentage (0-100)
    #[serde(default)]
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Estimated duration in minutes
    pub estimated_duration_min: f64,
    /// Planned flight distance in kilometers
    pub distance_km: f64,
}

impl Mission {
    /// Check the record against the data-model rules.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        }
        if self.drone_id.trim().is_empty() {
            errors.push(ValidationError::MissingDroneId);
        }
        if self.waypoints.is_empty() {
            errors.push(ValidationError::EmptyPath);
        }
        if self
            .waypoints
            .iter()
            .any(|wp| !wp.lat.is_finite() || !wp.lon.is_finite() || !wp.altitude_m.is_finite())
        {
            errors.push(ValidationError::NotFinite { field: "waypoint" });
        }

        if !self.progress.is_finite() || !(0.0..=100.0).contains(&self.progress) {
            errors.push(ValidationError::ProgressOutOfRange(self.progress));
        }
        if !(0.0..=100.0).contains(&self.parameters.overlap_pct) {
            errors.push(ValidationError::OverlapOutOfRange(self.parameters.overlap_pct));
        }
        for (field, value) in [
            ("altitude", self.parameters.altitude_m),
            ("speed", self.parameters.speed_mps),
        ] {
            if value.is_nan() || value <= 0.0 {
                errors.push(ValidationError::NonPositive { field, value });
            }
        }
        for (field, value) in [
            ("estimated duration", self.estimated_duration_min),
            ("distance", self.distance_km),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ValidationError::NonPositive { field, value });
            }
        }

        let status = self.status;
        let mut inconsistent = |reason| errors.push(ValidationError::Inconsistent { status, reason });
        match status {
            MissionStatus::Planned => {
                if self.progress != 0.0 {
                    inconsistent("planned mission must have zero progress");
                }
                if self.started_at.is_some() || self.completed_at.is_some() {
                    inconsistent("planned mission cannot carry start or completion times");
                }
            }
            MissionStatus::InProgress => {
                if self.started_at.is_none() {
                    inconsistent("in-progress mission needs a start time");
                }
                if self.completed_at.is_some() {
                    inconsistent("in-progress mission cannot carry a completion time");
                }
                if self.progress >= 100.0 {
                    inconsistent("only completed missions reach 100% progress");
                }
            }
            MissionStatus::Completed => {
                if self.progress != 100.0 {
                    inconsistent("completed mission must have 100% progress");
                }
                if self.completed_at.is_none() {
                    inconsistent("completed mission needs a completion time");
                }
            }
            MissionStatus::Aborted => {
                if self.completed_at.is_none() {
                    inconsistent("aborted mission needs a completion time");
                }
                if self.progress >= 100.0 {
                    inconsistent("only completed missions reach 100% progress");
                }
            }
        }

        errors
    }

    /// Check if mission is valid.
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Planned or in-progress.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Number of segments between consecutive waypoints.
    pub fn segment_count(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    /// Minutes of estimated flight left at the current progress, rounded up.
    pub fn estimated_time_remaining(&self) -> u32 {
        let remaining = self.estimated_duration_min * (1.0 - self.progress / 100.0);
        remaining.max(0.0).ceil() as u32
    }

    /// Actual flight time in minutes when both timestamps exist, otherwise the
    /// planning estimate.
    pub fn flight_duration_minutes(&self) -> f64 {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => {
                (completed - started).num_milliseconds() as f64 / 60_000.0
            }
            _ => self.estimated_duration_min,
        }
    }

    /// Merge a partial update. Waypoints and creation time are not part of
    /// [`MissionUpdate`] and so can never change here. The result is not
    /// checked; [`crate::FleetStore::update_mission`] validates it before
    /// storing.
    pub fn apply(&mut self, update: MissionUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = if progress.is_finite() {
                progress.clamp(0.0, 100.0)
            } else {
                self.progress
            };
        }
        if let Some(started_at) = update.started_at {
            match self.started_at {
                Some(existing) => tracing::warn!(
                    mission_id = %self.id,
                    %existing,
                    "Ignoring second start time"
                ),
                None => self.started_at = Some(started_at),
            }
        }
        if let Some(completed_at) = update.completed_at {
            match self.completed_at {
                Some(existing) => tracing::warn!(
                    mission_id = %self.id,
                    %existing,
                    "Ignoring second completion time"
                ),
                None => self.completed_at = Some(completed_at),
            }
        }
    }
}

/// Partial mission fields accepted by [`crate::FleetStore::update_mission`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionUpdate {
    pub name: Option<String>,
    pub status: Option<MissionStatus>,
    pub progress: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MissionUpdate {
    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn status(status: MissionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}
