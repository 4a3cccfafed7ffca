//! Mission authoring: survey pattern generation and planned-mission creation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{PlanningError, ValidationError};
use crate::models::{
    DroneStatus, GeoPoint, Mission, MissionParameters, MissionStatus, SurveyArea, SurveyPattern,
    Waypoint,
};
use crate::store::FleetStore;

/// Planning estimate assigned to every new mission, in minutes.
pub const DEFAULT_ESTIMATED_DURATION_MIN: f64 = 30.0;
/// Nominal distance credited per waypoint, in kilometers.
pub const DISTANCE_PER_WAYPOINT_KM: f64 = 0.1;

const CROSSHATCH_GRID: usize = 4;
const CROSSHATCH_SPACING_DEG: f64 = 0.001;
const PERIMETER_SIZE_DEG: f64 = 0.002;

/// 4x4 grid of waypoints starting at `origin`, row by row.
pub fn crosshatch_pattern(origin: GeoPoint, spacing_deg: f64, altitude_m: f64) -> Vec<Waypoint> {
    let mut points = Vec::with_capacity(CROSSHATCH_GRID * CROSSHATCH_GRID);
    for row in 0..CROSSHATCH_GRID {
        for col in 0..CROSSHATCH_GRID {
            points.push(Waypoint::new(
                origin.lat + row as f64 * spacing_deg,
                origin.lon + col as f64 * spacing_deg,
                altitude_m,
            ));
        }
    }
    points
}

/// Closed square loop with `origin` as its south-west corner.
pub fn perimeter_pattern(origin: GeoPoint, size_deg: f64, altitude_m: f64) -> Vec<Waypoint> {
    vec![
        Waypoint::new(origin.lat, origin.lon, altitude_m),
        Waypoint::new(origin.lat + size_deg, origin.lon, altitude_m),
        Waypoint::new(origin.lat + size_deg, origin.lon + size_deg, altitude_m),
        Waypoint::new(origin.lat, origin.lon + size_deg, altitude_m),
        Waypoint::new(origin.lat, origin.lon, altitude_m),
    ]
}

/// Waypoints for `pattern` with the default spacing.
pub fn generate_pattern(pattern: SurveyPattern, origin: GeoPoint, altitude_m: f64) -> Vec<Waypoint> {
    match pattern {
        SurveyPattern::Crosshatch => crosshatch_pattern(origin, CROSSHATCH_SPACING_DEG, altitude_m),
        SurveyPattern::Perimeter => perimeter_pattern(origin, PERIMETER_SIZE_DEG, altitude_m),
    }
}

/// A mission being authored.
#[derive(Debug, Clone, Default)]
pub struct MissionPlan {
    pub name: String,
    pub drone_id: String,
    pub parameters: MissionParameters,
    pub waypoints: Vec<Waypoint>,
}

impl MissionPlan {
    pub fn new(name: impl Into<String>, drone_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            drone_id: drone_id.into(),
            ..Self::default()
        }
    }

    pub fn with_parameters(mut self, parameters: MissionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// Fill the path from the plan's pattern and altitude.
    pub fn with_generated_pattern(mut self, origin: GeoPoint) -> Self {
        self.waypoints =
            generate_pattern(self.parameters.pattern, origin, self.parameters.altitude_m);
        self
    }

    /// Turn the plan into a `planned` mission.
    pub fn build(self, now: DateTime<Utc>) -> Result<Mission, ValidationError> {
        let mission = Mission {
            id: format!("mission-{}", Uuid::new_v4()),
            name: self.name,
            drone_id: self.drone_id,
            status: MissionStatus::Planned,
            survey_area: SurveyArea::from_waypoints(&self.waypoints),
            distance_km: self.waypoints.len() as f64 * DISTANCE_PER_WAYPOINT_KM,
            waypoints: self.waypoints,
            parameters: self.parameters,
            progress: 0.0,
            created_at: now,
            started_at: None,
            completed_at: None,
            estimated_duration_min: DEFAULT_ESTIMATED_DURATION_MIN,
        };

        match mission.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(mission),
        }
    }
}

/// Validate a plan against the fleet and add it to the store.
/// Only drones that are currently available can take a new mission.
pub fn submit_plan(
    store: &FleetStore,
    plan: MissionPlan,
    now: DateTime<Utc>,
) -> Result<Mission, PlanningError> {
    let drone = store
        .get_drone(&plan.drone_id)
        .ok_or_else(|| PlanningError::DroneNotFound(plan.drone_id.clone()))?;
    if drone.status != DroneStatus::Available {
        return Err(PlanningError::DroneUnavailable {
            id: drone.id,
            status: drone.status,
        });
    }

    let mission = plan.build(now)?;
    store.add_mission(mission.clone())?;
    Ok(mission)
}
