//! Error types for the survey core.

use thiserror::Error;

use crate::models::{DroneStatus, MissionStatus};

/// A mission or drone record that breaks a data-model rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("mission name must not be empty")]
    EmptyName,
    #[error("mission must reference a drone")]
    MissingDroneId,
    #[error("mission path must contain at least one waypoint")]
    EmptyPath,
    #[error("progress {0} is outside 0..=100")]
    ProgressOutOfRange(f64),
    #[error("overlap percentage {0} is outside 0..=100")]
    OverlapOutOfRange(f64),
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },
    #[error("{status:?} mission is inconsistent: {reason}")]
    Inconsistent {
        status: MissionStatus,
        reason: &'static str,
    },
}

/// Rejections from the fleet/mission store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("mission {0} already exists")]
    DuplicateMission(String),
    #[error("drone {0} appears more than once")]
    DuplicateDrone(String),
    #[error("mission {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: String,
        from: MissionStatus,
        to: MissionStatus,
    },
    #[error("cannot change progress of {status:?} mission {id} from {current} to {requested}")]
    ProgressRejected {
        id: String,
        status: MissionStatus,
        current: f64,
        requested: f64,
    },
    #[error("drone {drone_id} is already assigned to active mission {mission_id}")]
    DroneBusy { drone_id: String, mission_id: String },
    #[error("mission {id} is invalid: {source}")]
    InvalidMission {
        id: String,
        #[source]
        source: ValidationError,
    },
}

/// Rejections from the mission simulation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("mission {0} not found")]
    MissionNotFound(String),
    #[error("cannot {action} mission {id} while it is {status:?}")]
    InvalidTransition {
        id: String,
        status: MissionStatus,
        action: &'static str,
    },
    #[error("no paused mission to resume")]
    NothingToResume,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Rejections from mission planning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("drone {0} not found")]
    DroneNotFound(String),
    #[error("drone {id} is {status:?} and cannot take a mission")]
    DroneUnavailable { id: String, status: DroneStatus },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
