//! Survey Core - drone survey missions, fleet state and mission simulation.
//!
//! This crate holds the fleet/mission store, the frame-driven simulation
//! engine that flies missions along their waypoints, and the analytics
//! derived from the mission collection.

pub mod clock;
pub mod error;
pub mod models;
pub mod planning;
pub mod simulation;
pub mod stats;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PlanningError, SimulationError, StoreError, ValidationError};
pub use models::{
    Drone, DroneStatus, GeoPoint, Mission, MissionParameters, MissionStatus, MissionUpdate,
    SurveyArea, SurveyPattern, Waypoint,
};
pub use planning::{
    crosshatch_pattern, generate_pattern, perimeter_pattern, submit_plan, MissionPlan,
};
pub use simulation::{Frame, MissionSimulator, SimulationConfig, SimulationSnapshot};
pub use stats::{compute_stats, mission_history, MissionReport, MissionStats};
pub use store::{FleetStore, FleetSummary};
