//! Demo fleet used by the CLI.

use chrono::{DateTime, Duration, Utc};
use survey_core::{
    generate_pattern, Drone, DroneStatus, FleetStore, GeoPoint, Mission, MissionParameters,
    MissionStatus, StoreError, SurveyArea, SurveyPattern,
};

pub const DEMO_PLANNED_MISSION: &str = "mission-001";
pub const DEMO_ACTIVE_MISSION: &str = "mission-002";
pub const DEMO_COMPLETED_MISSION: &str = "mission-003";

const BASE: GeoPoint = GeoPoint {
    lat: 37.7749,
    lon: -122.4194,
};

pub fn demo_drones(now: DateTime<Utc>) -> Vec<Drone> {
    let drone = |id: &str, name: &str, status, battery_level, model: &str, days_since| Drone {
        id: id.to_string(),
        name: name.to_string(),
        status,
        battery_level,
        location: BASE,
        model: model.to_string(),
        last_maintenance: now - Duration::days(days_since),
    };

    vec![
        drone("drone-001", "Falcon One", DroneStatus::Available, 95.0, "DJI Matrice 300 RTK", 12),
        drone("drone-002", "Hawk Eye", DroneStatus::InMission, 72.0, "DJI Mavic 3 Enterprise", 30),
        drone("drone-003", "Sky Scout", DroneStatus::Available, 88.0, "Autel EVO II Pro", 5),
        drone("drone-004", "Condor", DroneStatus::Charging, 18.0, "Skydio X2", 45),
    ]
}

pub fn demo_missions(now: DateTime<Utc>) -> Vec<Mission> {
    let mission = |id: &str, name: &str, drone_id: &str, pattern, origin: GeoPoint| {
        let parameters = MissionParameters {
            pattern,
            ..MissionParameters::default()
        };
        let waypoints = generate_pattern(pattern, origin, parameters.altitude_m);
        Mission {
            id: id.to_string(),
            name: name.to_string(),
            drone_id: drone_id.to_string(),
            status: MissionStatus::Planned,
            survey_area: SurveyArea::from_waypoints(&waypoints),
            distance_km: waypoints.len() as f64 * 0.1,
            waypoints,
            parameters,
            progress: 0.0,
            created_at: now - Duration::days(1),
            started_at: None,
            completed_at: None,
            estimated_duration_min: 30.0,
        }
    };

    let planned = mission(
        DEMO_PLANNED_MISSION,
        "Warehouse Roof Survey",
        "drone-001",
        SurveyPattern::Crosshatch,
        BASE,
    );

    let mut active = mission(
        DEMO_ACTIVE_MISSION,
        "Pier Perimeter Inspection",
        "drone-002",
        SurveyPattern::Perimeter,
        GeoPoint::new(BASE.lat + 0.01, BASE.lon),
    );
    active.status = MissionStatus::InProgress;
    active.started_at = Some(now - Duration::minutes(12));
    active.progress = 40.0;

    let mut completed = mission(
        DEMO_COMPLETED_MISSION,
        "Solar Farm Mapping",
        "drone-003",
        SurveyPattern::Crosshatch,
        GeoPoint::new(BASE.lat - 0.01, BASE.lon),
    );
    completed.status = MissionStatus::Completed;
    completed.progress = 100.0;
    completed.started_at = Some(now - Duration::hours(5));
    completed.completed_at = Some(now - Duration::hours(5) + Duration::minutes(27));

    vec![planned, active, completed]
}

/// Load the demo fleet into the store.
pub fn seed_store(store: &FleetStore, now: DateTime<Utc>) -> Result<(), StoreError> {
    store.replace_drones(demo_drones(now))?;
    store.replace_missions(demo_missions(now))?;
    tracing::info!(
        drones = store.drones().len(),
        missions = store.missions().len(),
        "Demo fleet seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_fleet_is_consistent() {
        let store = FleetStore::new();
        seed_store(&store, Utc::now()).unwrap();

        assert_eq!(store.drones().len(), 4);
        assert_eq!(store.active_missions().len(), 2);
        let active = store.get_mission(DEMO_ACTIVE_MISSION).unwrap();
        assert_eq!(active.progress, 40.0);
        assert_eq!(active.waypoints.len(), 5);
        assert_eq!(store.fleet_summary().in_mission, 1);
    }
}
