//! In-memory fleet and mission store using DashMap.
//!
//! Single source of truth for drones and missions. The simulation engine
//! writes to it through the same primitives the planning and display layers
//! use, and every read returns an owned snapshot.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{Drone, DroneStatus, Mission, MissionStatus, MissionUpdate};

/// Drone and mission collections.
#[derive(Debug, Default)]
pub struct FleetStore {
    drones: DashMap<String, Drone>,
    missions: DashMap<String, Mission>,
}

/// Drone counts by status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total: usize,
    pub available: usize,
    pub in_mission: usize,
    pub charging: usize,
    pub maintenance: usize,
    pub average_battery: f64,
}

impl FleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the drone collection wholesale.
    ///
    /// Rejects the whole batch, leaving the current collection untouched, if
    /// a drone id repeats.
    pub fn replace_drones(&self, drones: Vec<Drone>) -> Result<(), StoreError> {
        let mut seen_ids = std::collections::HashSet::new();
        for drone in &drones {
            if !seen_ids.insert(drone.id.as_str()) {
                tracing::warn!(drone_id = %drone.id, "Rejected drone batch with duplicate id");
                return Err(StoreError::DuplicateDrone(drone.id.clone()));
            }
        }

        self.drones.clear();
        for mut drone in drones {
            drone.battery_level = clamp_battery(drone.battery_level);
            self.drones.insert(drone.id.clone(), drone);
        }
        tracing::debug!(count = self.drones.len(), "Drone collection replaced");
        Ok(())
    }

    /// Replace the mission collection wholesale.
    ///
    /// The whole batch is rejected, leaving the current collection untouched,
    /// if any mission is invalid, ids repeat, or a drone is claimed by two
    /// active missions.
    pub fn replace_missions(&self, missions: Vec<Mission>) -> Result<(), StoreError> {
        let mut seen_ids = std::collections::HashSet::new();
        let mut busy_drones: std::collections::HashMap<&str, &str> =
            std::collections::HashMap::new();

        for mission in &missions {
            check_mission(mission)?;
            if !seen_ids.insert(mission.id.as_str()) {
                return Err(StoreError::DuplicateMission(mission.id.clone()));
            }
            if mission.is_active() {
                if let Some(other) = busy_drones.insert(&mission.drone_id, &mission.id) {
                    return Err(StoreError::DroneBusy {
                        drone_id: mission.drone_id.clone(),
                        mission_id: other.to_string(),
                    });
                }
            }
        }

        self.missions.clear();
        for mission in missions {
            self.missions.insert(mission.id.clone(), mission);
        }
        tracing::debug!(count = self.missions.len(), "Mission collection replaced");
        Ok(())
    }

    /// Append a new mission. Never overwrites an existing id.
    pub fn add_mission(&self, mission: Mission) -> Result<(), StoreError> {
        check_mission(&mission)?;

        if mission.is_active() {
            if let Some(other) = self.active_mission_for_drone(&mission.drone_id) {
                if other != mission.id {
                    return Err(StoreError::DroneBusy {
                        drone_id: mission.drone_id.clone(),
                        mission_id: other,
                    });
                }
            }
        }

        match self.missions.entry(mission.id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(mission_id = %mission.id, "Rejected duplicate mission id");
                Err(StoreError::DuplicateMission(mission.id))
            }
            Entry::Vacant(slot) => {
                tracing::info!(
                    mission_id = %mission.id,
                    drone_id = %mission.drone_id,
                    waypoints = mission.waypoints.len(),
                    "Mission added"
                );
                slot.insert(mission);
                Ok(())
            }
        }
    }

    /// Merge fields into the matching mission.
    ///
    /// Returns `Ok(false)` if the id is unknown. The merged record must be
    /// valid and reachable from the stored one through the mission lifecycle;
    /// otherwise the stored record is left unchanged and the update rejected.
    pub fn update_mission(&self, id: &str, update: MissionUpdate) -> Result<bool, StoreError> {
        let Some(mut entry) = self.missions.get_mut(id) else {
            tracing::debug!(mission_id = %id, "Update for unknown mission ignored");
            return Ok(false);
        };

        let mut updated = entry.value().clone();
        updated.apply(update);
        if let Err(e) = check_update(entry.value(), &updated) {
            tracing::warn!(mission_id = %id, error = %e, "Rejected mission update");
            return Err(e);
        }

        *entry.value_mut() = updated;
        Ok(true)
    }

    /// Set a drone's status. Returns false if the id is unknown.
    pub fn update_drone_status(&self, id: &str, status: DroneStatus) -> bool {
        match self.drones.get_mut(id) {
            Some(mut drone) => {
                drone.status = status;
                true
            }
            None => false,
        }
    }

    /// Set a drone's battery level, clamped to 0..=100. Returns false if the id
    /// is unknown.
    pub fn update_drone_battery(&self, id: &str, level: f64) -> bool {
        match self.drones.get_mut(id) {
            Some(mut drone) => {
                drone.battery_level = clamp_battery(level);
                true
            }
            None => false,
        }
    }

    pub fn get_drone(&self, id: &str) -> Option<Drone> {
        self.drones.get(id).map(|d| d.value().clone())
    }

    pub fn get_mission(&self, id: &str) -> Option<Mission> {
        self.missions.get(id).map(|m| m.value().clone())
    }

    /// All drones ordered by id.
    pub fn drones(&self) -> Vec<Drone> {
        let mut drones: Vec<Drone> = self.drones.iter().map(|r| r.value().clone()).collect();
        drones.sort_by(|a, b| a.id.cmp(&b.id));
        drones
    }

    /// All missions ordered by creation time, then id.
    pub fn missions(&self) -> Vec<Mission> {
        let mut missions: Vec<Mission> =
            self.missions.iter().map(|r| r.value().clone()).collect();
        missions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        missions
    }

    /// Planned and in-progress missions.
    pub fn active_missions(&self) -> Vec<Mission> {
        self.missions()
            .into_iter()
            .filter(Mission::is_active)
            .collect()
    }

    pub fn available_drones(&self) -> Vec<Drone> {
        self.drones()
            .into_iter()
            .filter(|d| d.status == DroneStatus::Available)
            .collect()
    }

    pub fn fleet_summary(&self) -> FleetSummary {
        let mut summary = FleetSummary::default();
        let mut battery_total = 0.0;

        for drone in self.drones.iter() {
            summary.total += 1;
            battery_total += drone.battery_level;
            match drone.status {
                DroneStatus::Available => summary.available += 1,
                DroneStatus::InMission => summary.in_mission += 1,
                DroneStatus::Charging => summary.charging += 1,
                DroneStatus::Maintenance => summary.maintenance += 1,
            }
        }

        if summary.total > 0 {
            summary.average_battery = battery_total / summary.total as f64;
        }
        summary
    }

    fn active_mission_for_drone(&self, drone_id: &str) -> Option<String> {
        self.missions
            .iter()
            .find(|m| m.drone_id == drone_id && m.is_active())
            .map(|m| m.id.clone())
    }
}

fn check_mission(mission: &Mission) -> Result<(), StoreError> {
    match mission.validate().into_iter().next() {
        Some(source) => Err(StoreError::InvalidMission {
            id: mission.id.clone(),
            source,
        }),
        None => Ok(()),
    }
}

fn check_update(current: &Mission, updated: &Mission) -> Result<(), StoreError> {
    if !current.status.can_transition_to(updated.status) {
        return Err(StoreError::InvalidTransition {
            id: current.id.clone(),
            from: current.status,
            to: updated.status,
        });
    }

    // progress only grows while in flight and is frozen once terminal
    let regressed = current.status == MissionStatus::InProgress
        && updated.progress < current.progress;
    let frozen = current.status.is_terminal() && updated.progress != current.progress;
    if regressed || frozen {
        return Err(StoreError::ProgressRejected {
            id: current.id.clone(),
            status: current.status,
            current: current.progress,
            requested: updated.progress,
        });
    }

    check_mission(updated)
}

fn clamp_battery(level: f64) -> f64 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 100.0)
    }
}
