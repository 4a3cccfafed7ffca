//! Organization-wide mission statistics.
//!
//! Pure functions of the mission collection: the same input always yields the
//! same output.

use serde::{Deserialize, Serialize};

use crate::models::{Mission, MissionStatus};

/// Aggregates over the mission collection. Raw values; see [`MissionReport`]
/// for the rounded display form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionStats {
    pub total_missions: usize,
    pub planned_missions: usize,
    pub active_missions: usize,
    pub completed_missions: usize,
    pub aborted_missions: usize,
    /// Sum of completed flight times in minutes
    pub total_flight_time_min: f64,
    /// Sum of completed mission distances in kilometers
    pub total_distance_km: f64,
    pub average_duration_min: f64,
    /// Completed share of finished (completed + aborted) missions
    pub success_rate_pct: f64,
}

/// Rounded statistics for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub total_missions: usize,
    pub completed_missions: usize,
    pub aborted_missions: usize,
    pub active_missions: usize,
    pub total_flight_time_min: i64,
    pub total_distance_km: f64,
    pub average_duration_min: f64,
    pub success_rate_pct: f64,
}

pub fn compute_stats(missions: &[Mission]) -> MissionStats {
    let mut stats = MissionStats {
        total_missions: missions.len(),
        ..MissionStats::default()
    };

    for mission in missions {
        match mission.status {
            MissionStatus::Planned => stats.planned_missions += 1,
            MissionStatus::InProgress => stats.active_missions += 1,
            MissionStatus::Aborted => stats.aborted_missions += 1,
            MissionStatus::Completed => {
                stats.completed_missions += 1;
                stats.total_flight_time_min += mission.flight_duration_minutes();
                stats.total_distance_km += mission.distance_km;
            }
        }
    }

    if stats.completed_missions > 0 {
        stats.average_duration_min = stats.total_flight_time_min / stats.completed_missions as f64;
    }

    let finished = stats.completed_missions + stats.aborted_missions;
    if finished > 0 {
        stats.success_rate_pct = stats.completed_missions as f64 / finished as f64 * 100.0;
    }

    stats
}

impl MissionStats {
    pub fn report(&self) -> MissionReport {
        MissionReport {
            total_missions: self.total_missions,
            completed_missions: self.completed_missions,
            aborted_missions: self.aborted_missions,
            active_missions: self.active_missions,
            total_flight_time_min: self.total_flight_time_min.round() as i64,
            total_distance_km: round_tenths(self.total_distance_km),
            average_duration_min: round_tenths(self.average_duration_min),
            success_rate_pct: round_tenths(self.success_rate_pct),
        }
    }
}

/// Completed and aborted missions, most recently finished first.
pub fn mission_history(missions: &[Mission]) -> Vec<Mission> {
    let mut history: Vec<Mission> = missions
        .iter()
        .filter(|m| m.status.is_terminal())
        .cloned()
        .collect();
    history.sort_by(|a, b| {
        let finished_a = a.completed_at.unwrap_or(a.created_at);
        let finished_b = b.completed_at.unwrap_or(b.created_at);
        finished_b.cmp(&finished_a).then_with(|| a.id.cmp(&b.id))
    });
    history
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
