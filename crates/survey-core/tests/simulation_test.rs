//! Mission simulation scenarios driven by a manual clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use survey_core::{
    Drone, DroneStatus, FleetStore, Frame, GeoPoint, ManualClock, Mission, MissionParameters,
    MissionSimulator, MissionStatus, MissionUpdate, SimulationConfig, SimulationError,
    SurveyArea, Waypoint,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 2, 10, 0, 0).unwrap()
}

fn drone(id: &str) -> Drone {
    Drone {
        id: id.to_string(),
        name: format!("Drone {id}"),
        status: DroneStatus::Available,
        battery_level: 95.0,
        location: GeoPoint::new(0.0, 0.0),
        model: "DJI Mavic 3E".to_string(),
        last_maintenance: t0() - Duration::days(10),
    }
}

fn mission(id: &str, drone_id: &str, waypoints: Vec<Waypoint>) -> Mission {
    Mission {
        id: id.to_string(),
        name: format!("Mission {id}"),
        drone_id: drone_id.to_string(),
        status: MissionStatus::Planned,
        survey_area: SurveyArea::from_waypoints(&waypoints),
        waypoints,
        parameters: MissionParameters::default(),
        progress: 0.0,
        created_at: t0() - Duration::hours(1),
        started_at: None,
        completed_at: None,
        estimated_duration_min: 30.0,
        distance_km: 0.2,
    }
}

fn line(points: usize) -> Vec<Waypoint> {
    (0..points)
        .map(|i| Waypoint::new(0.0, i as f64, 10.0))
        .collect()
}

struct Harness {
    store: Arc<FleetStore>,
    clock: Arc<ManualClock>,
    sim: MissionSimulator,
}

fn harness(drones: Vec<Drone>, missions: Vec<Mission>) -> Harness {
    let store = Arc::new(FleetStore::new());
    store.replace_drones(drones).expect("seed drones");
    store.replace_missions(missions).expect("seed missions");
    let clock = Arc::new(ManualClock::new(t0()));
    let sim = MissionSimulator::new(store.clone(), clock.clone(), SimulationConfig::default());
    Harness { store, clock, sim }
}

fn progress_of(store: &FleetStore, id: &str) -> f64 {
    store.get_mission(id).expect("mission exists").progress
}

#[test]
fn two_waypoint_mission_reaches_half_way_then_completes() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(2))]);

    let generation = h.sim.start_mission("m-1").unwrap().expect("animation scheduled");
    let started = h.store.get_mission("m-1").unwrap();
    assert_eq!(started.status, MissionStatus::InProgress);
    assert_eq!(started.started_at, Some(t0()));
    assert_eq!(h.store.get_drone("d-1").unwrap().status, DroneStatus::InMission);

    h.clock.advance_ms(1500);
    assert_eq!(h.sim.frame(generation), Frame::Continue);
    let snap = h.sim.snapshot().unwrap();
    assert!((snap.position.lat - 0.0).abs() < 1e-9);
    assert!((snap.position.lon - 0.5).abs() < 1e-9);
    assert!((snap.progress - 50.0).abs() < 1e-9);
    assert!((progress_of(&h.store, "m-1") - 50.0).abs() < 1e-9);

    h.clock.advance_ms(1500);
    assert_eq!(h.sim.frame(generation), Frame::Finished);
    let done = h.store.get_mission("m-1").unwrap();
    assert_eq!(done.status, MissionStatus::Completed);
    assert_eq!(done.progress, 100.0);
    assert_eq!(done.completed_at, Some(t0() + Duration::milliseconds(3000)));
    assert_eq!(h.store.get_drone("d-1").unwrap().status, DroneStatus::Available);
    assert!(h.sim.snapshot().is_none());
    assert!(done.is_valid());
}

#[test]
fn full_run_publishes_increasing_progress_until_complete() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(5))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    let mut published = vec![progress_of(&h.store, "m-1")];
    let mut frames = 0;
    loop {
        h.clock.advance_ms(16);
        frames += 1;
        let frame = h.sim.frame(generation);
        let progress = progress_of(&h.store, "m-1");
        if progress != *published.last().unwrap() {
            published.push(progress);
        }
        if frame == Frame::Finished {
            break;
        }
        assert!(frames < 10_000, "animation never finished");
    }

    assert!(published.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(*published.last().unwrap(), 100.0);
    // throttled: far fewer store writes than frames
    assert!(published.len() < frames);

    let done = h.store.get_mission("m-1").unwrap();
    assert_eq!(done.status, MissionStatus::Completed);
    assert_eq!(h.sim.frame(generation), Frame::Finished);
}

#[test]
fn single_waypoint_mission_completes_on_start() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(1))]);

    assert_eq!(h.sim.start_mission("m-1").unwrap(), None);

    let done = h.store.get_mission("m-1").unwrap();
    assert_eq!(done.status, MissionStatus::Completed);
    assert_eq!(done.progress, 100.0);
    assert!(!done.progress.is_nan());
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());
    assert_eq!(h.store.get_drone("d-1").unwrap().status, DroneStatus::Available);
}

#[test]
fn abort_freezes_progress_and_stops_updates() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(3))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(2000);
    assert_eq!(h.sim.frame(generation), Frame::Continue);
    let before = progress_of(&h.store, "m-1");
    assert!(before > 0.0);

    h.clock.advance_ms(100);
    h.sim.abort_mission("m-1").unwrap();

    let aborted = h.store.get_mission("m-1").unwrap();
    assert_eq!(aborted.status, MissionStatus::Aborted);
    assert_eq!(aborted.progress, before);
    assert_eq!(aborted.completed_at, Some(t0() + Duration::milliseconds(2100)));
    assert_eq!(h.store.get_drone("d-1").unwrap().status, DroneStatus::Available);

    h.clock.advance_ms(5000);
    assert_eq!(h.sim.frame(generation), Frame::Finished);
    assert_eq!(h.store.get_mission("m-1").unwrap(), aborted);
    assert!(h.sim.snapshot().is_none());
    assert!(h.sim.selected_mission_id().is_none());
}

#[test]
fn abort_requires_in_progress_mission() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(3))]);
    let err = h.sim.abort_mission("m-1").unwrap_err();
    assert!(matches!(
        err,
        SimulationError::InvalidTransition {
            status: MissionStatus::Planned,
            ..
        }
    ));
    assert_eq!(
        h.sim.abort_mission("missing").unwrap_err(),
        SimulationError::MissionNotFound("missing".into())
    );
}

#[test]
fn starting_twice_is_idempotent() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(3))]);
    let first = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(1500);
    h.sim.frame(first);
    let after_first = h.store.get_mission("m-1").unwrap();

    let second = h.sim.start_mission("m-1").unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(h.store.get_mission("m-1").unwrap(), after_first);
    assert_eq!(after_first.started_at, Some(t0()));
    assert!(after_first.progress > 0.0);
}

#[test]
fn finished_missions_cannot_restart() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(1))]);
    h.sim.start_mission("m-1").unwrap();

    let err = h.sim.start_mission("m-1").unwrap_err();
    assert!(matches!(err, SimulationError::InvalidTransition { action: "start", .. }));
    assert!(matches!(
        h.sim.start_mission("nope"),
        Err(SimulationError::MissionNotFound(_))
    ));
}

#[test]
fn pause_holds_position_and_resume_continues() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(2))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(1000);
    h.sim.frame(generation);
    assert!(h.sim.pause_mission());
    assert!(!h.sim.pause_mission());
    let paused_progress = progress_of(&h.store, "m-1");

    h.clock.advance_ms(60_000);
    assert_eq!(h.sim.frame(generation), Frame::Finished);
    assert_eq!(progress_of(&h.store, "m-1"), paused_progress);
    let snap = h.sim.snapshot().unwrap();
    assert!(snap.paused);
    assert_eq!(
        h.store.get_mission("m-1").unwrap().status,
        MissionStatus::InProgress
    );

    let resumed = h.sim.resume_mission().unwrap();
    assert_ne!(resumed, generation);
    h.clock.advance_ms(500);
    assert_eq!(h.sim.frame(resumed), Frame::Continue);
    let snap = h.sim.snapshot().unwrap();
    assert!((snap.position.lon - 0.5).abs() < 1e-9);
    assert!((snap.progress - 50.0).abs() < 1e-9);
}

#[test]
fn resume_without_pause_is_rejected() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(2))]);
    assert_eq!(
        h.sim.resume_mission().unwrap_err(),
        SimulationError::NothingToResume
    );
}

#[test]
fn start_on_paused_mission_resumes() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(2))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();
    h.clock.advance_ms(1200);
    h.sim.frame(generation);
    h.sim.pause_mission();

    let next = h.sim.start_mission("m-1").unwrap().unwrap();
    assert!(h.sim.is_animating());
    assert_eq!(next, h.sim.generation());
    assert_eq!(h.store.get_mission("m-1").unwrap().started_at, Some(t0()));
}

#[test]
fn selecting_another_mission_stops_previous_animation() {
    let mut h = harness(
        vec![drone("d-1"), drone("d-2")],
        vec![
            mission("a", "d-1", line(3)),
            mission("b", "d-2", line(3)),
        ],
    );
    let b_generation = h.sim.start_mission("b").unwrap().unwrap();
    h.clock.advance_ms(1500);
    h.sim.frame(b_generation);
    let b_before = h.store.get_mission("b").unwrap();

    h.sim.select_mission(Some("a")).unwrap();
    assert_eq!(h.sim.selected_mission_id(), Some("a"));
    assert_eq!(h.store.get_mission("b").unwrap(), b_before);
    assert_eq!(h.store.get_mission("a").unwrap().status, MissionStatus::Planned);

    h.clock.advance_ms(1500);
    assert_eq!(h.sim.frame(b_generation), Frame::Finished);
    assert_eq!(h.store.get_mission("b").unwrap(), b_before);
    assert!(h.sim.snapshot().is_none());
}

#[test]
fn starting_a_cancels_b_and_b_picks_up_from_stored_progress() {
    let mut seeded_b = mission("b", "d-2", line(2));
    seeded_b.status = MissionStatus::InProgress;
    seeded_b.started_at = Some(t0() - Duration::minutes(5));
    seeded_b.progress = 40.0;

    let mut h = harness(
        vec![drone("d-1"), drone("d-2")],
        vec![mission("a", "d-1", line(2)), seeded_b],
    );

    h.sim.select_mission(Some("a")).unwrap();
    assert_eq!(progress_of(&h.store, "b"), 40.0);

    let b_generation = h.sim.start_mission("b").unwrap().unwrap();
    let snap = h.sim.snapshot().unwrap();
    assert_eq!(snap.mission_id, "b");
    assert!((snap.progress - 40.0).abs() < 1e-9);
    assert!((snap.position.lon - 0.4).abs() < 1e-9);

    h.clock.advance_ms(1500);
    h.sim.frame(b_generation);
    assert!((progress_of(&h.store, "b") - 90.0).abs() < 1e-9);
    assert_eq!(
        h.store.get_mission("b").unwrap().started_at,
        Some(t0() - Duration::minutes(5))
    );

    let a_generation = h.sim.start_mission("a").unwrap().unwrap();
    assert_ne!(a_generation, b_generation);
    let b_frozen = h.store.get_mission("b").unwrap();
    h.clock.advance_ms(3000);
    assert_eq!(h.sim.frame(b_generation), Frame::Finished);
    assert_eq!(h.store.get_mission("b").unwrap(), b_frozen);
    assert_eq!(h.sim.frame(a_generation), Frame::Finished);
    assert_eq!(
        h.store.get_mission("a").unwrap().status,
        MissionStatus::Completed
    );
    assert_eq!(
        h.store.get_mission("b").unwrap().status,
        MissionStatus::InProgress
    );
}

#[test]
fn unknown_drone_still_animates() {
    let mut h = harness(vec![], vec![mission("m-1", "ghost", line(2))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(1500);
    assert_eq!(h.sim.frame(generation), Frame::Continue);
    assert!((h.sim.snapshot().unwrap().position.lon - 0.5).abs() < 1e-9);

    h.clock.advance_ms(1500);
    assert_eq!(h.sim.frame(generation), Frame::Finished);
    assert_eq!(
        h.store.get_mission("m-1").unwrap().status,
        MissionStatus::Completed
    );
    assert!(h.store.drones().is_empty());
}

#[test]
fn clock_moving_backwards_does_not_rewind() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(2))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(1500);
    h.sim.frame(generation);
    h.clock.set(t0() - Duration::seconds(30));
    assert_eq!(h.sim.frame(generation), Frame::Continue);

    let snap = h.sim.snapshot().unwrap();
    assert!((snap.progress - 50.0).abs() < 1e-9);
    assert!((snap.position.lon - 0.5).abs() < 1e-9);
    assert!((progress_of(&h.store, "m-1") - 50.0).abs() < 1e-9);
}

#[test]
fn external_abort_ends_the_loop_without_writes() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(3))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(1000);
    assert_eq!(h.sim.frame(generation), Frame::Continue);
    let published = progress_of(&h.store, "m-1");
    assert!(published > 0.0 && published < 100.0);

    // another operator aborts the mission directly through the store
    assert_eq!(
        h.store.update_mission(
            "m-1",
            MissionUpdate::status(MissionStatus::Aborted).with_completed_at(h.clock_now()),
        ),
        Ok(true)
    );
    assert!(h.store.update_drone_status("d-1", DroneStatus::Available));
    let frozen = h.store.get_mission("m-1").unwrap();
    assert!(frozen.is_valid());
    assert_eq!(frozen.progress, published);

    h.clock.advance_ms(1000);
    assert_eq!(h.sim.frame(generation), Frame::Finished);
    assert!(!h.sim.is_animating());
    assert!(h.sim.snapshot().is_none());

    h.clock.advance_ms(5000);
    assert_eq!(h.sim.frame(generation), Frame::Finished);
    assert_eq!(h.store.get_mission("m-1").unwrap(), frozen);
    assert_eq!(h.store.get_drone("d-1").unwrap().status, DroneStatus::Available);
}

#[test]
fn rejected_external_write_leaves_the_run_intact() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(3))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(1000);
    h.sim.frame(generation);
    let before = h.store.get_mission("m-1").unwrap();

    assert!(h
        .store
        .update_mission("m-1", MissionUpdate::progress(5.0))
        .is_err());
    assert!(h
        .store
        .update_mission("m-1", MissionUpdate::status(MissionStatus::Completed))
        .is_err());
    assert_eq!(h.store.get_mission("m-1").unwrap(), before);

    let mut frames = 0;
    while h.sim.frame(generation) == Frame::Continue {
        h.clock.advance_ms(500);
        frames += 1;
        assert!(frames < 100, "mission never completed");
    }
    let done = h.store.get_mission("m-1").unwrap();
    assert_eq!(done.status, MissionStatus::Completed);
    assert_eq!(done.progress, 100.0);
    assert!(done.is_valid());
}

#[test]
fn snapshot_tracks_traversed_path() {
    let mut h = harness(vec![drone("d-1")], vec![mission("m-1", "d-1", line(4))]);
    let generation = h.sim.start_mission("m-1").unwrap().unwrap();

    h.clock.advance_ms(3000);
    h.sim.frame(generation);
    h.clock.advance_ms(1500);
    h.sim.frame(generation);

    let snap = h.sim.snapshot().unwrap();
    assert_eq!(snap.waypoint_index, 1);
    assert_eq!(
        snap.traversed_path,
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(0.0, 1.5),
        ]
    );
}

impl Harness {
    fn clock_now(&self) -> DateTime<Utc> {
        use survey_core::Clock;
        self.clock.now()
    }
}
