//! Survey Runner - fly one mission from the demo fleet and report the result.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{interval, Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_core::{mission_history, FleetStore, FleetSummary, Mission, MissionReport, SystemClock};
use survey_runner::{seed, Config, Session};

const CONTROL_TICK_MS: u64 = 100;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Mission to fly
    #[arg(long, default_value = seed::DEMO_PLANNED_MISSION)]
    mission: String,

    /// Milliseconds per segment (overrides SURVEY_SEGMENT_MS)
    #[arg(long)]
    segment_ms: Option<u64>,

    /// Milliseconds between frames (overrides SURVEY_FRAME_INTERVAL_MS)
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Pause the mission after this many milliseconds
    #[arg(long)]
    pause_after_ms: Option<u64>,

    /// How long to stay paused before resuming
    #[arg(long, default_value_t = 2000)]
    pause_for_ms: u64,

    /// Abort the mission after this many milliseconds
    #[arg(long)]
    abort_after_ms: Option<u64>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RunReport {
    mission: Option<Mission>,
    stats: MissionReport,
    fleet: FleetSummary,
    history: Vec<Mission>,
}

#[derive(Debug, Clone, Copy)]
enum PauseState {
    Pending,
    Paused { since_ms: u64 },
    Done,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(ms) = args.segment_ms {
        config.simulation.segment_duration_ms = ms;
    }
    if let Some(ms) = args.frame_ms {
        config.frame_interval_ms = ms;
    }

    init_tracing(config.log_json)?;
    tracing::info!(
        mission = %args.mission,
        segment_ms = config.simulation.segment_duration_ms,
        frame_ms = config.frame_interval_ms,
        "Starting survey runner..."
    );

    let store = Arc::new(FleetStore::new());
    seed::seed_store(&store, Utc::now()).context("seeding demo fleet")?;

    let mut session = Session::new(store.clone(), Arc::new(SystemClock), &config);
    session
        .start(&args.mission)
        .with_context(|| format!("starting mission {}", args.mission))?;

    run_until_done(&mut session, &args).await?;

    let stats = session.stats();
    let report = RunReport {
        mission: store.get_mission(&args.mission),
        stats: stats.report(),
        fleet: session.fleet_summary(),
        history: mission_history(&store.missions()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(mission) = &report.mission {
            tracing::info!(
                mission = %mission.id,
                status = ?mission.status,
                progress = mission.progress,
                "Mission finished"
            );
        }
        tracing::info!(
            total = report.stats.total_missions,
            completed = report.stats.completed_missions,
            aborted = report.stats.aborted_missions,
            flight_time_min = report.stats.total_flight_time_min,
            distance_km = report.stats.total_distance_km,
            success_rate = report.stats.success_rate_pct,
            "Survey statistics"
        );
    }

    Ok(())
}

async fn run_until_done(session: &mut Session, args: &Args) -> Result<()> {
    let started = Instant::now();
    let mut ticker = interval(Duration::from_millis(CONTROL_TICK_MS));
    let mut pause = match args.pause_after_ms {
        Some(_) => PauseState::Pending,
        None => PauseState::Done,
    };
    let mut last_waypoint = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::warn!("Interrupted, aborting mission");
                if let Err(e) = session.abort(&args.mission) {
                    tracing::warn!("Abort on interrupt failed: {}", e);
                }
                return Ok(());
            }
            _ = ticker.tick() => {
                let elapsed_ms = started.elapsed().as_millis() as u64;

                if let Some(snapshot) = session.snapshot() {
                    if last_waypoint != Some(snapshot.waypoint_index) {
                        last_waypoint = Some(snapshot.waypoint_index);
                        tracing::info!(
                            waypoint = snapshot.waypoint_index,
                            lat = snapshot.position.lat,
                            lon = snapshot.position.lon,
                            progress = snapshot.progress,
                            "Mission position"
                        );
                    }
                }

                if args.abort_after_ms.is_some_and(|at| elapsed_ms >= at) {
                    session.abort(&args.mission).context("aborting mission")?;
                    return Ok(());
                }

                match pause {
                    PauseState::Pending if args.pause_after_ms.is_some_and(|at| elapsed_ms >= at) => {
                        if session.pause()? {
                            pause = PauseState::Paused { since_ms: elapsed_ms };
                        } else {
                            pause = PauseState::Done;
                        }
                    }
                    PauseState::Paused { since_ms } if elapsed_ms >= since_ms + args.pause_for_ms => {
                        session.resume().context("resuming mission")?;
                        pause = PauseState::Done;
                    }
                    _ => {}
                }

                let finished = session
                    .store()
                    .get_mission(&args.mission)
                    .map_or(true, |m| m.status.is_terminal());
                if finished {
                    return Ok(());
                }
            }
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("survey_runner=debug".parse()?)
        .add_directive("survey_core=info".parse()?);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}
