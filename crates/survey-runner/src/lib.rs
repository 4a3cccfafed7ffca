//! Survey Runner - frame-driven runtime for drone survey mission simulation.
//!
//! Hosts the per-frame scheduler, the operator session that ties the fleet
//! store to the simulation engine, configuration and the demo fleet.

pub mod clock;
pub mod config;
pub mod frame_loop;
pub mod seed;
pub mod session;

pub use clock::TokioClock;
pub use config::Config;
pub use frame_loop::FrameTask;
pub use session::{Session, SessionError};
