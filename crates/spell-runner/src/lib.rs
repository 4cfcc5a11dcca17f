//! Movement runner: replays a compiled spell against a maze.
//!
//! The runner is a timed state machine. Each committed move is checked with
//! [`Maze::check_step`](spell_types::Maze::check_step), the same rule the
//! interpreter's simulated cursor uses, and the run ends in success only when
//! the avatar stands on a goal tile with every torch lit.

mod observer;
mod runner;

pub use observer::{Callbacks, EventLog, RunEvent, RunObserver};
pub use runner::{
    start, MovementRunner, RunState, RunnerConfig, StopHandle, DEFAULT_STEP_INTERVAL_MS,
};
