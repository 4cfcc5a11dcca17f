//! The movement runner state machine.
//!
//! ```text
//! Idle ──start──▶ Running ──▶ Succeeded | Failed | Stopped
//! ```
//!
//! The host drives the runner by calling [`MovementRunner::tick`] from its
//! animation loop with the time since the previous frame. At most one action
//! is committed per tick, once enough time has accumulated.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spell_types::{
    Action, FailReason, Maze, Position, RunOutcome, StepCheck, TorchMap, TorchState,
};

use crate::observer::{Callbacks, RunObserver};

/// Default pause between two committed actions.
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunnerConfig {
    pub step_interval_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
        }
    }
}

impl RunnerConfig {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Stopped
        )
    }
}

/// Cancels one run. Cheap to clone; stopping twice, or after the run has
/// already ended, does nothing.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Rc<Cell<bool>>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Replays an action list against a maze, one action per step interval.
///
/// Owns the avatar position and the torch board for the duration of a run;
/// observers only ever see copies.
pub struct MovementRunner<O> {
    config: RunnerConfig,
    state: RunState,
    actions: Vec<Action>,
    next_action: usize,
    maze: Option<Arc<Maze>>,
    position: Position,
    torches: TorchMap,
    observer: Option<O>,
    accumulated: Duration,
    stop: StopHandle,
    outcome: Option<RunOutcome>,
}

impl<O: RunObserver> MovementRunner<O> {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            state: RunState::Idle,
            actions: Vec::new(),
            next_action: 0,
            maze: None,
            position: Position::new(0, 0),
            torches: TorchMap::default(),
            observer: None,
            accumulated: Duration::ZERO,
            stop: StopHandle::new(),
            outcome: None,
        }
    }

    /// Begin replaying `actions` from `initial`.
    ///
    /// Callers should stop an active run first. If they do not, the old run
    /// is cancelled without notifying its observer.
    pub fn start(
        &mut self,
        actions: Vec<Action>,
        initial: Position,
        maze: Arc<Maze>,
        torches: TorchMap,
        observer: O,
    ) -> StopHandle {
        if self.state == RunState::Running {
            tracing::warn!(
                remaining = self.remaining_actions(),
                "run started while another is still active"
            );
            self.stop.stop();
        }

        tracing::debug!(actions = actions.len(), %initial, torches = torches.len(), "run started");
        self.stop = StopHandle::new();
        self.state = RunState::Running;
        self.actions = actions;
        self.next_action = 0;
        self.maze = Some(maze);
        self.position = initial;
        self.torches = torches;
        self.observer = Some(observer);
        self.accumulated = Duration::ZERO;
        self.outcome = None;
        self.stop.clone()
    }

    /// Advance the clock by `elapsed`, committing at most one action.
    pub fn tick(&mut self, elapsed: Duration) -> RunState {
        if self.state != RunState::Running {
            return self.state;
        }
        if self.stop.is_stopped() {
            self.halt();
            return self.state;
        }

        let interval = self.config.step_interval();
        self.accumulated += elapsed;
        if self.accumulated < interval {
            return self.state;
        }
        // Keep the jitter, but never bank more than one extra step.
        self.accumulated = (self.accumulated - interval).min(interval);
        self.step();
        self.state
    }

    /// Cancel the current run, if any. No callback fires afterwards.
    pub fn stop(&mut self) {
        self.stop.stop();
        if self.state == RunState::Running {
            self.halt();
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn torches(&self) -> &[TorchState] {
        self.torches.as_slice()
    }

    /// How the last run ended, once it has.
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn remaining_actions(&self) -> usize {
        self.actions.len().saturating_sub(self.next_action)
    }

    fn step(&mut self) {
        let Some(maze) = self.maze.clone() else {
            return;
        };
        let Some(action) = self.actions.get(self.next_action).copied() else {
            self.finish_exhausted(&maze);
            return;
        };
        self.next_action += 1;

        match action {
            Action::Move(direction) => match maze.check_step(self.position, direction) {
                StepCheck::Blocked(at) => {
                    self.finish(RunOutcome::fail(FailReason::WallCollision { at }));
                }
                StepCheck::Open(to) => {
                    self.position = to;
                    tracing::trace!(position = %to, "step");
                    if !self.notify(|o| o.on_step(to)) {
                        return;
                    }
                    if maze.is_goal(to) && self.torches.all_lit() {
                        self.finish(RunOutcome::Success);
                    }
                }
            },
            Action::LightTorch { at } => {
                self.torches.light(at);
                tracing::trace!(position = %at, unlit = self.torches.unlit_count(), "torch lit");
                let torches = self.torches.clone();
                self.notify(|o| o.on_torch_update(torches.as_slice()));
            }
        }
    }

    fn finish_exhausted(&mut self, maze: &Maze) {
        let outcome = if !maze.is_goal(self.position) {
            RunOutcome::fail(FailReason::GoalNotReached)
        } else if self.torches.all_lit() {
            RunOutcome::Success
        } else {
            RunOutcome::fail(FailReason::TorchesUnlit {
                unlit: self.torches.unlit_count(),
            })
        };
        self.finish(outcome);
    }

    /// Deliver a callback. Returns `false` if the observer stopped the run.
    fn notify(&mut self, f: impl FnOnce(&mut O)) -> bool {
        if let Some(observer) = self.observer.as_mut() {
            f(observer);
        }
        if self.stop.is_stopped() {
            self.halt();
            false
        } else {
            true
        }
    }

    fn finish(&mut self, outcome: RunOutcome) {
        self.state = if outcome.is_success() {
            RunState::Succeeded
        } else {
            RunState::Failed
        };
        tracing::debug!(state = ?self.state, ?outcome, "run ended");
        if let Some(mut observer) = self.observer.take() {
            observer.on_end(&outcome);
        }
        self.outcome = Some(outcome);
    }

    fn halt(&mut self) {
        tracing::debug!(remaining = self.remaining_actions(), "run stopped");
        self.state = RunState::Stopped;
        self.observer = None;
    }
}

impl<O: RunObserver> Default for MovementRunner<O> {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

/// Start a run with closure callbacks and the default pacing.
///
/// The returned runner must be ticked by the host.
pub fn start<S, T, E>(
    actions: Vec<Action>,
    initial: Position,
    maze: Arc<Maze>,
    torches: TorchMap,
    on_step: S,
    on_torch_update: T,
    on_end: E,
) -> (MovementRunner<Callbacks<S, T, E>>, StopHandle)
where
    S: FnMut(Position),
    T: FnMut(&[TorchState]),
    E: FnMut(&RunOutcome),
{
    let mut runner = MovementRunner::default();
    let handle = runner.start(
        actions,
        initial,
        maze,
        torches,
        Callbacks::new(on_step, on_torch_update, on_end),
    );
    (runner, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventLog;
    use spell_types::Direction;

    const STEP: Duration = Duration::from_millis(DEFAULT_STEP_INTERVAL_MS);

    fn line() -> Arc<Maze> {
        Arc::new(Maze::from_codes(vec![vec![2, 0, 3]]).unwrap())
    }

    #[test]
    fn test_new_runner_is_idle() {
        let mut runner: MovementRunner<EventLog> = MovementRunner::default();
        assert_eq!(runner.state(), RunState::Idle);
        assert_eq!(runner.tick(STEP), RunState::Idle);
        runner.stop();
        assert_eq!(runner.state(), RunState::Idle);
    }

    #[test]
    fn test_accumulator_is_capped() {
        let mut log = EventLog::new();
        let mut runner = MovementRunner::default();
        runner.start(
            vec![Action::Move(Direction::Right); 2],
            Position::new(0, 0),
            line(),
            TorchMap::default(),
            &mut log,
        );
        // A long stall commits one action and banks at most one interval.
        runner.tick(STEP * 10);
        assert_eq!(runner.position(), Position::new(1, 0));
        assert_eq!(runner.accumulated, STEP);
        runner.tick(Duration::ZERO);
        assert_eq!(runner.position(), Position::new(2, 0));
        assert_eq!(runner.state(), RunState::Succeeded);
    }

    #[test]
    fn test_config_json() {
        let config: RunnerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.step_interval(), STEP);
        let config: RunnerConfig = serde_json::from_str(r#"{"stepIntervalMs":50}"#).unwrap();
        assert_eq!(config.step_interval_ms, 50);
    }
}
