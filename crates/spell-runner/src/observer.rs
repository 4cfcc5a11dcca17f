//! Receivers for the runner's step, torch and end notifications.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use spell_types::{Position, RunOutcome, TorchState};

/// Receives a run's progress. All three methods are called from
/// [`MovementRunner::tick`](crate::MovementRunner::tick), never re-entrantly.
pub trait RunObserver {
    /// The avatar moved onto `position`.
    fn on_step(&mut self, position: Position);

    /// A torch was lit; `torches` is the full board after the change.
    fn on_torch_update(&mut self, torches: &[TorchState]);

    /// The run finished. Called exactly once per run, and never after a stop.
    fn on_end(&mut self, outcome: &RunOutcome);
}

impl<O: RunObserver + ?Sized> RunObserver for &mut O {
    fn on_step(&mut self, position: Position) {
        (**self).on_step(position);
    }

    fn on_torch_update(&mut self, torches: &[TorchState]) {
        (**self).on_torch_update(torches);
    }

    fn on_end(&mut self, outcome: &RunOutcome) {
        (**self).on_end(outcome);
    }
}

impl<O: RunObserver + ?Sized> RunObserver for Box<O> {
    fn on_step(&mut self, position: Position) {
        (**self).on_step(position);
    }

    fn on_torch_update(&mut self, torches: &[TorchState]) {
        (**self).on_torch_update(torches);
    }

    fn on_end(&mut self, outcome: &RunOutcome) {
        (**self).on_end(outcome);
    }
}

/// Shared observers let the host read what happened between ticks.
impl<O: RunObserver> RunObserver for Rc<RefCell<O>> {
    fn on_step(&mut self, position: Position) {
        self.borrow_mut().on_step(position);
    }

    fn on_torch_update(&mut self, torches: &[TorchState]) {
        self.borrow_mut().on_torch_update(torches);
    }

    fn on_end(&mut self, outcome: &RunOutcome) {
        self.borrow_mut().on_end(outcome);
    }
}

/// Adapts three closures into a [`RunObserver`].
pub struct Callbacks<S, T, E> {
    on_step: S,
    on_torch_update: T,
    on_end: E,
}

impl<S, T, E> Callbacks<S, T, E>
where
    S: FnMut(Position),
    T: FnMut(&[TorchState]),
    E: FnMut(&RunOutcome),
{
    pub fn new(on_step: S, on_torch_update: T, on_end: E) -> Self {
        Self {
            on_step,
            on_torch_update,
            on_end,
        }
    }
}

impl<S, T, E> RunObserver for Callbacks<S, T, E>
where
    S: FnMut(Position),
    T: FnMut(&[TorchState]),
    E: FnMut(&RunOutcome),
{
    fn on_step(&mut self, position: Position) {
        (self.on_step)(position);
    }

    fn on_torch_update(&mut self, torches: &[TorchState]) {
        (self.on_torch_update)(torches);
    }

    fn on_end(&mut self, outcome: &RunOutcome) {
        (self.on_end)(outcome);
    }
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RunEvent {
    Step { position: Position },
    TorchUpdate { torches: Vec<TorchState> },
    End { outcome: RunOutcome },
}

/// Records every notification in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<RunEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Take the events recorded since the last drain.
    pub fn drain(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.events)
    }

    /// Positions from every step event, in order.
    pub fn steps(&self) -> Vec<Position> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Step { position } => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn outcomes(&self) -> Vec<&RunOutcome> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RunEvent::End { outcome } => Some(outcome),
                _ => None,
            })
            .collect()
    }
}

impl RunObserver for EventLog {
    fn on_step(&mut self, position: Position) {
        self.events.push(RunEvent::Step { position });
    }

    fn on_torch_update(&mut self, torches: &[TorchState]) {
        self.events.push(RunEvent::TorchUpdate {
            torches: torches.to_vec(),
        });
    }

    fn on_end(&mut self, outcome: &RunOutcome) {
        self.events.push(RunEvent::End {
            outcome: outcome.clone(),
        });
    }
}
