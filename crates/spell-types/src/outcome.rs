//! Terminal outcomes of a run and their learner-facing diagnostics.
//!
//! The wording here is part of the host contract: UI effects (the wall
//! collision shake, the torch reminder) are keyed off [`FailReason`], and the
//! sentences are shown verbatim.

use serde::{Deserialize, Serialize};

use crate::error::SpellError;
use crate::maze::Position;

/// Why a run ended without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailReason {
    /// A move targeted a wall or left the grid. `at` is the rejected destination.
    WallCollision { at: Position },
    /// The actions ran out on a goal tile with torches still unlit.
    TorchesUnlit { unlit: usize },
    /// The actions ran out away from any goal tile.
    GoalNotReached,
}

impl FailReason {
    pub fn message(&self) -> String {
        match self {
            FailReason::WallCollision { at } => format!(
                "You hit a wall at position ({}, {}). Your spell needs adjusting!",
                at.x, at.y
            ),
            FailReason::TorchesUnlit { unlit: 1 } => {
                "You reached the goal, but 1 torch is still unlit. \
                 Light every torch before finishing!"
                    .to_string()
            }
            FailReason::TorchesUnlit { unlit } => format!(
                "You reached the goal, but {unlit} torches are still unlit. \
                 Light every torch before finishing!"
            ),
            FailReason::GoalNotReached => {
                "Your spell finished, but you didn't reach the goal. Try a different approach!"
                    .to_string()
            }
        }
    }
}

/// How a run, or an attempt to start one, ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum RunOutcome {
    Success,
    Fail { reason: FailReason, message: String },
    /// The spell never produced a runnable action list.
    Error { message: String },
}

impl RunOutcome {
    pub fn fail(reason: FailReason) -> Self {
        RunOutcome::Fail {
            message: reason.message(),
            reason,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    pub fn fail_reason(&self) -> Option<FailReason> {
        match self {
            RunOutcome::Fail { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// The position that caused the failure, when there is one.
    pub fn offending_position(&self) -> Option<Position> {
        match self.fail_reason() {
            Some(FailReason::WallCollision { at }) => Some(at),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RunOutcome::Success => None,
            RunOutcome::Fail { message, .. } | RunOutcome::Error { message } => Some(message),
        }
    }
}

impl From<&SpellError> for RunOutcome {
    fn from(err: &SpellError) -> Self {
        RunOutcome::Error {
            message: err.learner_message(),
        }
    }
}
