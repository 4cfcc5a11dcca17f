//! Primitive actions produced by compiling a spell, and torch bookkeeping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::maze::{Direction, Position};

/// One primitive step of a compiled spell.
///
/// Pure data: an action list can be stored, displayed, and replayed.
/// On the wire a move is `{"type":"move","dx":1,"dy":0}` and a torch is
/// `{"type":"lightTorch","at":{"x":1,"y":0}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireAction", into = "WireAction")]
pub enum Action {
    Move(Direction),
    LightTorch { at: Position },
}

impl Action {
    /// `(dx, dy)` for a move, `None` for a torch.
    pub fn delta(&self) -> Option<(i32, i32)> {
        match self {
            Action::Move(dir) => Some(dir.delta()),
            Action::LightTorch { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(dir) => {
                let (dx, dy) = dir.delta();
                write!(f, "Move({dx},{dy})")
            }
            Action::LightTorch { at } => write!(f, "LightTorch{at}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum WireAction {
    Move { dx: i32, dy: i32 },
    LightTorch { at: Position },
}

impl TryFrom<WireAction> for Action {
    type Error = String;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        match wire {
            WireAction::Move { dx, dy } => Direction::from_delta(dx, dy)
                .map(Action::Move)
                .ok_or_else(|| format!("invalid move delta ({dx}, {dy})")),
            WireAction::LightTorch { at } => Ok(Action::LightTorch { at }),
        }
    }
}

impl From<Action> for WireAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Move(dir) => {
                let (dx, dy) = dir.delta();
                WireAction::Move { dx, dy }
            }
            Action::LightTorch { at } => WireAction::LightTorch { at },
        }
    }
}

/// Lit/unlit status of one torch tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorchState {
    pub position: Position,
    pub is_lit: bool,
}

/// The torch board for one run: one entry per torch tile.
///
/// Entries only ever go from unlit to lit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorchMap(Vec<TorchState>);

impl TorchMap {
    pub fn new(states: Vec<TorchState>) -> Self {
        Self(states)
    }

    /// Light the torch at `at`. Returns `false` when no torch lives there.
    /// Lighting an already-lit torch is a no-op that still returns `true`.
    pub fn light(&mut self, at: Position) -> bool {
        match self.0.iter_mut().find(|t| t.position == at) {
            Some(torch) => {
                torch.is_lit = true;
                true
            }
            None => false,
        }
    }

    pub fn is_lit(&self, at: Position) -> bool {
        self.0.iter().any(|t| t.position == at && t.is_lit)
    }

    /// Vacuously true for a maze without torches.
    pub fn all_lit(&self) -> bool {
        self.0.iter().all(|t| t.is_lit)
    }

    pub fn unlit_count(&self) -> usize {
        self.0.iter().filter(|t| !t.is_lit).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[TorchState] {
        &self.0
    }
}

impl FromIterator<TorchState> for TorchMap {
    fn from_iter<I: IntoIterator<Item = TorchState>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let json = serde_json::to_string(&Action::Move(Direction::Right)).unwrap();
        assert_eq!(json, r#"{"type":"move","dx":1,"dy":0}"#);
        let json = serde_json::to_string(&Action::LightTorch {
            at: Position::new(1, 0),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"lightTorch","at":{"x":1,"y":0}}"#);
    }

    #[test]
    fn test_action_rejects_diagonal_move() {
        let err = serde_json::from_str::<Action>(r#"{"type":"move","dx":1,"dy":1}"#);
        assert!(err.is_err());
        let ok: Action = serde_json::from_str(r#"{"type":"move","dx":0,"dy":-1}"#).unwrap();
        assert_eq!(ok, Action::Move(Direction::Up));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Move(Direction::Left).to_string(), "Move(-1,0)");
        assert_eq!(
            Action::LightTorch {
                at: Position::new(2, 3)
            }
            .to_string(),
            "LightTorch(2, 3)"
        );
    }

    #[test]
    fn test_torch_map_lighting() {
        let mut torches: TorchMap = [Position::new(1, 0), Position::new(3, 2)]
            .into_iter()
            .map(|position| TorchState {
                position,
                is_lit: false,
            })
            .collect();
        assert_eq!(torches.unlit_count(), 2);
        assert!(torches.light(Position::new(1, 0)));
        assert!(torches.light(Position::new(1, 0)));
        assert!(!torches.light(Position::new(0, 0)));
        assert!(torches.is_lit(Position::new(1, 0)));
        assert_eq!(torches.unlit_count(), 1);
        assert!(!torches.all_lit());
        torches.light(Position::new(3, 2));
        assert!(torches.all_lit());
    }

    #[test]
    fn test_empty_torch_map_is_all_lit() {
        assert!(TorchMap::default().all_lit());
    }

    #[test]
    fn test_torch_state_json_uses_camel_case() {
        let state = TorchState {
            position: Position::new(1, 2),
            is_lit: true,
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"position":{"x":1,"y":2},"isLit":true}"#
        );
    }
}
