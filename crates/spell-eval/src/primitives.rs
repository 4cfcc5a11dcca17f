//! The approved spell commands, the binding table that exposes them, and the
//! simulated cursor they act on.

use std::collections::BTreeSet;
use std::fmt;

use spell_types::{Action, Direction, Maze, Position, RuntimeTrapError, Span};

/// Name of the only non-command global a spell can see.
pub const UNDEFINED: &str = "undefined";

/// One of the nine approved spell commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    CanMoveUp,
    CanMoveDown,
    CanMoveLeft,
    CanMoveRight,
    LightTorch,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Primitive::MoveUp,
        Primitive::MoveDown,
        Primitive::MoveLeft,
        Primitive::MoveRight,
        Primitive::CanMoveUp,
        Primitive::CanMoveDown,
        Primitive::CanMoveLeft,
        Primitive::CanMoveRight,
        Primitive::LightTorch,
    ];

    /// The name a spell uses to refer to this command.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::MoveUp => "moveUp",
            Primitive::MoveDown => "moveDown",
            Primitive::MoveLeft => "moveLeft",
            Primitive::MoveRight => "moveRight",
            Primitive::CanMoveUp => "canMoveUp",
            Primitive::CanMoveDown => "canMoveDown",
            Primitive::CanMoveLeft => "canMoveLeft",
            Primitive::CanMoveRight => "canMoveRight",
            Primitive::LightTorch => "lightTorch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// True for the `canMove*` commands, which only look at the maze.
    pub fn is_query(self) -> bool {
        matches!(
            self,
            Primitive::CanMoveUp
                | Primitive::CanMoveDown
                | Primitive::CanMoveLeft
                | Primitive::CanMoveRight
        )
    }

    /// The direction a move or query command refers to.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Primitive::MoveUp | Primitive::CanMoveUp => Some(Direction::Up),
            Primitive::MoveDown | Primitive::CanMoveDown => Some(Direction::Down),
            Primitive::MoveLeft | Primitive::CanMoveLeft => Some(Direction::Left),
            Primitive::MoveRight | Primitive::CanMoveRight => Some(Direction::Right),
            Primitive::LightTorch => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Binding table
// ══════════════════════════════════════════════════════════════════════════════

/// The allowlist of names a spell may resolve besides its own declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    primitives: BTreeSet<Primitive>,
}

impl BindingTable {
    /// All nine commands.
    pub fn standard() -> Self {
        Self {
            primitives: Primitive::ALL.into_iter().collect(),
        }
    }

    /// Only the named commands. Names that are not commands are ignored.
    pub fn restricted<'a>(allowed: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            primitives: allowed
                .into_iter()
                .filter_map(Primitive::from_name)
                .collect(),
        }
    }

    /// The command bound to `name`, if it is in the table.
    pub fn lookup(&self, name: &str) -> Option<Primitive> {
        Primitive::from_name(name).filter(|p| self.primitives.contains(p))
    }

    /// True when `name` resolves without any spell declaration.
    pub fn contains(&self, name: &str) -> bool {
        name == UNDEFINED || self.lookup(name).is_some()
    }

    pub fn primitives(&self) -> impl Iterator<Item = Primitive> + '_ {
        self.primitives.iter().copied()
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Simulated cursor
// ══════════════════════════════════════════════════════════════════════════════

/// The interpreter's private idea of where the avatar will be.
///
/// Moves are recorded even when blocked; the cursor only advances through
/// [`Maze::check_step`], the same rule the runner applies.
#[derive(Debug)]
pub struct SpellCursor<'m> {
    maze: &'m Maze,
    position: Position,
    actions: Vec<Action>,
    ceiling: usize,
}

impl<'m> SpellCursor<'m> {
    pub fn new(maze: &'m Maze, start: Position, ceiling: usize) -> Self {
        Self {
            maze,
            position: start,
            actions: Vec::new(),
            ceiling,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    /// Append an action, failing once the ceiling would be passed.
    fn push(&mut self, action: Action) -> Result<(), RuntimeTrapError> {
        if self.actions.len() >= self.ceiling {
            return Err(RuntimeTrapError::ActionCeilingExceeded {
                limit: self.ceiling,
            });
        }
        self.actions.push(action);
        Ok(())
    }

    /// `moveUp()` and friends.
    pub fn step(&mut self, direction: Direction) -> Result<(), RuntimeTrapError> {
        self.push(Action::Move(direction))?;
        let check = self.maze.check_step(self.position, direction);
        if check.is_open() {
            self.position = check.destination();
        }
        Ok(())
    }

    /// `canMoveUp()` and friends.
    pub fn can_step(&self, direction: Direction) -> bool {
        self.maze.check_step(self.position, direction).is_open()
    }

    /// `lightTorch()`: only valid while standing on a torch tile.
    pub fn light_torch(&mut self, span: Span) -> Result<(), RuntimeTrapError> {
        if !self.maze.is_torch(self.position) {
            return Err(RuntimeTrapError::TorchNotUnderfoot {
                at: self.position,
                span,
            });
        }
        self.push(Action::LightTorch { at: self.position })
    }
}
