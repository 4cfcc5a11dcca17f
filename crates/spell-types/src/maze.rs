//! The maze model: an immutable grid of tiles plus the adjacency rule shared
//! by the spell interpreter and the movement runner.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::action::{TorchMap, TorchState};

/// One tile of a maze. The discriminants are the numeric codes used in
/// chapter data (`0` empty, `1` wall, `2` start, `3` goal, `4` torch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tile {
    Empty = 0,
    Wall = 1,
    Start = 2,
    Goal = 3,
    Torch = 4,
}

impl Tile {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Tile {
    type Error = MazeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Tile::Empty),
            1 => Ok(Tile::Wall),
            2 => Ok(Tile::Start),
            3 => Ok(Tile::Goal),
            4 => Ok(Tile::Torch),
            other => Err(MazeError::UnknownTile(other)),
        }
    }
}

/// A grid coordinate. `(0, 0)` is the top-left tile; `y` grows downward.
///
/// Signed so that off-grid destinations (`(-1, 0)`) can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the `i32` edges. No grid is that large, so a saturated
    /// position is always off the grid.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four movement directions available to spells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(dx, dy)` for this direction; exactly one component is non-zero.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Inverse of [`Direction::delta`].
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Result of asking the maze whether a single step may be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCheck {
    /// The destination is in bounds and not a wall.
    Open(Position),
    /// The destination is a wall or off the grid.
    Blocked(Position),
}

impl StepCheck {
    pub fn is_open(self) -> bool {
        matches!(self, StepCheck::Open(_))
    }

    pub fn destination(self) -> Position {
        match self {
            StepCheck::Open(p) | StepCheck::Blocked(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MazeError {
    #[error("maze has no rows")]
    Empty,
    #[error("maze row {row} has {found} tiles, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown tile code {0}")]
    UnknownTile(u8),
}

/// A rectangular, read-only tile grid for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Maze {
    width: usize,
    height: usize,
    /// Row-major tiles.
    tiles: Vec<Tile>,
}

impl Maze {
    /// Build a maze from rows of tiles. All rows must have the same length.
    pub fn from_tiles(rows: Vec<Vec<Tile>>) -> Result<Self, MazeError> {
        let width = rows.first().map(Vec::len).ok_or(MazeError::Empty)?;
        if width == 0 {
            return Err(MazeError::Empty);
        }
        let height = rows.len();
        let mut tiles = Vec::with_capacity(width * height);
        for (row, cells) in rows.into_iter().enumerate() {
            if cells.len() != width {
                return Err(MazeError::Ragged {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
            tiles.extend(cells);
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Build a maze from numeric tile codes, as stored in chapter data.
    pub fn from_codes(rows: Vec<Vec<u8>>) -> Result<Self, MazeError> {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Tile::try_from).collect())
            .collect::<Result<Vec<Vec<Tile>>, _>>()?;
        Self::from_tiles(rows)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    /// The tile at `pos`, or `None` when off the grid.
    pub fn tile(&self, pos: Position) -> Option<Tile> {
        self.index(pos).map(|i| self.tiles[i])
    }

    /// The single validity rule for entering a tile: in bounds and not a wall.
    pub fn is_passable(&self, pos: Position) -> bool {
        matches!(self.tile(pos), Some(tile) if tile != Tile::Wall)
    }

    /// Check one step from `from` in `direction`.
    ///
    /// Both the interpreter's simulated cursor and the runner commit moves
    /// through this function, so the two can never disagree.
    pub fn check_step(&self, from: Position, direction: Direction) -> StepCheck {
        let (dx, dy) = direction.delta();
        let dest = from.offset(dx, dy);
        if self.is_passable(dest) {
            StepCheck::Open(dest)
        } else {
            StepCheck::Blocked(dest)
        }
    }

    pub fn is_goal(&self, pos: Position) -> bool {
        self.tile(pos) == Some(Tile::Goal)
    }

    pub fn is_torch(&self, pos: Position) -> bool {
        self.tile(pos) == Some(Tile::Torch)
    }

    /// All positions holding `kind`, in row-major order.
    pub fn positions_of(&self, kind: Tile) -> impl Iterator<Item = Position> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter(move |(_, &t)| t == kind)
            .map(|(i, _)| Position::new((i % self.width) as i32, (i / self.width) as i32))
    }

    /// The first Start tile, if the maze has one.
    pub fn start_position(&self) -> Option<Position> {
        self.positions_of(Tile::Start).next()
    }

    pub fn goal_positions(&self) -> Vec<Position> {
        self.positions_of(Tile::Goal).collect()
    }

    pub fn torch_positions(&self) -> Vec<Position> {
        self.positions_of(Tile::Torch).collect()
    }

    /// One unlit entry per torch tile, ready for a fresh run.
    pub fn fresh_torches(&self) -> TorchMap {
        self.positions_of(Tile::Torch)
            .map(|position| TorchState {
                position,
                is_lit: false,
            })
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(self.width)
    }
}

impl TryFrom<Vec<Vec<u8>>> for Maze {
    type Error = MazeError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Maze::from_codes(rows)
    }
}

impl From<Maze> for Vec<Vec<u8>> {
    fn from(maze: Maze) -> Self {
        maze.rows()
            .map(|row| row.iter().map(|t| t.code()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torch_corridor() -> Maze {
        Maze::from_codes(vec![vec![2, 4, 3], vec![1, 0, 1]]).unwrap()
    }

    #[test]
    fn test_from_codes_dimensions() {
        let maze = torch_corridor();
        assert_eq!(maze.width(), 3);
        assert_eq!(maze.height(), 2);
        assert_eq!(maze.tile(Position::new(1, 0)), Some(Tile::Torch));
        assert_eq!(maze.tile(Position::new(0, 1)), Some(Tile::Wall));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Maze::from_codes(vec![vec![2, 0, 3], vec![0, 0]]).unwrap_err();
        assert_eq!(
            err,
            MazeError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_rejects_unknown_tile_and_empty() {
        assert_eq!(
            Maze::from_codes(vec![vec![2, 9]]).unwrap_err(),
            MazeError::UnknownTile(9)
        );
        assert_eq!(Maze::from_codes(vec![]).unwrap_err(), MazeError::Empty);
        assert_eq!(Maze::from_codes(vec![vec![]]).unwrap_err(), MazeError::Empty);
    }

    #[test]
    fn test_passability() {
        let maze = torch_corridor();
        assert!(maze.is_passable(Position::new(0, 0)));
        assert!(maze.is_passable(Position::new(1, 0)));
        assert!(!maze.is_passable(Position::new(0, 1)));
        assert!(!maze.is_passable(Position::new(-1, 0)));
        assert!(!maze.is_passable(Position::new(3, 0)));
        assert!(!maze.is_passable(Position::new(0, 2)));
    }

    #[test]
    fn test_check_step() {
        let maze = torch_corridor();
        let start = Position::new(0, 0);
        assert_eq!(
            maze.check_step(start, Direction::Right),
            StepCheck::Open(Position::new(1, 0))
        );
        assert_eq!(
            maze.check_step(start, Direction::Left),
            StepCheck::Blocked(Position::new(-1, 0))
        );
        assert_eq!(
            maze.check_step(start, Direction::Down),
            StepCheck::Blocked(Position::new(0, 1))
        );
    }

    #[test]
    fn test_check_step_at_coordinate_limits() {
        let maze = torch_corridor();
        let edge = Position::new(i32::MAX, i32::MIN);
        assert_eq!(
            maze.check_step(edge, Direction::Right),
            StepCheck::Blocked(edge)
        );
        assert_eq!(
            maze.check_step(edge, Direction::Up),
            StepCheck::Blocked(edge)
        );
        assert_eq!(
            maze.check_step(edge, Direction::Left),
            StepCheck::Blocked(Position::new(i32::MAX - 1, i32::MIN))
        );
    }

    #[test]
    fn test_derived_positions() {
        let maze = torch_corridor();
        assert_eq!(maze.start_position(), Some(Position::new(0, 0)));
        assert_eq!(maze.goal_positions(), vec![Position::new(2, 0)]);
        assert_eq!(maze.torch_positions(), vec![Position::new(1, 0)]);
        let torches = maze.fresh_torches();
        assert_eq!(torches.len(), 1);
        assert!(!torches.all_lit());
    }

    #[test]
    fn test_direction_delta_round_trip() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.delta();
            assert_eq!(dx.abs() + dy.abs(), 1);
            assert_eq!(Direction::from_delta(dx, dy), Some(dir));
        }
        assert_eq!(Direction::from_delta(1, 1), None);
        assert_eq!(Direction::from_delta(0, 0), None);
    }

    #[test]
    fn test_maze_json_is_a_numeric_grid() {
        let maze: Maze = serde_json::from_str("[[2,0,3]]").unwrap();
        assert_eq!(maze.width(), 3);
        assert_eq!(serde_json::to_string(&maze).unwrap(), "[[2,0,3]]");
        assert!(serde_json::from_str::<Maze>("[[2,7]]").is_err());
    }
}
