//! Chapters: a maze plus the teaching material and rules that go with it.

use serde::{Deserialize, Serialize};
use spell_types::{Action, Maze, Position, SpellError, Tile};
use thiserror::Error;

use crate::requirements::{check_required_commands, RequirementReport};
use crate::{compile_with_options, CompileOptions};

#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("invalid chapter data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate chapter id `{0}`")]
    DuplicateId(String),
}

/// One lesson of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub maze: Maze,
    /// Overrides the maze's start tile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position: Option<Position>,
    #[serde(default)]
    pub hints: Vec<String>,
    /// Concepts the spell must use, see [`check_required_commands`].
    #[serde(default)]
    pub required_commands: Vec<String>,
    /// Commands the spell may call. Empty means all of them.
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chapter_id: Option<String>,
    #[serde(default)]
    pub introductory_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_solution: Option<String>,
    #[serde(default)]
    pub success_message: String,
}

/// What [`Chapter::attempt`] found out about a spell before it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub actions: Result<Vec<Action>, SpellError>,
    pub requirements: RequirementReport,
}

impl Attempt {
    /// Compiled cleanly and used every required concept.
    pub fn is_ready(&self) -> bool {
        self.actions.is_ok() && self.requirements.all_met
    }
}

impl Chapter {
    pub fn from_json(json: &str) -> Result<Self, ChapterError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Explicit start, else the maze's start tile, else the top-left corner.
    pub fn start_position(&self) -> Position {
        self.start_position
            .or_else(|| self.maze.start_position())
            .unwrap_or(Position::new(0, 0))
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            allowed_commands: (!self.allowed_commands.is_empty())
                .then(|| self.allowed_commands.iter().cloned().collect()),
            ..CompileOptions::default()
        }
    }

    /// Compile a spell under this chapter's rules and check its requirements.
    pub fn attempt(&self, source: &str) -> Attempt {
        let _span = tracing::debug_span!("attempt", chapter = %self.id).entered();
        Attempt {
            actions: compile_with_options(
                source,
                &self.maze,
                self.start_position(),
                &self.compile_options(),
            ),
            requirements: check_required_commands(source, self.required_commands.as_slice()),
        }
    }

    pub fn torch_count(&self) -> usize {
        self.maze.positions_of(Tile::Torch).count()
    }
}

/// Chapters in play order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterBook {
    chapters: Vec<Chapter>,
}

impl ChapterBook {
    pub fn new(chapters: Vec<Chapter>) -> Result<Self, ChapterError> {
        for (i, chapter) in chapters.iter().enumerate() {
            if chapters[..i].iter().any(|c| c.id == chapter.id) {
                return Err(ChapterError::DuplicateId(chapter.id.clone()));
            }
        }
        Ok(Self { chapters })
    }

    /// Parse a JSON array of chapters.
    pub fn from_json(json: &str) -> Result<Self, ChapterError> {
        let chapters: Vec<Chapter> = serde_json::from_str(json)?;
        Self::new(chapters)
    }

    pub fn get(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn first(&self) -> Option<&Chapter> {
        self.chapters.first()
    }

    /// The chapter after `id`: its `nextChapterId` when set, else the next
    /// one in order.
    pub fn next_of(&self, id: &str) -> Option<&Chapter> {
        let index = self.chapters.iter().position(|c| c.id == id)?;
        match &self.chapters[index].next_chapter_id {
            Some(next) => self.get(next),
            None => self.chapters.get(index + 1),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = r#"{
        "id": "chapter1",
        "title": "Chapter 1: Basic Movement",
        "maze": [[2, 0, 3]],
        "requiredCommands": ["moveRight"],
        "allowedCommands": ["moveUp", "moveDown", "moveLeft", "moveRight"],
        "nextChapterId": "chapter2",
        "introductoryText": "Welcome, young wizard!",
        "successMessage": "Well done!"
    }"#;

    #[test]
    fn test_chapter_from_json() {
        let chapter = Chapter::from_json(CHAPTER).unwrap();
        assert_eq!(chapter.id, "chapter1");
        assert_eq!(chapter.start_position(), Position::new(0, 0));
        assert!(chapter.hints.is_empty());
        assert_eq!(chapter.next_chapter_id.as_deref(), Some("chapter2"));
        assert_eq!(chapter.torch_count(), 0);
    }

    #[test]
    fn test_start_position_fallbacks() {
        let mut chapter = Chapter::from_json(CHAPTER).unwrap();
        chapter.start_position = Some(Position::new(1, 0));
        assert_eq!(chapter.start_position(), Position::new(1, 0));
        chapter.start_position = None;
        chapter.maze = Maze::from_codes(vec![vec![0, 3]]).unwrap();
        assert_eq!(chapter.start_position(), Position::new(0, 0));
    }

    #[test]
    fn test_bad_maze_rejected() {
        let json = CHAPTER.replace("[[2, 0, 3]]", "[[2, 0], [3]]");
        assert!(matches!(Chapter::from_json(&json), Err(ChapterError::Json(_))));
    }

    #[test]
    fn test_allowed_commands_narrow_options() {
        let chapter = Chapter::from_json(CHAPTER).unwrap();
        let table = chapter.compile_options().binding_table();
        assert!(table.contains("moveRight"));
        assert!(!table.contains("canMoveRight"));

        let mut open = chapter.clone();
        open.allowed_commands.clear();
        assert_eq!(open.compile_options(), CompileOptions::default());
    }
}
