//! The spell compiler and movement runner as a WASM module for the browser
//! game.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { compile, SpellRun } from 'spell-wasm';
//!
//! await init();
//!
//! const result = JSON.parse(compile("moveRight(); moveRight();", "[[2,0,3]]", 0, 0));
//! // { success: true, actions: [{ type: "move", dx: 1, dy: 0 }, ...], error: null, sourceHash: "..." }
//!
//! const run = new SpellRun(JSON.stringify(result.actions), "[[2,0,3]]", 0, 0, 200);
//! requestAnimationFrame(function frame(now) {
//!   for (const event of JSON.parse(run.tick(now - last))) { ... }
//!   if (run.state() === "running") requestAnimationFrame(frame);
//! });
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use spell_compiler::{Chapter, CompileResult, RequirementReport};
use spell_runner::{EventLog, MovementRunner, RunnerConfig, StopHandle};
use spell_types::{Action, Maze, Position};
use wasm_bindgen::prelude::*;

/// JSON for input the host sent that could not be read at all.
fn input_error(message: String) -> String {
    json!({
        "success": false,
        "actions": null,
        "error": { "category": "input", "message": message, "diagnostics": [] },
        "sourceHash": null,
    })
    .to_string()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| input_error(format!("Serialization error: {e}")))
}

/// Compile a spell against a maze given as a JSON grid of tile codes.
///
/// Returns a JSON `CompileResult`:
/// ```json
/// { "success": true, "actions": [{ "type": "move", "dx": 1, "dy": 0 }], "error": null, "sourceHash": "…" }
/// ```
///
/// On failure, `success` is `false`, `actions` is `null`, and `error` holds
/// the learner-facing message plus structured diagnostics.
#[wasm_bindgen]
pub fn compile(source: &str, maze_json: &str, start_x: i32, start_y: i32) -> String {
    let maze: Maze = match serde_json::from_str(maze_json) {
        Ok(maze) => maze,
        Err(e) => return input_error(format!("Invalid maze: {e}")),
    };
    let result = spell_compiler::compile_to_result(
        source,
        &maze,
        Position::new(start_x, start_y),
        &Default::default(),
    );
    to_json(&result)
}

#[derive(Serialize)]
struct ChapterAttempt {
    compile: CompileResult,
    requirements: RequirementReport,
}

/// Compile a spell under a chapter's rules (start, allowed commands) and
/// check its required concepts.
///
/// Returns `{ "compile": CompileResult, "requirements": { "allMet", "missing" } }`.
#[wasm_bindgen]
pub fn compile_chapter(source: &str, chapter_json: &str) -> String {
    let chapter = match Chapter::from_json(chapter_json) {
        Ok(chapter) => chapter,
        Err(e) => return input_error(e.to_string()),
    };
    let attempt = ChapterAttempt {
        compile: spell_compiler::compile_to_result(
            source,
            &chapter.maze,
            chapter.start_position(),
            &chapter.compile_options(),
        ),
        requirements: spell_compiler::check_required_commands(
            source,
            chapter.required_commands.as_slice(),
        ),
    };
    to_json(&attempt)
}

/// Check which required concepts a spell uses. `required` is an array of
/// strings; returns `{ allMet, missing }`.
#[wasm_bindgen]
pub fn check_required_commands(source: &str, required: JsValue) -> Result<JsValue, JsValue> {
    let required: Vec<String> = serde_wasm_bindgen::from_value(required)?;
    let report = spell_compiler::check_required_commands(source, required.as_slice());
    Ok(serde_wasm_bindgen::to_value(&report)?)
}

/// Return the compiler version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ══════════════════════════════════════════════════════════════════════════════
// Runs
// ══════════════════════════════════════════════════════════════════════════════

/// One animated replay of a compiled spell, driven by the host's frame loop.
#[wasm_bindgen]
pub struct SpellRun {
    runner: MovementRunner<Rc<RefCell<EventLog>>>,
    log: Rc<RefCell<EventLog>>,
    handle: StopHandle,
}

#[wasm_bindgen]
impl SpellRun {
    /// Start replaying `actions_json` (the `actions` of a successful compile)
    /// from `(start_x, start_y)`. A `step_interval_ms` of 0 uses the default.
    #[wasm_bindgen(constructor)]
    pub fn new(
        actions_json: &str,
        maze_json: &str,
        start_x: i32,
        start_y: i32,
        step_interval_ms: u32,
    ) -> Result<SpellRun, JsError> {
        let actions: Vec<Action> = serde_json::from_str(actions_json)?;
        let maze: Maze = serde_json::from_str(maze_json)?;
        let config = match step_interval_ms {
            0 => RunnerConfig::default(),
            ms => RunnerConfig {
                step_interval_ms: u64::from(ms),
            },
        };

        let log = Rc::new(RefCell::new(EventLog::new()));
        let mut runner = MovementRunner::new(config);
        let torches = maze.fresh_torches();
        let handle = runner.start(
            actions,
            Position::new(start_x, start_y),
            Arc::new(maze),
            torches,
            Rc::clone(&log),
        );
        Ok(SpellRun {
            runner,
            log,
            handle,
        })
    }

    /// Advance by `elapsed_ms` and return the events it produced as a JSON
    /// array of `{ "event": "step" | "torchUpdate" | "end", ... }`.
    pub fn tick(&mut self, elapsed_ms: f64) -> String {
        // Saturating cast: NaN and negative frames count as zero.
        let elapsed = Duration::from_micros((elapsed_ms * 1000.0) as u64);
        self.runner.tick(elapsed);
        let events = self.log.borrow_mut().drain();
        serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())
    }

    /// Cancel the run. No further events are produced.
    pub fn stop(&mut self) {
        self.handle.stop();
        self.runner.stop();
    }

    /// `"running"`, `"succeeded"`, `"failed"` or `"stopped"`.
    pub fn state(&self) -> String {
        serde_json::to_value(self.runner.state())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Current avatar position as `{ x, y }`.
    pub fn position(&self) -> String {
        to_json(&self.runner.position())
    }

    /// The torch board as `[{ position, isLit }]`.
    pub fn torches(&self) -> String {
        to_json(&self.runner.torches())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> serde_json::Value {
        serde_json::from_str(json).unwrap()
    }

    fn begin(actions: &str, maze: &str, interval_ms: u32) -> SpellRun {
        match SpellRun::new(actions, maze, 0, 0, interval_ms) {
            Ok(run) => run,
            Err(_) => panic!("run did not start"),
        }
    }

    #[test]
    fn test_compile_json() {
        let result = parse(&compile("moveRight(); moveRight();", "[[2,0,3]]", 0, 0));
        assert_eq!(result["success"], true);
        assert_eq!(result["actions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_compile_from_extreme_start() {
        let result = parse(&compile("moveRight(); moveDown();", "[[2,3]]", i32::MAX, i32::MAX));
        assert_eq!(result["success"], true);
        assert_eq!(result["actions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_compile_reports_bad_maze() {
        let result = parse(&compile("moveRight();", "[[2,0],[3]]", 0, 0));
        assert_eq!(result["success"], false);
        assert_eq!(result["error"]["category"], "input");
        assert!(result["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid maze"));
    }

    #[test]
    fn test_compile_chapter_json() {
        let chapter = r#"{"id":"c1","title":"C1","maze":[[2,0,3]],"requiredCommands":["loop"]}"#;
        let result = parse(&compile_chapter("moveRight(); moveRight();", chapter));
        assert_eq!(result["compile"]["success"], true);
        assert_eq!(result["requirements"]["allMet"], false);
        assert_eq!(result["requirements"]["missing"][0], "loop");
    }

    #[test]
    fn test_run_produces_events() {
        let compiled = parse(&compile("moveRight()", "[[2,3]]", 0, 0));
        let actions = compiled["actions"].to_string();
        let mut run = begin(&actions, "[[2,3]]", 0);
        assert_eq!(run.state(), "running");
        assert_eq!(run.tick(100.0), "[]");
        let events = parse(&run.tick(100.0));
        assert_eq!(events[0]["event"], "step");
        assert_eq!(events[1]["outcome"]["result"], "success");
        assert_eq!(run.state(), "succeeded");
        assert_eq!(parse(&run.position()), json!({ "x": 1, "y": 0 }));
    }

    #[test]
    fn test_stopped_run_is_silent() {
        let mut run = begin(r#"[{"type":"move","dx":1,"dy":0}]"#, "[[2,3]]", 10);
        run.stop();
        assert_eq!(run.tick(f64::NAN), "[]");
        assert_eq!(run.tick(50.0), "[]");
        assert_eq!(run.state(), "stopped");
    }
}
