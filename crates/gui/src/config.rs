//! Settings file: which engine to run and how long it may think.

use std::path::Path;
use std::time::Duration;

use game_session::SearchLimit;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const SETTINGS_FILE: &str = "click-chess.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// UCI engine executable, looked up on PATH if not absolute.
    pub engine_path: String,
    /// Extra arguments passed to the engine.
    pub engine_args: Vec<String>,
    /// Thinking time for replies and hints, in milliseconds.
    pub move_time_ms: u64,
    /// Thinking time for the evaluation readout, in milliseconds.
    pub eval_time_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_path: "stockfish".into(),
            engine_args: Vec::new(),
            move_time_ms: 2000,
            eval_time_ms: 100,
        }
    }
}

impl Settings {
    /// Loads settings from the working directory; a missing or invalid
    /// file falls back to defaults.
    pub fn load() -> Self {
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    fn load_from(path: &Path) -> Self {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(%err, path = %path.display(), "invalid settings file, using defaults");
                Self::default()
            }
        }
    }

    pub fn move_time(&self) -> SearchLimit {
        SearchLimit::MoveTime(Duration::from_millis(self.move_time_ms))
    }

    pub fn eval_time(&self) -> SearchLimit {
        SearchLimit::MoveTime(Duration::from_millis(self.eval_time_ms))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
