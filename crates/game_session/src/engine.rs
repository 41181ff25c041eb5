//! Engine boundary shared by the session and its move providers.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Search budget for a single engine request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    /// Think for a fixed wall-clock time.
    MoveTime(Duration),
    /// Search to a fixed depth.
    Depth(u32),
}

/// Engine score for a position, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawns.
    Cp(i32),
    /// Moves until mate; negative when the side to move is being mated.
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Cp(cp) => write!(f, "{:+.2}", cp as f32 / 100.0),
            Score::Mate(n) if n >= 0 => write!(f, "mate in {n}"),
            Score::Mate(n) => write!(f, "mated in {}", -n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Subprocess missing, crashed, unresponsive, or speaking garbage.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// A second request overlapped a pending one. The session and the
    /// bridge both serialize requests, so this indicates a bug rather
    /// than a condition callers should recover from.
    #[error("engine is already searching")]
    Busy,
}

/// A move provider the session consults for replies, hints, and scores.
///
/// Positions travel as the UCI move list from the standard starting
/// position, which every UCI engine consumes directly. Methods take
/// `&mut self`: a single conversation, one outstanding request.
pub trait Engine: Send {
    /// Best move for the position reached by `moves`, as a UCI move
    /// string ("e2e4", "a7b8q"). `None` when the engine has no move to
    /// offer (terminal positions).
    fn best_move(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<Option<String>, EngineError>;

    /// Score of the position reached by `moves`, relative to the side
    /// to move. `None` when the engine reports no score.
    fn evaluate(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<Option<Score>, EngineError>;

    /// Engine's self-reported name.
    fn name(&self) -> &str;

    /// Reset internal state for a new game.
    fn new_game(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
