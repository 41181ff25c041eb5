//! Game session management: position, history, and engine orchestration.

use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, Move, Position, Role, Square};
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::{Engine, EngineError, Score, SearchLimit};
use crate::selection::{move_squares, Selection};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The attempted move is not in the legal set. Position, history,
    /// and selection are left untouched.
    #[error("illegal move")]
    IllegalMove,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Game result as derived from the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        self != GameStatus::InProgress
    }
}

/// A move that was applied to the session.
#[derive(Debug, Clone)]
pub struct MoveRecord {
    /// The move as it bound against the position it was played in.
    pub mv: Move,
    /// Standard Algebraic Notation, for display.
    pub san: String,
    /// UCI notation, the form engines consume.
    pub uci: String,
}

/// The session controller: owns the position, the applied-move history,
/// and the selection, and sequences engine replies, hints, undo, and
/// reset.
///
/// All mutation happens through `attempt_move`, `apply_engine_reply`,
/// `undo`, and `reset`, on the caller's single thread of control. The
/// only blocking calls are the ones that take an [`Engine`]; callers
/// that need a responsive loop run those on a worker and feed the
/// result back through [`GameSession::apply_engine_reply`].
#[derive(Debug, Clone)]
pub struct GameSession {
    position: Chess,
    history: Vec<MoveRecord>,
    selection: Selection,
    status: GameStatus,
    last_move: Option<(Square, Square)>,
    evaluation: Option<Score>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self {
            position: Chess::default(),
            history: Vec::new(),
            selection: Selection::default(),
            status: GameStatus::InProgress,
            last_move: None,
            evaluation: None,
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn evaluation(&self) -> Option<Score> {
        self.evaluation
    }

    /// Applied moves in UCI notation from the starting position.
    pub fn uci_moves(&self) -> Vec<String> {
        self.history.iter().map(|rec| rec.uci.clone()).collect()
    }

    /// Selects `sq` if it holds a piece of the side to move. Returns
    /// whether a selection was made; a miss leaves the previous
    /// selection in place.
    pub fn select_square(&mut self, sq: Square) -> bool {
        if self.status.is_over() {
            return false;
        }
        self.selection.select(&self.position, sq)
    }

    /// Pointer press on a square. Returns `true` if this completed a
    /// move (pressing a legal destination plays it, so click-click
    /// works). See the policy note in the `selection` module.
    pub fn press_square(&mut self, sq: Square) -> bool {
        if self.status.is_over() {
            return false;
        }
        if self.selection.select(&self.position, sq) {
            return false;
        }
        if let Some(from) = self.selection.selected() {
            if self.selection.is_target(sq) {
                return self.attempt_move(from, sq, None).is_ok();
            }
        }
        self.selection.clear();
        false
    }

    /// Pointer release on a square. Returns `true` if this completed a
    /// move. A release with no selection is a no-op; releasing over the
    /// selected square keeps the selection for a follow-up click.
    pub fn release_square(&mut self, sq: Square) -> bool {
        let Some(from) = self.selection.selected() else {
            return false;
        };
        if from == sq {
            return false;
        }
        match self.attempt_move(from, sq, None) {
            Ok(()) => true,
            Err(_) => {
                // Aborted attempt: the drag went somewhere illegal.
                self.selection.clear();
                false
            }
        }
    }

    /// Validates a player move against the legal set and applies it.
    /// A missing promotion piece promotes to a queen. After a success
    /// it is the engine's turn; drive it with `request_engine_move`, or
    /// use [`GameSession::play_move`] for the synchronous composition.
    pub fn attempt_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<(), SessionError> {
        if self.status.is_over() {
            return Err(SessionError::IllegalMove);
        }
        let wanted = promotion.unwrap_or(Role::Queen);
        let moves = self.position.legal_moves();
        let candidate = moves.iter().find(|m| {
            move_squares(m) == Some((from, to))
                && m.promotion().map_or(true, |role| role == wanted)
        });
        match candidate {
            Some(m) => {
                let m = m.clone();
                self.apply(&m);
                Ok(())
            }
            None => Err(SessionError::IllegalMove),
        }
    }

    /// Asks the engine for its reply to the current position and
    /// applies it. A no-op once the game is over.
    pub fn request_engine_move(
        &mut self,
        engine: &mut dyn Engine,
        limit: SearchLimit,
    ) -> Result<(), SessionError> {
        if self.status.is_over() {
            return Ok(());
        }
        match engine.best_move(&self.uci_moves(), limit)? {
            Some(uci) => self.apply_engine_reply(&uci),
            None => Err(EngineError::Unavailable(
                "engine returned no move for a live position".into(),
            )
            .into()),
        }
    }

    /// Applies a move chosen by the engine (also used to play out a
    /// hint). Engine output is trusted, not re-validated, but it must
    /// still bind against the current position; a move that does not is
    /// a protocol fault and is surfaced instead of applied.
    pub fn apply_engine_reply(&mut self, uci: &str) -> Result<(), SessionError> {
        if self.status.is_over() {
            return Ok(());
        }
        let mv = UciMove::from_ascii(uci.as_bytes())
            .map_err(|e| EngineError::Unavailable(format!("malformed engine move {uci:?}: {e}")))?
            .to_move(&self.position)
            .map_err(|e| {
                EngineError::Unavailable(format!("engine move {uci} does not fit the position: {e}"))
            })?;
        self.apply(&mv);
        Ok(())
    }

    /// `attempt_move` followed immediately by the engine's reply: one
    /// full turn cycle.
    pub fn play_move(
        &mut self,
        engine: &mut dyn Engine,
        from: Square,
        to: Square,
        promotion: Option<Role>,
        limit: SearchLimit,
    ) -> Result<(), SessionError> {
        self.attempt_move(from, to, promotion)?;
        self.request_engine_move(engine, limit)
    }

    /// Best move for the current position without touching any state.
    /// `None` when there is nothing to suggest. To play a hint out,
    /// apply it with `apply_engine_reply` and follow up with
    /// `request_engine_move` for the opponent's answer.
    pub fn request_hint(
        &self,
        engine: &mut dyn Engine,
        limit: SearchLimit,
    ) -> Result<Option<String>, SessionError> {
        if self.status.is_over() {
            return Ok(None);
        }
        Ok(engine.best_move(&self.uci_moves(), limit)?)
    }

    /// Read-only score request; never mutates the session. Store the
    /// result with [`GameSession::set_evaluation`] when it should show
    /// up in snapshots.
    pub fn evaluate(
        &self,
        engine: &mut dyn Engine,
        limit: SearchLimit,
    ) -> Result<Option<Score>, SessionError> {
        Ok(engine.evaluate(&self.uci_moves(), limit)?)
    }

    pub fn set_evaluation(&mut self, score: Option<Score>) {
        self.evaluation = score;
    }

    /// Removes the last player+engine move pair. A silent no-op with
    /// fewer than two recorded moves, so undo always lands on a
    /// position where it is the player's turn again.
    pub fn undo(&mut self) {
        if self.history.len() < 2 {
            return;
        }
        self.history.truncate(self.history.len() - 2);
        debug!(moves = self.history.len(), "undid move pair");
        self.replay();
    }

    /// Restores the starting position and clears history, selection,
    /// and evaluation.
    pub fn reset(&mut self) {
        debug!("session reset");
        *self = Self::new();
    }

    fn apply(&mut self, m: &Move) {
        let san = San::from_move(&self.position, m).to_string();
        let uci = m.to_uci(CastlingMode::Standard).to_string();
        let next = match self.position.clone().play(m) {
            Ok(next) => next,
            Err(_) => {
                // Unreachable for moves drawn from the legal set.
                warn!(%uci, "refusing to apply move that no longer fits");
                return;
            }
        };
        debug!(%san, %uci, "applied move");
        self.position = next;
        self.last_move = move_squares(m);
        self.history.push(MoveRecord {
            mv: m.clone(),
            san,
            uci,
        });
        self.selection.clear();
        self.evaluation = None;
        self.status = status_of(&self.position);
    }

    /// Rebuilds the position by replaying the recorded history from the
    /// starting position. This is what makes undo trivially correct:
    /// the history is the single source of truth.
    fn replay(&mut self) {
        let mut position = Chess::default();
        let mut last_move = None;
        for rec in &self.history {
            last_move = move_squares(&rec.mv);
            match position.clone().play(&rec.mv) {
                Ok(next) => position = next,
                Err(_) => {
                    warn!(uci = %rec.uci, "history replay diverged");
                    break;
                }
            }
        }
        self.position = position;
        self.last_move = last_move;
        self.selection.clear();
        self.evaluation = None;
        self.status = status_of(&self.position);
    }
}

fn status_of(position: &Chess) -> GameStatus {
    if position.is_checkmate() {
        match position.turn() {
            Color::White => GameStatus::BlackWins,
            Color::Black => GameStatus::WhiteWins,
        }
    } else if position.is_stalemate()
        || position.is_insufficient_material()
        || position.halfmoves() >= 100
    {
        GameStatus::Draw
    } else {
        GameStatus::InProgress
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
