//! Pointer selection state: square lookup and the selected-piece set.
//!
//! Selection policy (documented here because the original behavior is
//! ambiguous): pressing a square with an own piece selects it, even if
//! another piece was already selected. Pressing a legal destination of
//! the current selection attempts the move. Pressing anything else
//! (empty square, opponent piece outside the destination set) clears
//! the selection. Releasing over the selected square itself keeps the
//! selection, so both click-click and press-drag-release work.

use std::collections::HashSet;

use shakmaty::{Chess, File, Move, Position, Rank, Square};

/// Maps board-space pixel coordinates to squares.
///
/// Rank 8 renders at the top unless the board is flipped, matching the
/// usual white-at-the-bottom convention.
#[derive(Debug, Clone, Copy)]
pub struct BoardGeometry {
    pub square_size: f32,
    pub flipped: bool,
}

impl BoardGeometry {
    pub fn new(square_size: f32, flipped: bool) -> Self {
        Self {
            square_size,
            flipped,
        }
    }

    /// Square under the point, or `None` when the point lies outside
    /// the 8x8 grid.
    pub fn square_at(&self, x: f32, y: f32) -> Option<Square> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let col = (x / self.square_size) as u32;
        let row = (y / self.square_size) as u32;
        if col > 7 || row > 7 {
            return None;
        }
        let (file, rank) = if self.flipped {
            (7 - col, row)
        } else {
            (col, 7 - row)
        };
        Some(Square::from_coords(File::new(file), Rank::new(rank)))
    }
}

/// Origin and destination of a move as the player sees it on the
/// board. Castling is presented as the king moving two files, the way
/// every pointer UI expects it to be entered.
pub fn move_squares(m: &Move) -> Option<(Square, Square)> {
    match m {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            Some((*king, Square::from_coords(file, king.rank())))
        }
        Move::Put { .. } => None,
        _ => Some((m.from()?, m.to())),
    }
}

/// At most one selected square plus its legal destinations.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Option<Square>,
    targets: HashSet<Square>,
}

impl Selection {
    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn targets(&self) -> &HashSet<Square> {
        &self.targets
    }

    pub fn is_target(&self, sq: Square) -> bool {
        self.targets.contains(&sq)
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.targets.clear();
    }

    /// Selects `sq` if it holds a piece of the side to move and records
    /// the legal destinations from it. Returns whether a selection was
    /// made; on `false` the previous selection is left untouched.
    pub fn select(&mut self, position: &Chess, sq: Square) -> bool {
        let owns_piece = position
            .board()
            .piece_at(sq)
            .is_some_and(|piece| piece.color == position.turn());
        if !owns_piece {
            return false;
        }

        self.selected = Some(sq);
        self.targets.clear();
        let moves = position.legal_moves();
        for m in moves.iter() {
            if let Some((from, to)) = move_squares(m) {
                if from == sq {
                    self.targets.insert(to);
                }
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod selection_tests;
