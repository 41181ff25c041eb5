//! Styling constants and piece glyphs

use iced::Color;
use shakmaty::{Color as Side, Role};

// Board colors
pub const LIGHT_SQUARE: Color = Color::from_rgb(0.94, 0.85, 0.71); // Wheat
pub const DARK_SQUARE: Color = Color::from_rgb(0.71, 0.53, 0.39); // Sienna
pub const SELECTED_SQUARE: Color = Color::from_rgb(0.68, 0.85, 0.37); // Yellow-green
pub const LAST_MOVE_SQUARE: Color = Color::from_rgba(0.9, 0.9, 0.0, 0.4); // Yellow overlay
pub const TARGET_DOT: Color = Color::from_rgba(0.0, 0.0, 0.0, 0.35);

// Panel colors
pub const ERROR_TEXT: Color = Color::from_rgb(0.9, 0.35, 0.35);

// Dimensions
pub const SQUARE_SIZE: f32 = 80.0;
pub const PANEL_WIDTH: f32 = 320.0;

/// Unicode glyph for a piece.
pub fn piece_glyph(side: Side, role: Role) -> char {
    match (side, role) {
        (Side::White, Role::King) => '\u{2654}',
        (Side::White, Role::Queen) => '\u{2655}',
        (Side::White, Role::Rook) => '\u{2656}',
        (Side::White, Role::Bishop) => '\u{2657}',
        (Side::White, Role::Knight) => '\u{2658}',
        (Side::White, Role::Pawn) => '\u{2659}',
        (Side::Black, Role::King) => '\u{265A}',
        (Side::Black, Role::Queen) => '\u{265B}',
        (Side::Black, Role::Rook) => '\u{265C}',
        (Side::Black, Role::Bishop) => '\u{265D}',
        (Side::Black, Role::Knight) => '\u{265E}',
        (Side::Black, Role::Pawn) => '\u{265F}',
    }
}
