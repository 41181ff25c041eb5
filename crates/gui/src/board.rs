//! Chess board widget rendering and pointer wiring

use game_session::{BoardGeometry, GameSession};
use iced::widget::{column, container, mouse_area, row, text};
use iced::{Color, Element, Length};
use shakmaty::{Position, Square};

use crate::styles::{self, SQUARE_SIZE};

/// Pointer events on board squares.
#[derive(Debug, Clone, Copy)]
pub enum BoardMessage {
    Pressed(Square),
    Released(Square),
}

/// Renders the chess board.
pub struct BoardView<'a> {
    session: &'a GameSession,
    geometry: BoardGeometry,
}

impl<'a> BoardView<'a> {
    pub fn new(session: &'a GameSession, flipped: bool) -> Self {
        Self {
            session,
            geometry: BoardGeometry::new(SQUARE_SIZE, flipped),
        }
    }

    /// Create the board view element.
    pub fn view(&self) -> Element<'a, BoardMessage> {
        let mut board_column = column![].spacing(0);

        for row_idx in 0..8usize {
            let mut rank_row = row![].spacing(0);
            for col_idx in 0..8usize {
                // Resolve orientation through the same mapping pointer
                // coordinates go through.
                let x = col_idx as f32 * SQUARE_SIZE + SQUARE_SIZE / 2.0;
                let y = row_idx as f32 * SQUARE_SIZE + SQUARE_SIZE / 2.0;
                if let Some(sq) = self.geometry.square_at(x, y) {
                    rank_row = rank_row.push(self.render_square(sq, row_idx, col_idx));
                }
            }
            board_column = board_column.push(rank_row);
        }

        container(board_column)
            .style(|_theme| container::Style {
                border: iced::Border {
                    color: Color::from_rgb(0.3, 0.3, 0.3),
                    width: 2.0,
                    radius: 0.0.into(),
                },
                ..Default::default()
            })
            .into()
    }

    /// Render a single square.
    fn render_square(&self, sq: Square, row_idx: usize, col_idx: usize) -> Element<'a, BoardMessage> {
        let is_light = (row_idx + col_idx) % 2 == 0;
        let mut bg_color = if is_light {
            styles::LIGHT_SQUARE
        } else {
            styles::DARK_SQUARE
        };

        let selection = self.session.selection();

        // Highlight selected square
        if selection.selected() == Some(sq) {
            bg_color = styles::SELECTED_SQUARE;
        }

        // Highlight last move
        if let Some((from, to)) = self.session.last_move() {
            if sq == from || sq == to {
                bg_color = blend_colors(bg_color, styles::LAST_MOVE_SQUARE);
            }
        }

        let piece_glyph = self
            .session
            .position()
            .board()
            .piece_at(sq)
            .map(|piece| styles::piece_glyph(piece.color, piece.role));

        let content: Element<'a, BoardMessage> = if let Some(glyph) = piece_glyph {
            text(glyph.to_string())
                .size(SQUARE_SIZE * 0.75)
                .color(Color::BLACK)
                .center()
                .into()
        } else if selection.is_target(sq) {
            // Dot marking a legal destination
            text("\u{25CF}")
                .size(SQUARE_SIZE * 0.3)
                .color(styles::TARGET_DOT)
                .center()
                .into()
        } else {
            text("").into()
        };

        mouse_area(
            container(content)
                .width(SQUARE_SIZE)
                .height(SQUARE_SIZE)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .style(move |_theme| container::Style {
                    background: Some(iced::Background::Color(bg_color)),
                    ..Default::default()
                }),
        )
        .on_press(BoardMessage::Pressed(sq))
        .on_release(BoardMessage::Released(sq))
        .into()
    }
}

/// Blend two colors together
fn blend_colors(base: Color, overlay: Color) -> Color {
    let alpha = overlay.a;
    Color::from_rgb(
        base.r * (1.0 - alpha) + overlay.r * alpha,
        base.g * (1.0 - alpha) + overlay.g * alpha,
        base.b * (1.0 - alpha) + overlay.b * alpha,
    )
}
