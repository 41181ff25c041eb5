//! Click Chess
//!
//! A point-and-click board for playing against a UCI engine:
//! - drag or click-click to move, the engine answers
//! - hints played out by the engine (`h`), move-pair undo (`u`),
//!   reset (`r`), board flip (`f`)
//! - live evaluation readout

mod app;
mod board;
mod config;
mod styles;

use app::ChessApp;
use iced::application;

fn main() -> iced::Result {
    tracing_subscriber::fmt::init();

    application("Click Chess", ChessApp::update, ChessApp::view)
        .subscription(ChessApp::subscription)
        .theme(ChessApp::theme)
        .window_size((1020.0, 720.0))
        .run_with(ChessApp::new)
}
