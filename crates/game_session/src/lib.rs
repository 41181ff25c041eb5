//! Interactive chess session core.
//!
//! Owns the authoritative position, the move history, and the pointer
//! selection state, and drives an external move provider (a UCI engine
//! subprocess in production, a scripted fake in tests) for opponent
//! replies, hints, and evaluation. Rendering and input polling live in
//! the GUI crate; this crate makes all the decisions.

pub mod engine;
pub mod selection;
pub mod session;

pub use engine::{Engine, EngineError, Score, SearchLimit};
pub use selection::{move_squares, BoardGeometry, Selection};
pub use session::{GameSession, GameStatus, MoveRecord, SessionError};
