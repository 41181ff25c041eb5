//! Main application state and logic

use std::sync::{Arc, Mutex};

use iced::widget::{
    button, column, container, horizontal_rule, row, scrollable, text, vertical_space,
};
use iced::{Element, Length, Subscription, Task, Theme};
use shakmaty::Color as Side;
use tracing::{debug, warn};

use game_session::{Engine, EngineError, GameSession, GameStatus, Score};
use uci_bridge::UciEngine;

use crate::board::{BoardMessage, BoardView};
use crate::config::Settings;
use crate::styles::{ERROR_TEXT, PANEL_WIDTH};

type SharedEngine = Arc<Mutex<UciEngine>>;

/// Main application state
pub struct ChessApp {
    /// Game session (position, history, selection)
    session: GameSession,
    settings: Settings,
    /// Engine bridge, once the subprocess handshake finished
    engine: Option<SharedEngine>,
    engine_name: String,
    /// Last engine fault, shown in the panel
    engine_error: Option<String>,
    /// Opponent reply in flight
    engine_thinking: bool,
    /// Hint request in flight
    hint_pending: bool,
    board_flipped: bool,
    /// Bumped on every position change; engine results stamped with an
    /// older generation are stale and dropped.
    generation: u64,
}

/// Application messages
#[derive(Debug, Clone)]
pub enum Message {
    // Board interaction
    Board(BoardMessage),

    // Game controls
    NewGame,
    Undo,
    Hint,
    FlipBoard,

    // Engine
    EngineReady(Result<SharedEngine, EngineError>),
    EngineNewGameDone(Result<(), EngineError>),
    EngineMoveReady(u64, Result<Option<String>, EngineError>),
    HintReady(u64, Result<Option<String>, EngineError>),
    EvaluationReady(u64, Result<Option<Score>, EngineError>),
}

impl ChessApp {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let spawn = spawn_engine_task(&settings);
        (
            Self {
                session: GameSession::new(),
                settings,
                engine: None,
                engine_name: String::new(),
                engine_error: None,
                engine_thinking: false,
                hint_pending: false,
                board_flipped: false,
                generation: 0,
            },
            spawn,
        )
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::keyboard::on_key_press(|key, _modifiers| match key {
            iced::keyboard::Key::Character(c) => match c.as_str() {
                "r" => Some(Message::NewGame),
                "u" => Some(Message::Undo),
                "h" => Some(Message::Hint),
                "f" => Some(Message::FlipBoard),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Board(BoardMessage::Pressed(sq)) => {
                if self.can_play() && self.session.press_square(sq) {
                    return self.after_player_move();
                }
                Task::none()
            }

            Message::Board(BoardMessage::Released(sq)) => {
                if self.can_play() && self.session.release_square(sq) {
                    return self.after_player_move();
                }
                Task::none()
            }

            Message::NewGame => {
                self.session.reset();
                self.generation += 1;
                self.engine_thinking = false;
                self.hint_pending = false;
                self.engine_error = None;
                let Some(engine) = self.engine.clone() else {
                    return Task::none();
                };
                Task::perform(
                    run_blocking(move || with_engine(&engine, |eng| eng.new_game())),
                    Message::EngineNewGameDone,
                )
            }

            Message::Undo => {
                if !self.engine_thinking && !self.hint_pending {
                    self.session.undo();
                    self.generation += 1;
                    return self.request_evaluation();
                }
                Task::none()
            }

            Message::Hint => {
                if self.can_play() {
                    self.hint_pending = true;
                    return self.request_best_move(true);
                }
                Task::none()
            }

            Message::FlipBoard => {
                self.board_flipped = !self.board_flipped;
                Task::none()
            }

            Message::EngineReady(Ok(engine)) => {
                self.engine_name = engine
                    .lock()
                    .map(|eng| eng.name().to_string())
                    .unwrap_or_default();
                debug!(name = %self.engine_name, "engine ready");
                self.engine = Some(engine);
                self.engine_error = None;
                self.request_evaluation()
            }

            Message::EngineReady(Err(err)) => {
                warn!(%err, "engine failed to start");
                self.engine_error = Some(err.to_string());
                Task::none()
            }

            Message::EngineNewGameDone(result) => {
                if let Err(err) = result {
                    self.engine_error = Some(err.to_string());
                }
                self.request_evaluation()
            }

            Message::EngineMoveReady(generation, result) => {
                self.engine_thinking = false;
                if generation != self.generation {
                    debug!("dropping stale engine reply");
                    return Task::none();
                }
                match result {
                    Ok(Some(uci)) => match self.session.apply_engine_reply(&uci) {
                        Ok(()) => {
                            self.generation += 1;
                            return self.request_evaluation();
                        }
                        Err(err) => self.engine_error = Some(err.to_string()),
                    },
                    Ok(None) => {
                        if !self.session.status().is_over() {
                            self.engine_error =
                                Some("engine returned no move".to_string());
                        }
                    }
                    Err(err) => self.engine_error = Some(err.to_string()),
                }
                Task::none()
            }

            Message::HintReady(generation, result) => {
                self.hint_pending = false;
                if generation != self.generation {
                    debug!("dropping stale hint");
                    return Task::none();
                }
                match result {
                    // The hint plays as our move; the engine answers next.
                    Ok(Some(uci)) => match self.session.apply_engine_reply(&uci) {
                        Ok(()) => return self.after_player_move(),
                        Err(err) => self.engine_error = Some(err.to_string()),
                    },
                    Ok(None) => {}
                    Err(err) => self.engine_error = Some(err.to_string()),
                }
                Task::none()
            }

            Message::EvaluationReady(generation, result) => {
                if generation != self.generation {
                    return Task::none();
                }
                match result {
                    Ok(score) => self.session.set_evaluation(score),
                    Err(err) => debug!(%err, "evaluation failed"),
                }
                Task::none()
            }
        }
    }

    /// Pointer input is live only on the player's turn while nothing is
    /// in flight.
    fn can_play(&self) -> bool {
        self.session.status() == GameStatus::InProgress
            && self.session.turn() == Side::White
            && !self.engine_thinking
            && !self.hint_pending
    }

    fn after_player_move(&mut self) -> Task<Message> {
        self.generation += 1;
        self.engine_error = None;
        self.request_best_move(false)
    }

    /// Asks the engine for a move on the current position. The result
    /// comes back as `HintReady` or, for the opponent reply, as
    /// `EngineMoveReady`.
    fn request_best_move(&mut self, hint: bool) -> Task<Message> {
        let Some(engine) = self.engine.clone() else {
            self.engine_error = Some("no engine available".to_string());
            self.hint_pending = false;
            return Task::none();
        };
        if !hint {
            if self.session.status().is_over() || self.session.turn() != Side::Black {
                return self.request_evaluation();
            }
            self.engine_thinking = true;
        }

        let moves = self.session.uci_moves();
        let limit = self.settings.move_time();
        let generation = self.generation;
        Task::perform(
            run_blocking(move || with_engine(&engine, |eng| eng.best_move(&moves, limit))),
            move |result| {
                if hint {
                    Message::HintReady(generation, result)
                } else {
                    Message::EngineMoveReady(generation, result)
                }
            },
        )
    }

    fn request_evaluation(&mut self) -> Task<Message> {
        let Some(engine) = self.engine.clone() else {
            return Task::none();
        };
        let moves = self.session.uci_moves();
        let limit = self.settings.eval_time();
        let generation = self.generation;
        Task::perform(
            run_blocking(move || with_engine(&engine, |eng| eng.evaluate(&moves, limit))),
            move |result| Message::EvaluationReady(generation, result),
        )
    }

    pub fn view(&self) -> Element<'_, Message> {
        let board = BoardView::new(&self.session, self.board_flipped)
            .view()
            .map(Message::Board);

        let panel = self.control_panel();

        row![
            board,
            container(panel)
                .width(PANEL_WIDTH)
                .height(Length::Fill)
                .padding(15),
        ]
        .spacing(20)
        .padding(20)
        .into()
    }

    /// Render the control panel
    fn control_panel(&self) -> Element<'_, Message> {
        let new_game_btn = button(text("New Game (r)"))
            .on_press(Message::NewGame)
            .style(button::primary)
            .width(Length::Fill);

        let undo_btn = button(text("Undo (u)"))
            .on_press(Message::Undo)
            .style(button::secondary)
            .width(Length::Fill);

        let hint_btn = button(text("Hint (h)"))
            .on_press(Message::Hint)
            .style(button::secondary)
            .width(Length::Fill);

        let flip_btn = button(text("Flip Board (f)"))
            .on_press(Message::FlipBoard)
            .style(button::secondary)
            .width(Length::Fill);

        let status = match self.session.status() {
            GameStatus::InProgress => {
                if self.engine_thinking {
                    "Engine thinking...".to_string()
                } else if self.hint_pending {
                    "Asking for a hint...".to_string()
                } else if self.session.turn() == Side::White {
                    "White to move".to_string()
                } else {
                    "Engine to move".to_string()
                }
            }
            GameStatus::WhiteWins => "Checkmate! White wins".to_string(),
            GameStatus::BlackWins => "Checkmate! Black wins".to_string(),
            GameStatus::Draw => "Draw".to_string(),
        };

        let engine_line: Element<'_, Message> = match &self.engine_error {
            Some(err) => text(err.clone()).size(13).color(ERROR_TEXT).into(),
            None if self.engine.is_some() => {
                text(format!("Engine: {}", self.engine_name)).size(13).into()
            }
            None => text("Starting engine...").size(13).into(),
        };

        let evaluation = match self.session.evaluation() {
            Some(score) => format!("Eval: {score}"),
            None => "Eval: ...".to_string(),
        };

        // Move history, paired per full move
        let moves_title = text("Moves").size(16);
        let mut moves_list = column![].spacing(2);
        for (i, chunk) in self.session.history().chunks(2).enumerate() {
            let white_move = chunk.first().map(|rec| rec.san.as_str()).unwrap_or("");
            let black_move = chunk.get(1).map(|rec| rec.san.as_str()).unwrap_or("");
            moves_list = moves_list
                .push(text(format!("{}. {} {}", i + 1, white_move, black_move)).size(13));
        }
        let moves_scroll = scrollable(moves_list).height(Length::Fill);

        column![
            new_game_btn,
            undo_btn,
            hint_btn,
            flip_btn,
            vertical_space().height(15),
            horizontal_rule(1),
            vertical_space().height(10),
            text(status).size(16),
            text(evaluation).size(14),
            engine_line,
            vertical_space().height(15),
            horizontal_rule(1),
            vertical_space().height(10),
            moves_title,
            moves_scroll,
        ]
        .spacing(5)
        .into()
    }
}

/// Spawns and handshakes the engine subprocess off the UI thread.
fn spawn_engine_task(settings: &Settings) -> Task<Message> {
    let path = settings.engine_path.clone();
    let args = settings.engine_args.clone();
    Task::perform(
        run_blocking(move || {
            UciEngine::spawn(&path, &args)
                .map(|engine| Arc::new(Mutex::new(engine)))
                .map_err(EngineError::from)
        }),
        Message::EngineReady,
    )
}

/// Runs a blocking engine call on the runtime's blocking pool.
async fn run_blocking<T, F>(call: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(result) => result,
        Err(err) => Err(EngineError::Unavailable(format!(
            "engine task failed: {err}"
        ))),
    }
}

/// Locks the shared bridge for one request. Callers queue on the lock;
/// the bridge itself never sees overlapping requests.
fn with_engine<T>(
    engine: &SharedEngine,
    call: impl FnOnce(&mut UciEngine) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    let mut guard = engine
        .lock()
        .map_err(|_| EngineError::Unavailable("engine lock poisoned".to_string()))?;
    call(&mut guard)
}
