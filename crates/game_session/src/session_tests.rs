use super::*;
use shakmaty::Square::*;
use std::collections::VecDeque;
use std::time::Duration;

/// Engine fake that serves canned replies and records what it was asked.
struct ScriptedEngine {
    replies: VecDeque<Result<Option<String>, EngineError>>,
    evals: VecDeque<Result<Option<Score>, EngineError>>,
    requests: Vec<Vec<String>>,
}

impl ScriptedEngine {
    fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: replies
                .iter()
                .map(|uci| Ok(Some(uci.to_string())))
                .collect(),
            evals: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    fn silent() -> Self {
        Self::with_replies(&[])
    }
}

impl Engine for ScriptedEngine {
    fn best_move(
        &mut self,
        moves: &[String],
        _limit: SearchLimit,
    ) -> Result<Option<String>, EngineError> {
        self.requests.push(moves.to_vec());
        self.replies.pop_front().unwrap_or(Ok(None))
    }

    fn evaluate(
        &mut self,
        moves: &[String],
        _limit: SearchLimit,
    ) -> Result<Option<Score>, EngineError> {
        self.requests.push(moves.to_vec());
        self.evals.pop_front().unwrap_or(Ok(Some(Score::Cp(0))))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn limit() -> SearchLimit {
    SearchLimit::MoveTime(Duration::from_millis(10))
}

/// Plays a scripted sequence of trusted moves, alternating sides.
fn play_out(session: &mut GameSession, moves: &[&str]) {
    for uci in moves {
        session.apply_engine_reply(uci).expect("scripted move");
    }
}

#[test]
fn test_select_square_lists_destinations() {
    let mut session = GameSession::new();
    assert!(session.select_square(E2));
    assert_eq!(session.selection().selected(), Some(E2));
    assert!(session.selection().is_target(E3));
    assert!(session.selection().is_target(E4));
    assert_eq!(session.selection().targets().len(), 2);
}

#[test]
fn test_select_square_miss_keeps_previous_selection() {
    let mut session = GameSession::new();
    session.select_square(E2);
    assert!(!session.select_square(E5));
    assert!(!session.select_square(E7));
    assert_eq!(session.selection().selected(), Some(E2));
    assert_eq!(session.selection().targets().len(), 2);
}

#[test]
fn test_attempt_illegal_move_changes_nothing() {
    let mut session = GameSession::new();
    session.select_square(E2);
    let err = session.attempt_move(E2, E5, None);
    assert_eq!(err, Err(SessionError::IllegalMove));
    assert!(session.history().is_empty());
    assert_eq!(session.position().board(), Chess::default().board());
    // attempt_move itself leaves the selection alone
    assert_eq!(session.selection().selected(), Some(E2));
}

#[test]
fn test_player_move_then_engine_reply() {
    let mut session = GameSession::new();
    let mut engine = ScriptedEngine::with_replies(&["e7e5"]);

    session
        .play_move(&mut engine, E2, E4, None, limit())
        .expect("legal move with reply");

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.turn(), Color::White);
    assert_eq!(session.uci_moves(), vec!["e2e4", "e7e5"]);
    // The engine was asked on the position after e2e4.
    assert_eq!(engine.requests, vec![vec!["e2e4".to_string()]]);
    assert_eq!(session.last_move(), Some((E7, E5)));
}

#[test]
fn test_undo_restores_position_before_pair() {
    let mut session = GameSession::new();
    let mut engine = ScriptedEngine::with_replies(&["e7e5"]);
    session
        .play_move(&mut engine, E2, E4, None, limit())
        .expect("move pair");

    session.undo();

    assert!(session.history().is_empty());
    assert_eq!(session.position().board(), Chess::default().board());
    assert_eq!(session.turn(), Color::White);
    assert_eq!(session.last_move(), None);
}

#[test]
fn test_undo_with_short_history_is_noop() {
    let mut session = GameSession::new();
    session.undo();
    assert!(session.history().is_empty());

    session.attempt_move(E2, E4, None).expect("legal move");
    session.undo();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.turn(), Color::Black);
}

#[test]
fn test_undo_keeps_earlier_moves() {
    let mut session = GameSession::new();
    play_out(&mut session, &["e2e4", "e7e5", "g1f3", "b8c6"]);

    session.undo();

    assert_eq!(session.uci_moves(), vec!["e2e4", "e7e5"]);
    assert_eq!(session.last_move(), Some((E7, E5)));
    assert_eq!(session.turn(), Color::White);
}

#[test]
fn test_reset_clears_everything() {
    let mut session = GameSession::new();
    play_out(&mut session, &["e2e4", "e7e5"]);
    session.select_square(G1);
    session.set_evaluation(Some(Score::Cp(40)));

    session.reset();

    assert!(session.history().is_empty());
    assert_eq!(session.position().board(), Chess::default().board());
    assert_eq!(session.selection().selected(), None);
    assert_eq!(session.evaluation(), None);
    assert_eq!(session.status(), GameStatus::InProgress);
}

#[test]
fn test_history_replay_reproduces_position() {
    let mut session = GameSession::new();
    play_out(
        &mut session,
        &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1"],
    );

    let mut replayed = Chess::default();
    for uci in session.uci_moves() {
        let mv = UciMove::from_ascii(uci.as_bytes())
            .expect("recorded uci parses")
            .to_move(&replayed)
            .expect("recorded uci binds");
        replayed = replayed.play(&mv).expect("recorded move is legal");
    }

    assert_eq!(session.position().board(), replayed.board());
    assert_eq!(session.turn(), replayed.turn());
}

#[test]
fn test_castling_entered_as_king_two_files() {
    let mut session = GameSession::new();
    play_out(&mut session, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"]);

    session.attempt_move(E1, G1, None).expect("short castle");
    assert_eq!(session.history().last().map(|r| r.uci.as_str()), Some("e1g1"));
    assert_eq!(session.history().last().map(|r| r.san.as_str()), Some("O-O"));
}

#[test]
fn test_promotion_defaults_to_queen() {
    let mut session = GameSession::new();
    play_out(
        &mut session,
        &["a2a4", "b7b5", "a4b5", "a7a6", "b5a6", "b8c6", "a6a7", "c6b8"],
    );

    session.attempt_move(A7, B8, None).expect("capture-promotion");
    assert_eq!(session.history().last().map(|r| r.uci.as_str()), Some("a7b8q"));
}

#[test]
fn test_explicit_underpromotion() {
    let mut session = GameSession::new();
    play_out(
        &mut session,
        &["a2a4", "b7b5", "a4b5", "a7a6", "b5a6", "b8c6", "a6a7", "c6b8"],
    );

    session
        .attempt_move(A7, B8, Some(Role::Knight))
        .expect("knight promotion");
    assert_eq!(session.history().last().map(|r| r.uci.as_str()), Some("a7b8n"));
}

#[test]
fn test_engine_illegal_reply_is_protocol_fault() {
    let mut session = GameSession::new();

    let err = session.apply_engine_reply("e2e5");
    assert!(matches!(
        err,
        Err(SessionError::Engine(EngineError::Unavailable(_)))
    ));
    let err = session.apply_engine_reply("zz99");
    assert!(matches!(
        err,
        Err(SessionError::Engine(EngineError::Unavailable(_)))
    ));
    assert!(session.history().is_empty());
    assert_eq!(session.position().board(), Chess::default().board());
}

#[test]
fn test_engine_no_move_on_live_position_is_fault() {
    let mut session = GameSession::new();
    let mut engine = ScriptedEngine::silent();

    let err = session.request_engine_move(&mut engine, limit());
    assert!(matches!(
        err,
        Err(SessionError::Engine(EngineError::Unavailable(_)))
    ));
    assert!(session.history().is_empty());
}

#[test]
fn test_checkmate_ends_the_game() {
    let mut session = GameSession::new();
    // Fool's mate.
    play_out(&mut session, &["f2f3", "e7e5", "g2g4", "d8h4"]);

    assert_eq!(session.status(), GameStatus::BlackWins);

    // Terminal state: moves and engine requests are rejected or inert.
    assert_eq!(
        session.attempt_move(E2, E4, None),
        Err(SessionError::IllegalMove)
    );
    let mut engine = ScriptedEngine::with_replies(&["e2e4"]);
    session
        .request_engine_move(&mut engine, limit())
        .expect("no-op after game over");
    assert_eq!(session.history().len(), 4);
    assert!(engine.requests.is_empty());
}

#[test]
fn test_hint_on_checkmate_returns_none_without_asking() {
    let mut session = GameSession::new();
    play_out(&mut session, &["f2f3", "e7e5", "g2g4", "d8h4"]);

    let mut engine = ScriptedEngine::with_replies(&["e2e4"]);
    let hint = session.request_hint(&mut engine, limit()).expect("hint");
    assert_eq!(hint, None);
    assert!(engine.requests.is_empty());
    assert_eq!(session.status(), GameStatus::BlackWins);
}

#[test]
fn test_hint_then_reply_composition() {
    let mut session = GameSession::new();
    let mut engine = ScriptedEngine::with_replies(&["e2e4", "e7e5"]);

    let hint = session
        .request_hint(&mut engine, limit())
        .expect("hint")
        .expect("a move is available");
    assert_eq!(session.history().len(), 0);

    // The hint plays as the player's move, then the opponent answers.
    session.apply_engine_reply(&hint).expect("hint applies");
    session
        .request_engine_move(&mut engine, limit())
        .expect("reply");
    assert_eq!(session.uci_moves(), vec!["e2e4", "e7e5"]);
}

#[test]
fn test_evaluate_does_not_mutate() {
    let mut session = GameSession::new();
    let mut engine = ScriptedEngine::silent();
    engine.evals.push_back(Ok(Some(Score::Cp(35))));

    let score = session.evaluate(&mut engine, limit()).expect("score");
    assert_eq!(score, Some(Score::Cp(35)));
    assert_eq!(session.evaluation(), None);
    assert!(session.history().is_empty());

    session.set_evaluation(score);
    assert_eq!(session.evaluation(), Some(Score::Cp(35)));
}

#[test]
fn test_engine_error_propagates() {
    let mut session = GameSession::new();
    let mut engine = ScriptedEngine::silent();
    engine
        .replies
        .push_back(Err(EngineError::Unavailable("gone".into())));

    let err = session.request_engine_move(&mut engine, limit());
    assert!(matches!(err, Err(SessionError::Engine(_))));
    assert!(session.history().is_empty());
}

#[test]
fn test_press_release_drag_plays_move() {
    let mut session = GameSession::new();
    assert!(!session.press_square(E2));
    assert!(session.release_square(E4));
    assert_eq!(session.uci_moves(), vec!["e2e4"]);
    assert_eq!(session.selection().selected(), None);
}

#[test]
fn test_click_click_plays_move() {
    let mut session = GameSession::new();
    assert!(!session.press_square(E2));
    assert!(!session.release_square(E2)); // selection kept
    assert_eq!(session.selection().selected(), Some(E2));
    assert!(session.press_square(E4));
    assert_eq!(session.uci_moves(), vec!["e2e4"]);
}

#[test]
fn test_press_on_opponent_piece_clears_selection() {
    let mut session = GameSession::new();
    session.press_square(E2);
    assert!(!session.press_square(E7));
    assert_eq!(session.selection().selected(), None);
    assert!(session.history().is_empty());
}

#[test]
fn test_release_without_selection_is_noop() {
    let mut session = GameSession::new();
    assert!(!session.release_square(E4));
    assert!(session.history().is_empty());
}

#[test]
fn test_release_on_illegal_square_aborts_and_clears() {
    let mut session = GameSession::new();
    session.press_square(E2);
    assert!(!session.release_square(E5));
    assert!(session.history().is_empty());
    assert_eq!(session.selection().selected(), None);
}

#[test]
fn test_reselecting_another_own_piece() {
    let mut session = GameSession::new();
    session.press_square(E2);
    assert!(!session.press_square(D2));
    assert_eq!(session.selection().selected(), Some(D2));
    assert!(session.selection().is_target(D4));
}
