use super::*;

#[test]
fn test_missing_file_uses_defaults() {
    let settings = Settings::load_from(Path::new("/definitely/not/here.json"));
    assert_eq!(settings.engine_path, "stockfish");
    assert_eq!(settings.move_time_ms, 2000);
    assert_eq!(settings.eval_time_ms, 100);
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = std::env::temp_dir();
    let path = dir.join("click-chess-test-partial.json");
    std::fs::write(&path, r#"{"engine_path": "/opt/stockfish", "move_time_ms": 500}"#)
        .expect("write settings");

    let settings = Settings::load_from(&path);
    assert_eq!(settings.engine_path, "/opt/stockfish");
    assert_eq!(settings.move_time_ms, 500);
    assert_eq!(settings.eval_time_ms, 100);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_invalid_file_falls_back() {
    let dir = std::env::temp_dir();
    let path = dir.join("click-chess-test-invalid.json");
    std::fs::write(&path, "not json at all").expect("write settings");

    let settings = Settings::load_from(&path);
    assert_eq!(settings.engine_path, "stockfish");

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_limits_from_settings() {
    let settings = Settings::default();
    assert_eq!(
        settings.move_time(),
        SearchLimit::MoveTime(Duration::from_millis(2000))
    );
    assert_eq!(
        settings.eval_time(),
        SearchLimit::MoveTime(Duration::from_millis(100))
    );
}
