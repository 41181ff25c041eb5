//! Persistent UCI engine subprocess client.
//!
//! Speaks the UCI text protocol (`uci`/`isready`/`position`/`go`/
//! `bestmove`/`quit`) over the child's standard input and output. The
//! protocol is a single conversation: requests take `&mut self`, so at
//! most one search is ever in flight. Every request is bounded by a
//! deadline derived from its [`SearchLimit`]; when the deadline passes
//! the search counts as abandoned and the next request cleans the wire
//! (`stop`, drain the stale `bestmove`) before proceeding, so an
//! abandoned call never corrupts the following one.
//!
//! Callers that share a bridge behind a mutex get queueing for free:
//! a second request waits for the lock instead of failing.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace, warn};

use game_session::{Engine, EngineError, Score, SearchLimit};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);
/// Slack on top of a movetime budget before the engine counts as
/// unresponsive.
const REPLY_GRACE: Duration = Duration::from_secs(2);
/// Upper bound for depth-limited searches, which carry no time budget
/// of their own.
const DEPTH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum UciError {
    #[error("failed to spawn engine process: {0}")]
    Spawn(std::io::Error),
    #[error("engine stdio unavailable")]
    Stdio,
    #[error("write to engine failed: {0}")]
    Write(std::io::Error),
    #[error("engine process exited")]
    Exited,
    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<UciError> for EngineError {
    fn from(err: UciError) -> Self {
        EngineError::Unavailable(err.to_string())
    }
}

/// What a single `go` round produced.
#[derive(Debug)]
struct SearchOutcome {
    best_move: Option<String>,
    score: Option<Score>,
}

/// Handle to a live UCI engine subprocess.
///
/// Constructed once per session with [`UciEngine::spawn`], torn down
/// exactly once by [`UciEngine::shutdown`] (graceful `quit` with a
/// forced kill fallback); `Drop` runs the same teardown as a safety
/// net.
#[derive(Debug)]
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    name: String,
    /// A search whose deadline passed without a `bestmove`; the wire
    /// must be cleaned before the next request.
    abandoned: bool,
    shut_down: bool,
}

impl UciEngine {
    /// Spawns the engine and completes the `uci`/`isready` handshake.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, UciError> {
        debug!(%program, "spawning UCI engine");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(UciError::Spawn)?;
        let stdin = child.stdin.take().ok_or(UciError::Stdio)?;
        let stdout = child.stdout.take().ok_or(UciError::Stdio)?;

        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                trace!(engine_out = %line.trim_end(), "recv");
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut engine = Self {
            child,
            stdin,
            lines,
            name: String::new(),
            abandoned: false,
            shut_down: false,
        };
        engine.handshake()?;
        Ok(engine)
    }

    fn handshake(&mut self) -> Result<(), UciError> {
        self.send("uci")?;
        let mut name = None;
        self.wait_scan(HANDSHAKE_TIMEOUT, |line| {
            if let Some(rest) = line.strip_prefix("id name ") {
                name = Some(rest.to_string());
            }
            (line == "uciok").then_some(())
        })?;
        if let Some(name) = name {
            self.name = name;
        }
        self.send("isready")?;
        self.wait_scan(HANDSHAKE_TIMEOUT, |line| (line == "readyok").then_some(()))?;
        debug!(name = %self.name, "engine handshake complete");
        Ok(())
    }

    fn send(&mut self, command: &str) -> Result<(), UciError> {
        trace!(%command, "send");
        writeln!(self.stdin, "{command}").map_err(UciError::Write)?;
        self.stdin.flush().map_err(UciError::Write)
    }

    /// Feeds incoming lines to `scan` until it yields a value or the
    /// timeout elapses.
    fn wait_scan<R>(
        &mut self,
        total: Duration,
        mut scan: impl FnMut(&str) -> Option<R>,
    ) -> Result<R, UciError> {
        let deadline = Instant::now() + total;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    if let Some(result) = scan(line.trim()) {
                        return Ok(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(UciError::Timeout(total)),
                Err(RecvTimeoutError::Disconnected) => return Err(UciError::Exited),
            }
        }
    }

    /// Drains a search a previous caller gave up on, so its late
    /// `bestmove` cannot be mistaken for the next answer, and drops any
    /// stray chatter between requests.
    fn clean_wire(&mut self) -> Result<(), UciError> {
        if self.abandoned {
            warn!("draining abandoned search");
            self.send("stop")?;
            self.wait_scan(REPLY_GRACE, |line| {
                line.starts_with("bestmove").then_some(())
            })?;
            self.abandoned = false;
        }
        while self.lines.try_recv().is_ok() {}
        Ok(())
    }

    /// One `position` + `go` round. Collects the last reported score on
    /// the way to `bestmove`.
    fn search(&mut self, moves: &[String], limit: SearchLimit) -> Result<SearchOutcome, UciError> {
        self.clean_wire()?;
        let position = if moves.is_empty() {
            "position startpos".to_string()
        } else {
            format!("position startpos moves {}", moves.join(" "))
        };
        self.send(&position)?;
        self.send(&go_command(limit))?;

        self.abandoned = true;
        let mut score = None;
        let best = self.wait_scan(deadline_for(limit), |line| {
            if let Some(s) = parse_info_score(line) {
                score = Some(s);
                return None;
            }
            line.strip_prefix("bestmove")
                .map(|rest| rest.split_whitespace().next().unwrap_or("").to_string())
        })?;
        self.abandoned = false;

        let best_move = match best.as_str() {
            "" | "(none)" | "0000" => None,
            _ => Some(best),
        };
        Ok(SearchOutcome { best_move, score })
    }

    /// Graceful `quit`, with a forced kill when the engine does not
    /// exit within the timeout. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if self.send("quit").is_err() {
            let _ = self.child.kill();
            let _ = self.child.wait();
            return;
        }
        let deadline = Instant::now() + QUIT_TIMEOUT;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "engine exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(25));
                }
                _ => break,
            }
        }
        warn!("engine ignored quit, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Engine for UciEngine {
    fn best_move(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<Option<String>, EngineError> {
        Ok(self.search(moves, limit)?.best_move)
    }

    fn evaluate(
        &mut self,
        moves: &[String],
        limit: SearchLimit,
    ) -> Result<Option<Score>, EngineError> {
        Ok(self.search(moves, limit)?.score)
    }

    fn name(&self) -> &str {
        if self.name.is_empty() {
            "uci engine"
        } else {
            &self.name
        }
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        self.clean_wire()?;
        self.send("ucinewgame")?;
        self.send("isready")?;
        self.wait_scan(HANDSHAKE_TIMEOUT, |line| (line == "readyok").then_some(()))?;
        Ok(())
    }
}

fn go_command(limit: SearchLimit) -> String {
    match limit {
        SearchLimit::MoveTime(t) => format!("go movetime {}", t.as_millis()),
        SearchLimit::Depth(d) => format!("go depth {d}"),
    }
}

fn deadline_for(limit: SearchLimit) -> Duration {
    match limit {
        SearchLimit::MoveTime(t) => t + REPLY_GRACE,
        SearchLimit::Depth(_) => DEPTH_TIMEOUT,
    }
}

/// Extracts `score cp N` / `score mate N` from a UCI `info` line.
fn parse_info_score(line: &str) -> Option<Score> {
    if !line.starts_with("info") {
        return None;
    }
    let mut words = line.split_whitespace();
    while let Some(word) = words.next() {
        if word == "score" {
            return match (words.next()?, words.next()?) {
                ("cp", n) => n.parse().ok().map(Score::Cp),
                ("mate", n) => n.parse().ok().map(Score::Mate),
                _ => None,
            };
        }
    }
    None
}
