//! UCI engine wrapper over a child process (async I/O).

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use shakmaty::uci::UciMove;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::provider::{EngineError, MoveProvider};

/// A single UCI engine process (Stockfish or compatible).
///
/// One instance per program run; the session's engine worker is its only
/// owner, so searches are naturally sequential and a strength
/// reconfiguration can never interleave with an in-flight request.
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl UciEngine {
    /// Spawn the engine binary and run the UCI handshake.
    pub async fn spawn(path: &str) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                EngineError::Unavailable(format!("failed to spawn engine at {path}: {e}"))
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine stdout not captured".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;
        engine.send("setoption name Threads value 1").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "engine <");
        self.stdin.write_all(format!("{cmd}\n").as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).await?;
        if n == 0 {
            return Err(EngineError::Protocol(
                "engine closed its output stream".into(),
            ));
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "engine >");
        Ok(trimmed)
    }

    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    /// Tell the process to exit and reap it. Called exactly once on orderly
    /// shutdown; `Drop` covers the error paths.
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

#[async_trait]
impl MoveProvider for UciEngine {
    async fn configure(&mut self, elo: u32) -> Result<(), EngineError> {
        self.send("setoption name UCI_LimitStrength value true")
            .await?;
        self.send(&format!("setoption name UCI_Elo value {elo}"))
            .await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    async fn request_move(
        &mut self,
        fen: &str,
        time_budget: Duration,
    ) -> Result<UciMove, EngineError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go movetime {}", time_budget.as_millis()))
            .await?;

        loop {
            let line = self.read_line().await?;
            if line.starts_with("bestmove") {
                return parse_bestmove(&line);
            }
        }
    }

    async fn shutdown(&mut self) {
        self.quit().await;
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// Parse a `bestmove e2e4 [ponder ...]` reply line.
fn parse_bestmove(line: &str) -> Result<UciMove, EngineError> {
    let token = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| EngineError::Protocol(format!("malformed bestmove line: {line}")))?;

    if token == "(none)" {
        return Err(EngineError::Protocol("engine found no legal move".into()));
    }

    token
        .parse::<UciMove>()
        .map_err(|_| EngineError::Protocol(format!("unparseable bestmove: {token}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Role;

    #[test]
    fn test_parse_bestmove_simple() {
        let mv = parse_bestmove("bestmove e2e4").unwrap();
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn test_parse_bestmove_ignores_ponder() {
        let mv = parse_bestmove("bestmove g1f3 ponder g8f6").unwrap();
        assert_eq!(mv.to_string(), "g1f3");
    }

    #[test]
    fn test_parse_bestmove_promotion() {
        let mv = parse_bestmove("bestmove a7a8q").unwrap();
        match mv {
            UciMove::Normal { promotion, .. } => assert_eq!(promotion, Some(Role::Queen)),
            other => panic!("expected normal move, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_bestmove_none_is_protocol_error() {
        let err = parse_bestmove("bestmove (none)").unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[test]
    fn test_parse_bestmove_garbage_is_protocol_error() {
        assert!(parse_bestmove("bestmove").is_err());
        assert!(parse_bestmove("bestmove zz99").is_err());
    }
}
