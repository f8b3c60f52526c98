//! Cooperative event loop wiring the controller to its collaborators.
//!
//! Exactly one task owns the [`SessionController`]; the engine lives behind
//! a dedicated worker task that answers requests sequentially over a
//! channel, so no other task ever touches the board.

use std::sync::Arc;
use std::time::Duration;

use shakmaty::{uci::UciMove, Role, Square};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use uci_engine::{EngineError, MoveProvider};

use crate::clients::advisor::{AdvisoryError, AdvisoryProvider};
use crate::config::Config;
use crate::controller::{GameEnd, Reaction, SessionController, TurnState};
use crate::snapshot::SessionSnapshot;

/// Input events produced by the presentation collaborator.
#[derive(Debug)]
pub enum InputEvent {
    SquareClicked(Square),
    PromotionChosen(Role),
    PromotionCancelled,
    SuggestionsToggled(bool),
    CommentaryToggled(bool),
    JudgmentToggled(bool),
    /// Free-form user message routed to the advisory collaborator.
    AdvisoryAsked(String),
    Reset,
}

/// One strength-limited search. The worker reconfigures the engine before
/// every request, so a rating change always lands before the next search.
struct SearchRequest {
    fen: String,
    elo: u32,
    movetime: Duration,
    reply: oneshot::Sender<Result<UciMove, EngineError>>,
}

/// Results of background collaborator calls, fed back into the loop.
enum AuxUpdate {
    Suggestion(Result<UciMove, EngineError>),
    Advisory(Result<String, AdvisoryError>),
}

/// Resolves once the in-flight opponent request (if any) answers; with an
/// empty slot it never resolves, which parks the select branch.
async fn await_reply(
    slot: &mut Option<oneshot::Receiver<Result<UciMove, EngineError>>>,
) -> Result<UciMove, EngineError> {
    match slot {
        Some(receiver) => receiver.await.unwrap_or_else(|_| {
            Err(EngineError::Unavailable(
                "engine adapter dropped the request".into(),
            ))
        }),
        None => std::future::pending().await,
    }
}

/// The engine worker exclusively owns the move provider. Requests are
/// served strictly in order; a failed search releases the engine and ends
/// the worker, which closes the request channel.
fn spawn_engine_worker(mut engine: Box<dyn MoveProvider>) -> mpsc::Sender<SearchRequest> {
    let (tx, mut rx) = mpsc::channel::<SearchRequest>(8);
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let result = match engine.configure(request.elo).await {
                Ok(()) => engine.request_move(&request.fen, request.movetime).await,
                Err(e) => Err(e),
            };
            let failed = result.is_err();
            let _ = request.reply.send(result);
            if failed {
                warn!("engine worker shutting down after failure");
                break;
            }
        }
        engine.shutdown().await;
    });
    tx
}

/// Single cooperative loop around the session controller. A dedicated
/// worker performs the external engine calls and posts results back.
pub struct SessionRuntime {
    controller: SessionController,
    engine_tx: Option<mpsc::Sender<SearchRequest>>,
    advisor: Option<Arc<dyn AdvisoryProvider>>,
    movetime: Duration,
    opponent_delay: Duration,
    show_suggestions: bool,
    commentary: bool,
    judgment: bool,
    suggestion: Option<String>,
    advisory: Option<String>,
    aux_tx: mpsc::Sender<AuxUpdate>,
    aux_rx: mpsc::Receiver<AuxUpdate>,
}

impl SessionRuntime {
    /// `engine`/`advisor` are optional: without an engine the session is
    /// human-only and opponent turns halt immediately; without an advisor
    /// the advisory features answer with an inline unavailability note.
    pub fn new(
        config: &Config,
        engine: Option<Box<dyn MoveProvider>>,
        advisor: Option<Arc<dyn AdvisoryProvider>>,
    ) -> Self {
        let (aux_tx, aux_rx) = mpsc::channel(16);
        Self {
            controller: SessionController::new(config.initial_elo),
            engine_tx: engine.map(spawn_engine_worker),
            advisor,
            movetime: config.movetime,
            opponent_delay: config.opponent_delay,
            show_suggestions: false,
            commentary: false,
            judgment: false,
            suggestion: None,
            advisory: None,
            aux_tx,
            aux_rx,
        }
    }

    /// Process input until the sender goes away, emitting a snapshot after
    /// every handled event.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<InputEvent>,
        updates: mpsc::Sender<SessionSnapshot>,
    ) {
        // Reply slot for the single in-flight opponent request. Requests are
        // never cancelled; a stale reply is ignored by the controller.
        let mut pending: Option<oneshot::Receiver<Result<UciMove, EngineError>>> = None;

        if updates.send(self.snapshot()).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                maybe_event = input.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Some(receiver) = self.on_event(event) {
                                pending = Some(receiver);
                            }
                        }
                        None => break,
                    }
                }
                reply = await_reply(&mut pending) => {
                    pending = None;
                    self.on_opponent_reply(reply);
                }
                Some(aux) = self.aux_rx.recv() => {
                    self.on_aux(aux);
                }
            }

            if updates.send(self.snapshot()).await.is_err() {
                break;
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = self.controller.snapshot();
        snapshot.suggestion = if self.show_suggestions {
            self.suggestion.clone()
        } else {
            None
        };
        snapshot.advisory = self.advisory.clone();
        snapshot
    }

    fn on_event(
        &mut self,
        event: InputEvent,
    ) -> Option<oneshot::Receiver<Result<UciMove, EngineError>>> {
        match event {
            InputEvent::SquareClicked(square) => {
                let reaction = self.controller.handle_click(square);
                self.follow_up(reaction)
            }
            InputEvent::PromotionChosen(role) => {
                let reaction = self.controller.choose_promotion(role);
                self.follow_up(reaction)
            }
            InputEvent::PromotionCancelled => {
                self.controller.cancel_promotion();
                None
            }
            InputEvent::SuggestionsToggled(enabled) => {
                self.show_suggestions = enabled;
                if enabled {
                    self.request_suggestion();
                } else {
                    self.suggestion = None;
                }
                None
            }
            InputEvent::CommentaryToggled(enabled) => {
                self.commentary = enabled;
                None
            }
            InputEvent::JudgmentToggled(enabled) => {
                self.judgment = enabled;
                None
            }
            InputEvent::AdvisoryAsked(message) => {
                self.request_advisory(Some(message));
                None
            }
            InputEvent::Reset => {
                self.controller.reset();
                self.suggestion = None;
                self.advisory = None;
                None
            }
        }
    }

    fn on_opponent_reply(&mut self, reply: Result<UciMove, EngineError>) {
        let reaction = self.controller.opponent_reply(reply);
        if matches!(&reaction, Reaction::GameEnded(GameEnd::Halted(_))) {
            // Release the adapter; automated turns stay disabled until a
            // fresh one is acquired on the next run.
            self.engine_tx = None;
        }
        let _ = self.follow_up(reaction);
    }

    /// Side effects owed after a controller transition.
    fn follow_up(
        &mut self,
        reaction: Reaction,
    ) -> Option<oneshot::Receiver<Result<UciMove, EngineError>>> {
        match reaction {
            Reaction::OpponentTurn => {
                if self.judgment {
                    self.request_advisory(None);
                }
                if self.show_suggestions {
                    self.request_suggestion();
                }
                Some(self.schedule_opponent_turn())
            }
            Reaction::HumanTurn => {
                if self.commentary {
                    self.request_advisory(None);
                }
                if self.show_suggestions {
                    self.request_suggestion();
                }
                None
            }
            Reaction::GameEnded(end) => {
                match &end {
                    GameEnd::Finished(status) => info!(status = status.describe(), "game over"),
                    GameEnd::Halted(reason) => warn!(%reason, "game halted"),
                }
                if self.show_suggestions {
                    self.suggestion = Some("Game is over.".to_string());
                }
                None
            }
            _ => None,
        }
    }

    /// Kick off the opponent's turn: wait the fixed delay, then hand the
    /// position to the engine worker. The reply lands back in `run`'s
    /// pending slot.
    fn schedule_opponent_turn(
        &mut self,
    ) -> oneshot::Receiver<Result<UciMove, EngineError>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        match self.engine_tx.clone() {
            Some(engine_tx) => {
                let request = SearchRequest {
                    fen: self.controller.board().fen(),
                    elo: self.controller.rating(),
                    movetime: self.movetime,
                    reply: reply_tx,
                };
                let delay = self.opponent_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // A closed worker drops the request, which surfaces as
                    // a receive error on the pending slot.
                    let _ = engine_tx.send(request).await;
                });
            }
            None => {
                let _ = reply_tx.send(Err(EngineError::Unavailable(
                    "no engine adapter for this run".into(),
                )));
            }
        }
        reply_rx
    }

    /// Ask the engine for the best move of whichever side has the move.
    /// When it is the opponent's turn, the hint therefore shows the
    /// opponent's best reply.
    fn request_suggestion(&mut self) {
        let Some(engine_tx) = self.engine_tx.clone() else {
            self.suggestion = Some("suggestions need an engine".to_string());
            return;
        };
        if self.controller.board().status().is_over() {
            self.suggestion = Some("Game is over.".to_string());
            return;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = SearchRequest {
            fen: self.controller.board().fen(),
            elo: self.controller.rating(),
            movetime: self.movetime,
            reply: reply_tx,
        };
        let aux_tx = self.aux_tx.clone();
        tokio::spawn(async move {
            if engine_tx.send(request).await.is_err() {
                return;
            }
            let reply = match reply_rx.await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Unavailable("engine adapter gone".into())),
            };
            let _ = aux_tx.send(AuxUpdate::Suggestion(reply)).await;
        });
    }

    fn request_advisory(&mut self, message: Option<String>) {
        let Some(advisor) = self.advisor.clone() else {
            self.advisory = Some("advisory service not configured".to_string());
            return;
        };
        let digest = self.controller.digest();
        let aux_tx = self.aux_tx.clone();
        tokio::spawn(async move {
            let reply = advisor.advise(&digest, message.as_deref()).await;
            let _ = aux_tx.send(AuxUpdate::Advisory(reply)).await;
        });
    }

    fn on_aux(&mut self, aux: AuxUpdate) {
        match aux {
            AuxUpdate::Suggestion(Ok(uci)) => {
                self.suggestion = self.format_suggestion(&uci);
            }
            AuxUpdate::Suggestion(Err(e)) => {
                warn!(error = %e, "suggestion query failed");
                self.suggestion = Some(format!("suggestion unavailable: {e}"));
            }
            AuxUpdate::Advisory(Ok(text)) => {
                self.advisory = Some(text);
            }
            AuxUpdate::Advisory(Err(e)) => {
                warn!(error = %e, "advisory query failed");
                self.advisory = Some(format!("advisory unavailable: {e}"));
            }
        }
    }

    fn format_suggestion(&self, uci: &UciMove) -> Option<String> {
        if matches!(self.controller.state(), TurnState::GameOver(_)) {
            return Some("Game is over.".to_string());
        }
        match *uci {
            UciMove::Normal { from, to, .. } => {
                let piece = self.controller.board().piece_at(from)?;
                Some(format!(
                    "Best move: {} from {from} to {to}",
                    role_name(piece.role)
                ))
            }
            _ => None,
        }
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "Pawn",
        Role::Knight => "Knight",
        Role::Bishop => "Bishop",
        Role::Rook => "Rook",
        Role::Queen => "Queen",
        Role::King => "King",
    }
}
