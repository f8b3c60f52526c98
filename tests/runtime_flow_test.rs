//! Full-loop tests with deterministic collaborator doubles.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use common::{test_config, CannedAdvisor, ScriptedEngine};
use game_session::clients::advisor::AdvisoryProvider;
use game_session::{InputEvent, SessionRuntime, SessionSnapshot};
use shakmaty::Square;
use uci_engine::MoveProvider;

fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

async fn click(input: &mpsc::Sender<InputEvent>, square: &str) {
    input
        .send(InputEvent::SquareClicked(sq(square)))
        .await
        .expect("runtime alive");
}

async fn next_matching(
    updates: &mut mpsc::Receiver<SessionSnapshot>,
    mut predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = updates.recv().await.expect("runtime stopped early");
            if predicate(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .expect("expected snapshot never arrived")
}

#[tokio::test]
async fn opponent_answers_with_the_configured_strength() {
    let engine = ScriptedEngine::new(&["e7e5", "d7d5"]);
    let elo_log = engine.elo_log();
    let boxed: Box<dyn MoveProvider> = Box::new(engine);
    let runtime = SessionRuntime::new(&test_config(), Some(boxed), None);

    let (input_tx, input_rx) = mpsc::channel(8);
    let (update_tx, mut update_rx) = mpsc::channel(64);
    let handle = tokio::spawn(runtime.run(input_rx, update_tx));

    click(&input_tx, "e2").await;
    click(&input_tx, "e4").await;
    next_matching(&mut update_rx, |s| {
        s.last_move == Some(("e7".to_string(), "e5".to_string()))
    })
    .await;

    click(&input_tx, "d2").await;
    click(&input_tx, "d4").await;
    let snapshot = next_matching(&mut update_rx, |s| {
        s.last_move == Some(("d7".to_string(), "d5".to_string()))
    })
    .await;

    assert_eq!(snapshot.status, "White to move");
    // Strength was reconfirmed before every search, at the session rating.
    assert_eq!(*elo_log.lock().unwrap(), vec![1320, 1320]);

    drop(input_tx);
    handle.await.unwrap();
}

#[tokio::test]
async fn checkmate_through_the_runtime_updates_the_tally() {
    let engine: Box<dyn MoveProvider> =
        Box::new(ScriptedEngine::new(&["e7e5", "b8c6", "g8f6"]));
    let runtime = SessionRuntime::new(&test_config(), Some(engine), None);

    let (input_tx, input_rx) = mpsc::channel(8);
    let (update_tx, mut update_rx) = mpsc::channel(64);
    let handle = tokio::spawn(runtime.run(input_rx, update_tx));

    let rounds = [
        ("e2", "e4", ("e7", "e5")),
        ("f1", "c4", ("b8", "c6")),
        ("d1", "h5", ("g8", "f6")),
    ];
    for (from, to, reply) in rounds {
        click(&input_tx, from).await;
        click(&input_tx, to).await;
        // Wait until the scripted opponent reply has been applied.
        next_matching(&mut update_rx, |s| {
            s.last_move == Some((reply.0.to_string(), reply.1.to_string()))
        })
        .await;
    }

    click(&input_tx, "h5").await;
    click(&input_tx, "f7").await;
    let snapshot =
        next_matching(&mut update_rx, |s| s.status == "White wins by checkmate").await;
    assert_eq!(snapshot.human_wins, 1);
    assert_eq!(snapshot.engine_wins, 0);
    assert_eq!(snapshot.rating, 1320);

    // Terminal until reset: a further click changes nothing.
    click(&input_tx, "a2").await;
    let snapshot = next_matching(&mut update_rx, |_| true).await;
    assert_eq!(snapshot.status, "White wins by checkmate");
    assert_eq!(snapshot.human_wins, 1);

    drop(input_tx);
    handle.await.unwrap();
}

#[tokio::test]
async fn advisory_reply_reaches_the_snapshot() {
    let advisor = CannedAdvisor::new("interesting opening choice");
    let digests = advisor.digests.clone();
    let runtime = SessionRuntime::new(
        &test_config(),
        None,
        Some(Arc::new(advisor) as Arc<dyn AdvisoryProvider>),
    );

    let (input_tx, input_rx) = mpsc::channel(8);
    let (update_tx, mut update_rx) = mpsc::channel(64);
    let handle = tokio::spawn(runtime.run(input_rx, update_tx));

    input_tx
        .send(InputEvent::AdvisoryAsked("thoughts?".to_string()))
        .await
        .unwrap();

    let snapshot = next_matching(&mut update_rx, |s| s.advisory.is_some()).await;
    assert_eq!(snapshot.advisory.as_deref(), Some("interesting opening choice"));

    // The digest of a fresh game still names the position and side to move.
    let seen = digests.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].ends_with("White to move"));

    drop(input_tx);
    handle.await.unwrap();
}

#[tokio::test]
async fn engine_failure_mid_game_disables_further_automated_turns() {
    // One scripted reply, then the script runs dry and the adapter fails.
    let engine: Box<dyn MoveProvider> = Box::new(ScriptedEngine::new(&["e7e5"]));
    let runtime = SessionRuntime::new(&test_config(), Some(engine), None);

    let (input_tx, input_rx) = mpsc::channel(8);
    let (update_tx, mut update_rx) = mpsc::channel(64);
    let handle = tokio::spawn(runtime.run(input_rx, update_tx));

    click(&input_tx, "e2").await;
    click(&input_tx, "e4").await;
    next_matching(&mut update_rx, |s| {
        s.last_move == Some(("e7".to_string(), "e5".to_string()))
    })
    .await;

    click(&input_tx, "d2").await;
    click(&input_tx, "d4").await;
    next_matching(&mut update_rx, |s| s.status.starts_with("halted")).await;

    // After a reset the session works, but the next opponent turn halts
    // again: the failed adapter was released for the rest of the run.
    input_tx.send(InputEvent::Reset).await.unwrap();
    click(&input_tx, "e2").await;
    click(&input_tx, "e4").await;
    let snapshot =
        next_matching(&mut update_rx, |s| s.status.starts_with("halted")).await;
    assert!(snapshot.status.contains("no engine adapter"));

    drop(input_tx);
    handle.await.unwrap();
}
