//! Terminal driver for the session engine.
//!
//! A thin stand-in for the presentation collaborator: it translates typed
//! commands into input events and prints each snapshot the session emits.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use game_session::clients::advisor::{AdvisoryProvider, HttpAdvisor};
use game_session::{Config, InputEvent, SessionRuntime, SessionSnapshot};
use shakmaty::{Role, Square};
use uci_engine::{MoveProvider, UciEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    // Acquire the engine adapter once per run; without it the session still
    // validates human moves but cannot play opponent turns.
    let engine: Option<Box<dyn MoveProvider>> =
        match UciEngine::spawn(&config.stockfish_path).await {
            Ok(engine) => {
                tracing::info!(path = %config.stockfish_path, "engine ready");
                Some(Box::new(engine))
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine unavailable - automated opponent disabled");
                None
            }
        };

    let advisor: Option<Arc<dyn AdvisoryProvider>> = match config.advisor_url.as_deref() {
        Some(url) => {
            tracing::info!(url, "advisory service configured");
            Some(Arc::new(HttpAdvisor::new(url)))
        }
        None => None,
    };

    let (input_tx, input_rx) = mpsc::channel(16);
    let (update_tx, mut update_rx) = mpsc::channel(16);

    let runtime = SessionRuntime::new(&config, engine, advisor);
    let session = tokio::spawn(runtime.run(input_rx, update_tx));

    let printer = tokio::spawn(async move {
        while let Some(snapshot) = update_rx.recv().await {
            print_snapshot(&snapshot);
        }
    });

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if line == "help" {
            print_help();
            continue;
        }
        match parse_command(line) {
            Some(event) => {
                if input_tx.send(event).await.is_err() {
                    break;
                }
            }
            None => eprintln!("unrecognized command: {line}"),
        }
    }

    drop(input_tx);
    let _ = session.await;
    let _ = printer.await;
    Ok(())
}

fn parse_command(line: &str) -> Option<InputEvent> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "click" => parts
            .next()?
            .parse::<Square>()
            .ok()
            .map(InputEvent::SquareClicked),
        "promote" => parse_role(parts.next()?).map(InputEvent::PromotionChosen),
        "cancel" => Some(InputEvent::PromotionCancelled),
        "suggest" => parse_toggle(parts.next()?).map(InputEvent::SuggestionsToggled),
        "commentary" => parse_toggle(parts.next()?).map(InputEvent::CommentaryToggled),
        "judge" => parse_toggle(parts.next()?).map(InputEvent::JudgmentToggled),
        "ask" => {
            let message = line.strip_prefix("ask")?.trim();
            if message.is_empty() {
                None
            } else {
                Some(InputEvent::AdvisoryAsked(message.to_string()))
            }
        }
        "reset" => Some(InputEvent::Reset),
        _ => None,
    }
}

fn parse_role(word: &str) -> Option<Role> {
    match word {
        "q" | "queen" => Some(Role::Queen),
        "r" | "rook" => Some(Role::Rook),
        "b" | "bishop" => Some(Role::Bishop),
        "n" | "knight" => Some(Role::Knight),
        _ => None,
    }
}

fn parse_toggle(word: &str) -> Option<bool> {
    match word {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    let mut grid = [['.'; 8]; 8];
    for piece in &snapshot.pieces {
        let bytes = piece.square.as_bytes();
        if bytes.len() == 2 {
            let file = (bytes[0] - b'a') as usize;
            let rank = (bytes[1] - b'1') as usize;
            if file < 8 && rank < 8 {
                grid[rank][file] = piece.piece;
            }
        }
    }

    println!();
    for rank in (0..8).rev() {
        print!("{} ", rank + 1);
        for cell in &grid[rank] {
            print!("{cell} ");
        }
        println!();
    }
    println!("  a b c d e f g h");
    println!("{}", snapshot.status);
    println!(
        "You (White): {} wins | Engine (Black): {} wins | Engine Elo: {}",
        snapshot.human_wins, snapshot.engine_wins, snapshot.rating
    );
    if let Some(selected) = &snapshot.selected {
        println!(
            "selected {selected} -> {}",
            snapshot.legal_destinations.join(" ")
        );
    }
    if let Some(suggestion) = &snapshot.suggestion {
        println!("suggestion: {suggestion}");
    }
    if let Some(advisory) = &snapshot.advisory {
        println!("advisory: {advisory}");
    }
}

fn print_help() {
    println!("commands:");
    println!("  click <square>        select a piece / drop it on a destination");
    println!("  promote <q|r|b|n>     finish a promotion");
    println!("  cancel                abort a promotion");
    println!("  suggest on|off        toggle best-move hints");
    println!("  commentary on|off     toggle advisory commentary");
    println!("  judge on|off          toggle advisory judgment of your moves");
    println!("  ask <message>         ask the advisory service a question");
    println!("  reset                 start a new game");
    println!("  quit                  exit");
}
