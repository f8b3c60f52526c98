//! Session orchestration for human-vs-engine play.
//!
//! [`controller::SessionController`] is the synchronous turn state machine
//! and the single owner of all mutable game state; [`runtime::SessionRuntime`]
//! wraps it in a cooperative event loop that talks to the engine worker and
//! the advisory collaborator.

pub mod clients;
pub mod config;
pub mod controller;
pub mod difficulty;
pub mod runtime;
pub mod snapshot;

pub use config::Config;
pub use controller::{GameEnd, Reaction, SessionController, TurnState, HUMAN_SIDE};
pub use difficulty::{DifficultyRegulator, WinTally};
pub use runtime::{InputEvent, SessionRuntime};
pub use snapshot::{PieceOnSquare, SessionSnapshot};
