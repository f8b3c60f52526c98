//! Adapter to an external UCI move-search process.
//!
//! The session layer talks to [`MoveProvider`], never to the process
//! directly; [`UciEngine`] is the production implementation, tests use
//! deterministic doubles.

pub mod engine;
pub mod provider;

pub use engine::UciEngine;
pub use provider::{EngineError, MoveProvider};
