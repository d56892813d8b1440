//! Core game engine: questions, boards, and the match manager.
//!
//! Dependency order, leaves first: [`question`] (pure data), [`rng`]
//! (deterministic shuffling), [`board`] (a single player's column and its
//! drop scheduler), [`manager`] (composes two boards, routes attacks between
//! them, gates snapshots). [`snapshot`] holds the serialized view.

pub mod board;
pub mod manager;
pub mod question;
pub mod rng;
pub mod snapshot;

pub use board::{Board, BoardState, GuessOutcome};
pub use manager::{Match, MatchError};
pub use question::{alphagrammize, Alphagram, Question};
pub use rng::MatchShuffler;
pub use snapshot::{BoardSnapshot, MatchSnapshot, QuestionSnapshot};

use tokio::time::Instant;

/// Await a deadline, or forever when the timer is not armed. This is how the
/// board and match loops model stoppable timers inside `select!`.
pub(crate) async fn timer(deadline: Option<Instant>) {
    match deadline {
        Some(instant) => tokio::time::sleep_until(instant).await,
        None => std::future::pending::<()>().await,
    }
}
