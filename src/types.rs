//! Core types shared across the engine.
//! This module contains pure data types and the normative game constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of slots on a board, ordered from top (index 0) to bottom.
pub const NUM_SLOTS: usize = 16;

/// Questions dealt per round, split evenly between the two players.
pub const TOTAL_QUESTIONS: usize = 50;

/// Number of players in a match. The data model is generalized to N but the
/// attack router assumes exactly two.
pub const N_PLAYERS: usize = 2;

/// Game timing constants.
pub const TICK_DURATION: Duration = Duration::from_secs(1);
/// Delay between an attack arriving and it becoming ready to land.
pub const ATTACK_DELAY: Duration = Duration::from_secs(3);
/// Countdown before the first round of a match.
pub const INIT_COUNTDOWN: Duration = Duration::from_secs(2);
/// Countdown between rounds (rematch).
pub const NEXT_COUNTDOWN: Duration = Duration::from_secs(10);

/// Channel capacities.
pub const GUESS_CHANNEL_CAP: usize = 5;
pub const ATTACK_INBOX_CAP: usize = 5;
pub const ATTACK_ROUTER_CAP: usize = 8;

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Countdown,
    Playing,
    PermanentlyOver,
}

/// Drop-scheduler state of a single board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardStatus {
    /// A piece occupies the faller position and advances one slot per tick.
    PieceDropping,
    /// The previous piece just landed; the board pauses before releasing the next.
    PieceAboutToDrop,
    /// The player queue is exhausted; the board idles waiting for attacks or the win.
    PlayerQueueEmpty,
}

/// Animation-relevant event kinds. The front-end uses the most recent one to
/// animate the transition into the snapshot that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateChangeType {
    /// A single piece fell one slot.
    PieceFall,
    /// A piece landed at the lowest available point.
    PieceLand,
    /// The stack rose, because opponent pieces landed on it.
    StackRise,
    /// Opponent pieces were queued up to raise the stack.
    StackQueue,
    /// A question was fully solved.
    FullySolveQuestion,
    Lost,
}

/// The most recent animation-relevant event on a board. Sent to the display
/// front-end along with the full state; clients that miss a snapshot cannot
/// reconstruct intermediate animations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub change_type: StateChangeType,
    pub num: i32,
    pub num2: i32,
    pub text: String,
}

impl StateChange {
    pub fn new(change_type: StateChangeType) -> Self {
        Self {
            change_type,
            num: 0,
            num2: 0,
            text: String::new(),
        }
    }

    pub fn with_num(change_type: StateChangeType, num: i32) -> Self {
        Self {
            num,
            ..Self::new(change_type)
        }
    }

    pub fn with_nums(change_type: StateChangeType, num: i32, num2: i32) -> Self {
        Self {
            num,
            num2,
            ..Self::new(change_type)
        }
    }
}
