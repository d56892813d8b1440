//! Wordfall - a real-time, two-player head-to-head word puzzle engine.
//!
//! Players receive a stream of randomized letter-alphabets ("alphagrams")
//! that descend piece by piece into a fixed-height column. A player wins by
//! producing every valid anagram of all their assigned alphagrams; fully
//! solving one's OWN piece sends it onto the opponent's board as an attack.
//! A player loses when their column overflows.
//!
//! The crate is a library with no network surface of its own. It consumes a
//! [`provider::QuestionProvider`] for alphagram pools and exposes
//! [`core::Match`]: construction, `start_game_countdown`, guess injection,
//! and a byte stream of JSON snapshots after every state change. The
//! [`session`] module provides the seek/join bookkeeping that creates
//! matches.
//!
//! # Module structure
//!
//! - [`types`]: normative constants and shared enums
//! - [`core`]: questions, boards, the match manager, snapshots
//! - [`provider`]: the question-search seam
//! - [`session`]: game session bookkeeping

pub mod core;
pub mod provider;
pub mod session;
pub mod types;
