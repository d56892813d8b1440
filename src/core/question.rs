//! Alphagrams and the questions built from them.
//!
//! An alphagram is the canonical sorted-letter form of a word; the puzzle
//! presents the alphagram and the player names valid anagrams of it. A
//! `Question` wraps one alphagram for the lifetime of a match: it starts in
//! its owner's queue, descends their board, and on an owner-solve is recycled
//! onto the opponent with its answer set restored.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Sort the characters of a word by code point. Guesses are lowercased before
/// this is applied so that guess and alphagram comparisons agree.
pub fn alphagrammize(word: &str) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    chars.sort_unstable();
    chars.into_iter().collect()
}

/// A sorted letter sequence plus every valid word that anagrams to it.
/// Immutable once constructed; shared between a question's recycled lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alphagram {
    pub alphagram: String,
    pub words: Vec<String>,
}

impl Alphagram {
    pub fn new(alphagram: impl Into<String>, words: Vec<String>) -> Self {
        Self {
            alphagram: alphagram.into(),
            words,
        }
    }
}

/// A single puzzle piece in play.
#[derive(Debug, Clone)]
pub struct Question {
    alphagram: Arc<Alphagram>,
    /// Index of the player whose queue this question originally came from.
    /// Never rewritten; on the opponent's board it marks the piece as an attack.
    owner: usize,
    answers_remaining: HashSet<String>,
}

impl Question {
    /// Build a question from a provider alphagram. The letter sequence is
    /// re-sorted so guesses and alphagrams compare consistently even if the
    /// provider's ordering differs.
    pub fn new(alphagram: &Alphagram, owner: usize) -> Self {
        let normalized = Alphagram {
            alphagram: alphagrammize(&alphagram.alphagram),
            words: alphagram.words.clone(),
        };
        let mut q = Self {
            alphagram: Arc::new(normalized),
            owner,
            answers_remaining: HashSet::new(),
        };
        q.repopulate();
        q
    }

    /// Restore the full answer set, lowercased. Called at construction and at
    /// the moment the question is recycled onto the opponent.
    pub fn repopulate(&mut self) {
        self.answers_remaining = self
            .alphagram
            .words
            .iter()
            .map(|w| w.to_lowercase())
            .collect();
    }

    pub fn alphagram(&self) -> &str {
        &self.alphagram.alphagram
    }

    pub fn owner(&self) -> usize {
        self.owner
    }

    pub fn answers_left(&self) -> usize {
        self.answers_remaining.len()
    }

    pub fn answers_remaining(&self) -> &HashSet<String> {
        &self.answers_remaining
    }

    /// Apply one guess to this question. Returns
    /// (partially_solved, fully_solved, wrong_anagram):
    /// - partial: the guess was a remaining answer and was removed;
    /// - fully: that removal emptied the answer set;
    /// - wrong: not an answer, but its letters match this alphagram.
    ///
    /// The guess must already be lowercased and trimmed.
    pub fn solve(&mut self, guess: &str) -> (bool, bool, bool) {
        let mut partial = false;
        let mut wrong = false;

        if self.answers_remaining.remove(guess) {
            partial = true;
        } else if alphagrammize(guess) == self.alphagram.alphagram.to_lowercase() {
            wrong = true;
        }

        let fully = partial && self.answers_remaining.is_empty();
        (partial, fully, wrong)
    }
}
