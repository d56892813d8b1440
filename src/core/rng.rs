//! Deterministic question shuffling.
//!
//! Each round reseeds from the match's 32-byte seed, so the shuffle of the
//! full question pool is identical every round and the rounds consume
//! successive slices of the same permutation. ChaCha8 keeps quality high
//! while staying cheap to reseed.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A freshly seeded shuffler. Construct one per round from the match seed.
#[derive(Debug)]
pub struct MatchShuffler {
    rng: ChaCha8Rng,
}

impl MatchShuffler {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            rng: ChaCha8Rng::from_seed(seed),
        }
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
