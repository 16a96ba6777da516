//! Anonymized answer list
//!
//! The ballot pairs every submission (and the admin's correct continuation)
//! with its author, in an order produced by a pluggable [`Shuffler`]. The
//! list is built on the first successful read of a round and cached, so
//! everyone sees the same numbering.

use super::Session;
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Source of the ballot order
pub trait Shuffler {
    fn shuffle(&mut self, entries: &mut [ShuffledEntry]);
}

/// Uniform permutation from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadShuffler;

impl Shuffler for ThreadShuffler {
    fn shuffle(&mut self, entries: &mut [ShuffledEntry]) {
        entries.shuffle(&mut rand::rng());
    }
}

/// Uniform permutation from a seeded RNG, reproducible across runs
#[derive(Debug, Clone)]
pub struct SeededShuffler {
    rng: StdRng,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Shuffler for SeededShuffler {
    fn shuffle(&mut self, entries: &mut [ShuffledEntry]) {
        entries.shuffle(&mut self.rng);
    }
}

impl Session {
    /// The anonymized ballot for the current round.
    ///
    /// The first successful call shuffles and caches the list and moves
    /// `CollectingAnswers` to `ReadyToVote`. Later calls in the same round
    /// return the cached list untouched.
    pub fn get_shuffled_entries(&mut self) -> GameResult<Vec<ShuffledEntry>> {
        if self.phase == Phase::Idle {
            return Err(GameError::NoActiveRound);
        }
        let fragment = self
            .start_fragment
            .as_deref()
            .ok_or(GameError::MissingFragment)?;
        let correct = self
            .correct_continuation
            .as_deref()
            .ok_or(GameError::MissingContinuation)?;
        if !self.collection_complete() {
            return Err(GameError::SubmissionsIncomplete);
        }

        if let Some(entries) = &self.shuffled {
            return Ok(entries.clone());
        }

        let mut entries: Vec<ShuffledEntry> = self
            .submissions
            .iter()
            .map(|(author, answer)| ShuffledEntry {
                author: Some(author.clone()),
                text: format!("{}\n{}", fragment, answer),
            })
            .collect();
        entries.push(ShuffledEntry {
            author: None,
            text: format!("{}\n{}", fragment, correct),
        });
        self.shuffler.shuffle(&mut entries);

        tracing::info!(entries = entries.len(), "Answers shuffled");
        self.shuffled = Some(entries.clone());
        if self.phase == Phase::CollectingAnswers {
            self.phase = Phase::ReadyToVote;
        }
        Ok(entries)
    }
}
