//! Tie-break randomness.
//!
//! Each process owns one long-lived stream of uniform draws, consumed only
//! when a vote tally ends in a tie. Because replayed transitions never
//! re-run the tally, a process that reports someone else's transition must
//! instead discard as many draws as the executor consumed, keeping
//! co-hosted streams aligned with the persisted history.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

/// A long-lived sequence of uniform draws in `[0, 1)`.
pub trait DrawStream: Send {
    /// The next draw. Advances the stream by exactly one.
    fn next_draw(&mut self) -> f64;

    /// Draws handed out so far.
    fn taken(&self) -> u64;

    /// Consume `n` draws without using them.
    fn discard(&mut self, n: u32) {
        for _ in 0..n {
            self.next_draw();
        }
    }
}

/// Deterministically seeded stream. Two processes built from the same seed
/// produce identical draw sequences for as long as they stay aligned.
#[derive(Debug)]
pub struct SeededDraws {
    rng: StdRng,
    taken: u64,
}

impl SeededDraws {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            taken: 0,
        }
    }
}

impl Default for SeededDraws {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl DrawStream for SeededDraws {
    fn next_draw(&mut self) -> f64 {
        self.taken += 1;
        self.rng.gen::<f64>()
    }

    fn taken(&self) -> u64 {
        self.taken
    }
}

/// Test stream yielding a scripted sequence, cycling when it runs out.
#[derive(Debug)]
pub struct RecordingDraws {
    values: Vec<f64>,
    cursor: usize,
    taken: u64,
}

impl RecordingDraws {
    pub fn with(values: Vec<f64>) -> Self {
        Self {
            values,
            cursor: 0,
            taken: 0,
        }
    }
}

impl DrawStream for RecordingDraws {
    fn next_draw(&mut self) -> f64 {
        self.taken += 1;
        if self.values.is_empty() {
            return 0.5;
        }
        let v = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        v
    }

    fn taken(&self) -> u64 {
        self.taken
    }
}
