use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use crate::core::{identity, Usp, SYMBOLS};

/// Produces random puzzles with every entry drawn uniformly from {1, 2, 3}.
/// Seeded generators are fully reproducible.
pub struct UspGenerator {
    rng: ChaCha20Rng,
}

impl UspGenerator {
    pub fn new() -> Self {
        Self::from_rng(ChaCha20Rng::from_rng(&mut rand::rng()))
    }

    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: ChaCha20Rng) -> Self {
        Self { rng }
    }

    pub fn random_puzzle(&mut self, rows: usize, cols: usize) -> Usp {
        let symbols = (0..rows * cols)
            .map(|_| SYMBOLS[self.rng.random_range(0..SYMBOLS.len())])
            .collect();
        Usp::from_symbols(symbols, rows, cols)
    }

    /// A uniformly random permutation of [0, n).
    pub fn random_permutation(&mut self, n: usize) -> Vec<usize> {
        let mut perm = identity(n);
        perm.shuffle(&mut self.rng);
        perm
    }
}

impl Default for UspGenerator {
    fn default() -> Self {
        Self::new()
    }
}
