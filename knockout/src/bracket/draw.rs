//! Random draw for first-round pairings and structural byes.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

enum DrawMode {
    /// Keep positional order and always pick the first candidate
    Ordered,
    /// Shuffle with the given generator
    Shuffled(StdRng),
}

/// Source of the bracket draw
pub struct Draw {
    mode: DrawMode,
}

impl Draw {
    /// Draw seeded from the operating system
    pub fn random() -> Self {
        Self {
            mode: DrawMode::Shuffled(StdRng::from_os_rng()),
        }
    }

    /// Reproducible draw: the same seed and competitor list give the same bracket
    pub fn seeded(seed: u64) -> Self {
        Self {
            mode: DrawMode::Shuffled(StdRng::seed_from_u64(seed)),
        }
    }

    /// No randomness: competitors are paired in list order
    pub fn ordered() -> Self {
        Self {
            mode: DrawMode::Ordered,
        }
    }

    /// Pair entrants two at a time
    ///
    /// With an odd number of entrants the last pair has an absent opponent.
    ///
    /// # Arguments
    ///
    /// * `entrants` - Competitors of one group
    ///
    /// # Returns
    ///
    /// * `Vec<(T, Option<T>)>` - Pairs; `None` marks the absent seat
    pub fn pair<T: Copy>(&mut self, entrants: &[T]) -> Vec<(T, Option<T>)> {
        let mut order = entrants.to_vec();
        if let DrawMode::Shuffled(rng) = &mut self.mode {
            order.shuffle(rng);
        }

        order
            .chunks(2)
            .map(|pair| (pair[0], pair.get(1).copied()))
            .collect()
    }

    /// Choose one of `candidates` candidates, or `None` if there are none
    pub fn pick(&mut self, candidates: usize) -> Option<usize> {
        if candidates == 0 {
            return None;
        }

        match &mut self.mode {
            DrawMode::Ordered => Some(0),
            DrawMode::Shuffled(rng) => Some(rng.random_range(0..candidates)),
        }
    }
}

impl Default for Draw {
    fn default() -> Self {
        Self::random()
    }
}
