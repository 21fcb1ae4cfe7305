use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quiz_core::session::HelperStrategy;

/// Flip-question strategy that jumps to a random later question.
#[derive(Debug, Clone)]
pub struct RandomAhead {
    rng: StdRng,
}

impl RandomAhead {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Deterministic variant for tests and replays.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomAhead {
    fn default() -> Self {
        Self::new()
    }
}

impl HelperStrategy for RandomAhead {
    fn alternate(&mut self, current: usize, total: usize) -> Option<usize> {
        let first = current + 1;
        (first < total).then(|| self.rng.random_range(first..total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_picks_a_later_question() {
        let mut helper = RandomAhead::seeded(7);
        for _ in 0..100 {
            let idx = helper.alternate(2, 10).unwrap();
            assert!((3..10).contains(&idx));
        }
    }

    #[test]
    fn nothing_after_the_last_question() {
        let mut helper = RandomAhead::seeded(7);
        assert_eq!(helper.alternate(4, 5), None);
        assert_eq!(helper.alternate(0, 1), None);
    }
}
