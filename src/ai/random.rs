use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::agent::Agent;
use crate::game::Environment;

/// An agent that selects uniformly at random from legal actions.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        RandomAgent {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        RandomAgent {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> Agent<E> for RandomAgent {
    fn select_action(&mut self, _observation: &E::Observation, legal: &[E::Action]) -> E::Action {
        assert!(!legal.is_empty(), "No legal actions available");
        let idx = self.rng.random_range(0..legal.len());
        legal[idx]
    }

    fn name(&self) -> &str {
        "Random"
    }
}
