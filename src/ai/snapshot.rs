use std::marker::PhantomData;

use crate::ai::agent::{Agent, Learner};
use crate::error::AgentError;
use crate::game::Environment;

/// A frozen, always-greedy copy of a learner's policy at one epoch.
///
/// Only [`Agent`] is implemented, so a snapshot cannot be handed to anything
/// that trains. Its parameters are a by-value copy taken at freeze time.
pub struct SnapshotAgent<E: Environment, L: Learner<E>> {
    inner: L,
    epoch: usize,
    name: String,
    _env: PhantomData<fn(&E)>,
}

impl<E: Environment, L: Learner<E>> SnapshotAgent<E, L> {
    /// Freeze the learner's current parameters.
    pub fn freeze(learner: &L, epoch: usize) -> Result<Self, AgentError> {
        let mut inner = learner.copy_parameters()?;
        inner.set_epsilon(1.0);
        let name = format!("{}@{}", learner.name(), epoch);
        Ok(SnapshotAgent {
            inner,
            epoch,
            name,
            _env: PhantomData,
        })
    }

    /// Epoch at which the snapshot was taken (0 = untrained).
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn epsilon(&self) -> f32 {
        self.inner.epsilon()
    }
}

impl<E: Environment, L: Learner<E>> Agent<E> for SnapshotAgent<E, L> {
    fn select_action(&mut self, observation: &E::Observation, legal: &[E::Action]) -> E::Action {
        self.inner.select_action(observation, legal)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
