use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::error::AgentError;
use crate::game::Environment;

/// A single learning step seen from the learner's seat.
pub struct Transition<E: Environment> {
    pub observation: E::Observation,
    pub action: E::Action,
    /// Points collected between this decision and the learner's next one.
    pub reward: f32,
    pub next_observation: E::Observation,
    /// Legal moves at `next_observation`; empty when `done`.
    pub next_legal: Vec<E::Action>,
    pub done: bool,
}

impl<E: Environment> Clone for Transition<E> {
    fn clone(&self) -> Self {
        Transition {
            observation: self.observation.clone(),
            action: self.action,
            reward: self.reward,
            next_observation: self.next_observation.clone(),
            next_legal: self.next_legal.clone(),
            done: self.done,
        }
    }
}

impl<E: Environment> std::fmt::Debug for Transition<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("observation", &self.observation)
            .field("action", &self.action)
            .field("reward", &self.reward)
            .field("next_observation", &self.next_observation)
            .field("next_legal", &self.next_legal)
            .field("done", &self.done)
            .finish()
    }
}

/// Opaque eval state for enter/exit eval mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalState {
    Epsilon(f32),
    NoOp,
}

/// Anything that can sit at the table and pick moves.
pub trait Agent<E: Environment> {
    /// Select an action from `legal` given the current observation.
    fn select_action(&mut self, observation: &E::Observation, legal: &[E::Action]) -> E::Action;

    /// Return the agent's display name.
    fn name(&self) -> &str;

    /// Enter eval mode (always exploit). Returns state to restore.
    fn enter_eval_mode(&mut self) -> EvalState {
        EvalState::NoOp
    }

    /// Exit eval mode, restoring previous state.
    fn exit_eval_mode(&mut self, _state: EvalState) {}
}

/// The trainable capability: an agent whose parameters move.
///
/// `epsilon` is the probability of exploiting; 1.0 means fully greedy.
pub trait Learner<E: Environment>: Agent<E> {
    fn epsilon(&self) -> f32;

    fn set_epsilon(&mut self, epsilon: f32);

    /// Learn from one transition.
    fn update(&mut self, transition: &Transition<E>);

    /// Persist the full learner state into `dir`, creating it if needed.
    fn save(&self, dir: &Path) -> Result<(), AgentError>;

    /// Replace this learner's state with the one persisted in `dir`.
    fn load(&mut self, dir: &Path) -> Result<(), AgentError>;

    /// An untrained instance with the same hyperparameters.
    fn blank(&self) -> Self
    where
        Self: Sized;

    /// A by-value copy of the current parameters, unaffected by later updates.
    ///
    /// The default round-trips through `save`/`load` in a temporary
    /// directory that is removed on every exit path.
    fn copy_parameters(&self) -> Result<Self, AgentError>
    where
        Self: Sized,
    {
        let tmp = tempfile::tempdir().map_err(|e| AgentError::Io {
            operation: "create temporary directory",
            path: std::env::temp_dir(),
            source: e,
        })?;
        self.save(tmp.path())?;
        let mut copy = self.blank();
        copy.load(tmp.path())?;
        Ok(copy)
    }
}

/// Scoped greedy mode: the agent's eval state is restored when the guard
/// drops, including on early return through `?`.
pub struct EvalMode<'a, E, A>
where
    E: Environment,
    A: Agent<E> + ?Sized,
{
    agent: &'a mut A,
    restore: Option<EvalState>,
    _env: PhantomData<fn(&E)>,
}

impl<'a, E, A> EvalMode<'a, E, A>
where
    E: Environment,
    A: Agent<E> + ?Sized,
{
    pub fn enter(agent: &'a mut A) -> Self {
        let restore = Some(agent.enter_eval_mode());
        EvalMode {
            agent,
            restore,
            _env: PhantomData,
        }
    }
}

impl<E, A> Deref for EvalMode<'_, E, A>
where
    E: Environment,
    A: Agent<E> + ?Sized,
{
    type Target = A;

    fn deref(&self) -> &A {
        self.agent
    }
}

impl<E, A> DerefMut for EvalMode<'_, E, A>
where
    E: Environment,
    A: Agent<E> + ?Sized,
{
    fn deref_mut(&mut self) -> &mut A {
        self.agent
    }
}

impl<E, A> Drop for EvalMode<'_, E, A>
where
    E: Environment,
    A: Agent<E> + ?Sized,
{
    fn drop(&mut self) {
        if let Some(state) = self.restore.take() {
            self.agent.exit_eval_mode(state);
        }
    }
}
