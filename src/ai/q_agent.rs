use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ai::agent::{Agent, EvalState, Learner, Transition};
use crate::error::AgentError;
use crate::game::Environment;

const STATE_FILE: &str = "q_agent.json";

/// Bounds an observation or action needs to index the value table.
pub trait TableKey: Clone + Eq + Hash + Serialize + DeserializeOwned {}

impl<T: Clone + Eq + Hash + Serialize + DeserializeOwned> TableKey for T {}

/// Q-learning hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QAgentConfig {
    /// Starting probability of playing the best known move.
    pub epsilon: f32,
    /// Added to epsilon after every update, up to `epsilon_max`.
    pub epsilon_increment: f32,
    pub epsilon_max: f32,
    pub discount: f32,
    pub learning_rate: f32,
}

impl Default for QAgentConfig {
    fn default() -> Self {
        QAgentConfig {
            epsilon: 0.0,
            epsilon_increment: 5e-5,
            epsilon_max: 0.85,
            discount: 0.85,
            learning_rate: 0.1,
        }
    }
}

/// Serialized form written to `q_agent.json`.
#[derive(Serialize, Deserialize)]
struct QAgentRecord<K, A> {
    config: QAgentConfig,
    epsilon: f32,
    update_count: u64,
    table: Vec<(K, Vec<(A, f32)>)>,
}

/// Tabular epsilon-greedy Q-learner keyed on observations.
pub struct QAgent<E: Environment> {
    config: QAgentConfig,
    epsilon: f32,
    table: HashMap<E::Observation, Vec<(E::Action, f32)>>,
    update_count: u64,
    rng: StdRng,
}

impl<E> QAgent<E>
where
    E: Environment,
    E::Observation: TableKey,
    E::Action: TableKey,
{
    pub fn new(config: QAgentConfig) -> Self {
        Self::from_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: QAgentConfig, seed: u64) -> Self {
        Self::from_rng(config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(config: QAgentConfig, rng: StdRng) -> Self {
        QAgent {
            epsilon: config.epsilon,
            config,
            table: HashMap::new(),
            update_count: 0,
            rng,
        }
    }

    pub fn config(&self) -> &QAgentConfig {
        &self.config
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Number of distinct observations with at least one stored value.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Stored value for `action` at `observation`; unseen pairs are 0.
    pub fn q_value(&self, observation: &E::Observation, action: &E::Action) -> f32 {
        self.table
            .get(observation)
            .and_then(|row| row.iter().find(|(a, _)| a == action))
            .map(|(_, q)| *q)
            .unwrap_or(0.0)
    }

    /// Highest-valued legal action; the earliest one wins ties.
    fn greedy_action(&self, observation: &E::Observation, legal: &[E::Action]) -> E::Action {
        let mut best_action = legal[0];
        let mut best_q = f32::NEG_INFINITY;
        for action in legal {
            let q = self.q_value(observation, action);
            if q > best_q {
                best_q = q;
                best_action = *action;
            }
        }
        best_action
    }

    fn max_q(&self, observation: &E::Observation, legal: &[E::Action]) -> f32 {
        legal
            .iter()
            .map(|a| self.q_value(observation, a))
            .fold(None, |best: Option<f32>, q| Some(best.map_or(q, |b| b.max(q))))
            .unwrap_or(0.0)
    }

    fn increment_epsilon(&mut self) {
        if self.epsilon < self.config.epsilon_max {
            self.epsilon = (self.epsilon + self.config.epsilon_increment).min(self.config.epsilon_max);
        }
    }
}

impl<E> Agent<E> for QAgent<E>
where
    E: Environment,
    E::Observation: TableKey,
    E::Action: TableKey,
{
    fn select_action(&mut self, observation: &E::Observation, legal: &[E::Action]) -> E::Action {
        assert!(!legal.is_empty(), "No legal actions");

        if self.epsilon >= 1.0 || self.rng.random_range(0.0..1.0) < self.epsilon {
            return self.greedy_action(observation, legal);
        }
        let idx = self.rng.random_range(0..legal.len());
        legal[idx]
    }

    fn name(&self) -> &str {
        "QAgent"
    }

    fn enter_eval_mode(&mut self) -> EvalState {
        let saved = self.epsilon;
        self.epsilon = 1.0;
        EvalState::Epsilon(saved)
    }

    fn exit_eval_mode(&mut self, state: EvalState) {
        if let EvalState::Epsilon(eps) = state {
            self.epsilon = eps;
        }
    }
}

impl<E> Learner<E> for QAgent<E>
where
    E: Environment,
    E::Observation: TableKey,
    E::Action: TableKey,
{
    fn epsilon(&self) -> f32 {
        self.epsilon
    }

    fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon;
    }

    fn update(&mut self, transition: &Transition<E>) {
        let target = if transition.done {
            transition.reward
        } else {
            let next = self.max_q(&transition.next_observation, &transition.next_legal);
            transition.reward + self.config.discount * next
        };

        let lr = self.config.learning_rate;
        let row = self
            .table
            .entry(transition.observation.clone())
            .or_default();
        match row.iter_mut().find(|(a, _)| *a == transition.action) {
            Some((_, q)) => *q += lr * (target - *q),
            None => row.push((transition.action, lr * target)),
        }

        self.update_count += 1;
        self.increment_epsilon();
    }

    fn save(&self, dir: &Path) -> Result<(), AgentError> {
        fs::create_dir_all(dir).map_err(|e| AgentError::Io {
            operation: "create",
            path: dir.to_path_buf(),
            source: e,
        })?;

        let record = QAgentRecord {
            config: self.config.clone(),
            epsilon: self.epsilon,
            update_count: self.update_count,
            table: self
                .table
                .iter()
                .map(|(k, row)| (k.clone(), row.clone()))
                .collect(),
        };
        let json = serde_json::to_string(&record)?;
        let path = dir.join(STATE_FILE);
        fs::write(&path, json).map_err(|e| AgentError::Io {
            operation: "write",
            path,
            source: e,
        })
    }

    fn load(&mut self, dir: &Path) -> Result<(), AgentError> {
        let path = dir.join(STATE_FILE);
        let json = fs::read_to_string(&path).map_err(|e| AgentError::Io {
            operation: "read",
            path: path.clone(),
            source: e,
        })?;
        let record: QAgentRecord<E::Observation, E::Action> =
            serde_json::from_str(&json).map_err(|e| AgentError::Decode { path, source: e })?;

        self.config = record.config;
        self.epsilon = record.epsilon;
        self.update_count = record.update_count;
        self.table = record.table.into_iter().collect();
        Ok(())
    }

    fn blank(&self) -> Self {
        Self::new(self.config.clone())
    }

    fn copy_parameters(&self) -> Result<Self, AgentError> {
        Ok(QAgent {
            config: self.config.clone(),
            epsilon: self.epsilon,
            table: self.table.clone(),
            update_count: self.update_count,
            rng: StdRng::from_os_rng(),
        })
    }
}
