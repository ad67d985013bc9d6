//! Test doubles: a toy three-card trick game and instrumented agents.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::ai::{Agent, EvalState, Learner, Transition};
use crate::error::{AgentError, TrainingError};
use crate::game::{Environment, Player};
use crate::training::episode::{
    EpisodeRunner, EpisodeSummary, EvaluationOutcome, Evaluator, TurnBasedRunner,
};

/// Cards 1..=6, three per player, three tricks. The higher card takes the
/// trick and both cards' values as points, then leads the next trick.
pub struct TrickDuel {
    rng: StdRng,
    hands: [Vec<u8>; 2],
    table: Option<(Player, u8)>,
    to_move: Player,
    points: [u32; 2],
    first_movers: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DuelView {
    pub hand: Vec<u8>,
    pub table: Option<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error("card {0} is not in hand")]
    NotInHand(u8),
}

impl TrickDuel {
    pub fn new(seed: u64) -> Self {
        TrickDuel {
            rng: StdRng::seed_from_u64(seed),
            hands: [Vec::new(), Vec::new()],
            table: None,
            to_move: Player::One,
            points: [0, 0],
            first_movers: Vec::new(),
        }
    }

    /// First mover of every game dealt so far.
    pub fn first_movers(&self) -> &[Player] {
        &self.first_movers
    }
}

impl Environment for TrickDuel {
    type Observation = DuelView;
    type Action = u8;
    type Error = DuelError;

    fn reset(&mut self, first: Player) {
        let mut deck: Vec<u8> = (1..=6).collect();
        deck.shuffle(&mut self.rng);
        let mut one = deck[..3].to_vec();
        let mut two = deck[3..].to_vec();
        one.sort_unstable();
        two.sort_unstable();
        self.hands = [one, two];
        self.table = None;
        self.to_move = first;
        self.points = [0, 0];
        self.first_movers.push(first);
    }

    fn is_over(&self) -> bool {
        self.table.is_none() && self.hands.iter().all(|h| h.is_empty())
    }

    fn to_move(&self) -> Player {
        self.to_move
    }

    fn observe(&self, player: Player) -> DuelView {
        DuelView {
            hand: self.hands[player.index()].clone(),
            table: self.table.map(|(_, card)| card),
        }
    }

    fn legal_actions(&self, player: Player) -> Vec<u8> {
        if self.is_over() {
            return Vec::new();
        }
        self.hands[player.index()].clone()
    }

    fn step(&mut self, card: u8) -> Result<(), DuelError> {
        let player = self.to_move;
        let hand = &mut self.hands[player.index()];
        let pos = hand
            .iter()
            .position(|&c| c == card)
            .ok_or(DuelError::NotInHand(card))?;
        hand.remove(pos);

        match self.table.take() {
            None => {
                self.table = Some((player, card));
                self.to_move = player.other();
            }
            Some((leader, led)) => {
                let winner = if card > led { player } else { leader };
                self.points[winner.index()] += u32::from(led) + u32::from(card);
                self.to_move = winner;
            }
        }
        Ok(())
    }

    fn points(&self) -> [u32; 2] {
        self.points
    }
}

pub fn dummy_transition() -> Transition<TrickDuel> {
    Transition {
        observation: DuelView {
            hand: vec![1, 4, 6],
            table: None,
        },
        action: 4,
        reward: 0.0,
        next_observation: DuelView {
            hand: vec![1, 6],
            table: None,
        },
        next_legal: vec![1, 6],
        done: false,
    }
}

#[derive(Serialize, Deserialize)]
struct CountingState {
    epsilon: f32,
    updates: usize,
}

/// Learner that plays its first legal card and counts what happens to it.
/// It keeps the default disk round trip for `copy_parameters`.
pub struct CountingLearner {
    epsilon: f32,
    updates: usize,
    loads: usize,
    rewards: Vec<f32>,
    dones: Vec<bool>,
    greedy_calls: usize,
    explore_calls: usize,
    saves_left: Cell<Option<usize>>,
}

impl CountingLearner {
    pub fn new(epsilon: f32) -> Self {
        CountingLearner {
            epsilon,
            updates: 0,
            loads: 0,
            rewards: Vec::new(),
            dones: Vec::new(),
            greedy_calls: 0,
            explore_calls: 0,
            saves_left: Cell::new(None),
        }
    }

    /// A learner whose saves start failing after `saves` successful ones.
    pub fn failing_after(epsilon: f32, saves: usize) -> Self {
        let learner = Self::new(epsilon);
        learner.saves_left.set(Some(saves));
        learner
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn dones(&self) -> Vec<bool> {
        self.dones.clone()
    }

    pub fn greedy_calls(&self) -> usize {
        self.greedy_calls
    }

    pub fn explore_calls(&self) -> usize {
        self.explore_calls
    }
}

impl Agent<TrickDuel> for CountingLearner {
    fn select_action(&mut self, _observation: &DuelView, legal: &[u8]) -> u8 {
        if self.epsilon >= 1.0 {
            self.greedy_calls += 1;
        } else {
            self.explore_calls += 1;
        }
        legal[0]
    }

    fn name(&self) -> &str {
        "Counting"
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

impl Learner<TrickDuel> for CountingLearner {
    fn epsilon(&self) -> f32 {
        self.epsilon
    }

    fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon;
    }

    fn update(&mut self, transition: &Transition<TrickDuel>) {
        self.updates += 1;
        self.rewards.push(transition.reward);
        self.dones.push(transition.done);
    }

    fn save(&self, dir: &Path) -> Result<(), AgentError> {
        if let Some(left) = self.saves_left.get() {
            if left == 0 {
                return Err(AgentError::Io {
                    operation: "write",
                    path: dir.to_path_buf(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.saves_left.set(Some(left - 1));
        }
        fs::create_dir_all(dir).map_err(|e| AgentError::Io {
            operation: "create",
            path: dir.to_path_buf(),
            source: e,
        })?;
        let json = serde_json::to_string(&CountingState {
            epsilon: self.epsilon,
            updates: self.updates,
        })?;
        let path = dir.join("counting.json");
        fs::write(&path, json).map_err(|e| AgentError::Io {
            operation: "write",
            path,
            source: e,
        })
    }

    fn load(&mut self, dir: &Path) -> Result<(), AgentError> {
        let path = dir.join("counting.json");
        let json = fs::read_to_string(&path).map_err(|e| AgentError::Io {
            operation: "read",
            path: path.clone(),
            source: e,
        })?;
        let state: CountingState =
            serde_json::from_str(&json).map_err(|e| AgentError::Decode { path, source: e })?;
        self.epsilon = state.epsilon;
        self.updates = state.updates;
        self.loads += 1;
        Ok(())
    }

    fn blank(&self) -> Self {
        CountingLearner::new(0.0)
    }
}

/// Learner whose persistence always fails.
pub struct FailingLearner;

impl Agent<TrickDuel> for FailingLearner {
    fn select_action(&mut self, _observation: &DuelView, legal: &[u8]) -> u8 {
        legal[0]
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

impl Learner<TrickDuel> for FailingLearner {
    fn epsilon(&self) -> f32 {
        0.0
    }

    fn set_epsilon(&mut self, _epsilon: f32) {}

    fn update(&mut self, _transition: &Transition<TrickDuel>) {}

    fn save(&self, dir: &Path) -> Result<(), AgentError> {
        Err(AgentError::Io {
            operation: "write",
            path: dir.to_path_buf(),
            source: std::io::Error::other("read-only filesystem"),
        })
    }

    fn load(&mut self, dir: &Path) -> Result<(), AgentError> {
        Err(AgentError::Io {
            operation: "read",
            path: dir.to_path_buf(),
            source: std::io::Error::other("read-only filesystem"),
        })
    }

    fn blank(&self) -> Self {
        FailingLearner
    }
}

/// Shared list of agent names, readable after the owner moves into a trainer.
pub type NameLog = Rc<RefCell<Vec<String>>>;

/// Evaluator with scripted agent-A win counts against the baseline.
///
/// Calls alternate pool track, baseline track, as the trainer issues them.
/// Each call asks agent A for one move so greedy mode can be observed, and
/// pool-track calls log agent B's name.
pub struct ScriptedEvaluator {
    baseline_wins: VecDeque<usize>,
    calls: usize,
    fail_on_call: Option<usize>,
    pool_opponents: NameLog,
}

impl ScriptedEvaluator {
    pub fn new(baseline_wins: &[usize]) -> Self {
        ScriptedEvaluator {
            baseline_wins: baseline_wins.iter().copied().collect(),
            calls: 0,
            fail_on_call: None,
            pool_opponents: NameLog::default(),
        }
    }

    /// Fail the `call`-th evaluation (1-based) instead of scoring it.
    pub fn failing_on_call(baseline_wins: &[usize], call: usize) -> Self {
        ScriptedEvaluator {
            fail_on_call: Some(call),
            ..Self::new(baseline_wins)
        }
    }

    /// Names of the agents played on the pool track, in call order.
    pub fn pool_opponents(&self) -> NameLog {
        Rc::clone(&self.pool_opponents)
    }
}

impl Evaluator<TrickDuel> for ScriptedEvaluator {
    fn evaluate(
        &mut self,
        _env: &mut TrickDuel,
        agent_a: &mut dyn Agent<TrickDuel>,
        agent_b: &mut dyn Agent<TrickDuel>,
        num_games: usize,
    ) -> Result<EvaluationOutcome, TrainingError> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(TrainingError::NoLegalActions {
                player: Player::One.to_string(),
            });
        }

        let view = DuelView {
            hand: vec![1],
            table: None,
        };
        agent_a.select_action(&view, &[1]);

        let pool_track = self.calls % 2 == 1;
        let a_wins = if pool_track {
            self.pool_opponents
                .borrow_mut()
                .push(agent_b.name().to_string());
            num_games / 2
        } else {
            self.baseline_wins.pop_front().unwrap_or(0)
        };

        let mut outcome = EvaluationOutcome::default();
        for game in 0..num_games {
            if game < a_wins {
                outcome.record([15, 6], Some(Player::One));
            } else {
                outcome.record([6, 15], Some(Player::Two));
            }
        }
        Ok(outcome)
    }
}

/// Turn-based runner that logs the opponent of every training game.
pub struct RecordingRunner {
    inner: TurnBasedRunner,
    opponents: NameLog,
}

impl RecordingRunner {
    pub fn seeded(seed: u64) -> Self {
        RecordingRunner {
            inner: TurnBasedRunner::seeded(seed),
            opponents: NameLog::default(),
        }
    }

    /// Training opponent names, one per epoch.
    pub fn opponents(&self) -> NameLog {
        Rc::clone(&self.opponents)
    }
}

impl EpisodeRunner<TrickDuel> for RecordingRunner {
    fn play_training_episode(
        &mut self,
        env: &mut TrickDuel,
        learner: &mut dyn Learner<TrickDuel>,
        opponent: &mut dyn Agent<TrickDuel>,
    ) -> Result<EpisodeSummary, TrainingError> {
        self.opponents.borrow_mut().push(opponent.name().to_string());
        self.inner.play_training_episode(env, learner, opponent)
    }
}
