use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::{Agent, Learner, Transition};
use crate::error::TrainingError;
use crate::game::{Environment, Player};

/// Seat the learner occupies in training episodes.
pub const LEARNER_SEAT: Player = Player::One;

/// Result of a single training episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeSummary {
    pub points: [u32; 2],
    pub winner: Option<Player>,
    /// Number of moves played by both sides.
    pub length: usize,
}

impl EpisodeSummary {
    pub fn learner_won(&self) -> bool {
        self.winner == Some(LEARNER_SEAT)
    }

    pub fn learner_points(&self) -> u32 {
        self.points[LEARNER_SEAT.index()]
    }
}

/// Aggregate of `games` evaluation games between agent A (index 0) and
/// agent B (index 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub games: usize,
    pub wins: [usize; 2],
    pub draws: usize,
    pub points: [u64; 2],
    /// Final points of every game, in play order.
    pub game_points: Vec<[u32; 2]>,
}

impl EvaluationOutcome {
    pub fn record(&mut self, points: [u32; 2], winner: Option<Player>) {
        self.games += 1;
        match winner {
            Some(p) => self.wins[p.index()] += 1,
            None => self.draws += 1,
        }
        self.points[0] += u64::from(points[0]);
        self.points[1] += u64::from(points[1]);
        self.game_points.push(points);
    }

    pub fn win_rate(&self, agent: usize) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins[agent] as f64 / self.games as f64
    }

    pub fn mean_points(&self, agent: usize) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.points[agent] as f64 / self.games as f64
    }

    /// Population standard deviation of one agent's per-game points.
    pub fn points_std(&self, agent: usize) -> f64 {
        let n = self.game_points.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.mean_points(agent);
        let var = self
            .game_points
            .iter()
            .map(|p| {
                let d = f64::from(p[agent]) - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;
        var.sqrt()
    }
}

/// Plays one training game in which the learner may update.
pub trait EpisodeRunner<E: Environment> {
    /// The opponent is only ever asked for moves, never updated.
    fn play_training_episode(
        &mut self,
        env: &mut E,
        learner: &mut dyn Learner<E>,
        opponent: &mut dyn Agent<E>,
    ) -> Result<EpisodeSummary, TrainingError>;
}

/// Plays evaluation games. Implementations must not update either agent.
pub trait Evaluator<E: Environment> {
    fn evaluate(
        &mut self,
        env: &mut E,
        agent_a: &mut dyn Agent<E>,
        agent_b: &mut dyn Agent<E>,
        num_games: usize,
    ) -> Result<EvaluationOutcome, TrainingError>;
}

/// Default runner: learner at [`LEARNER_SEAT`], random first mover, one
/// transition per learner decision rewarded with the points gained since.
pub struct TurnBasedRunner {
    rng: StdRng,
}

impl TurnBasedRunner {
    pub fn new() -> Self {
        TurnBasedRunner {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        TurnBasedRunner {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for TurnBasedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> EpisodeRunner<E> for TurnBasedRunner {
    fn play_training_episode(
        &mut self,
        env: &mut E,
        learner: &mut dyn Learner<E>,
        opponent: &mut dyn Agent<E>,
    ) -> Result<EpisodeSummary, TrainingError> {
        let first = if self.rng.random_bool(0.5) {
            LEARNER_SEAT
        } else {
            LEARNER_SEAT.other()
        };
        env.reset(first);

        let seat = LEARNER_SEAT.index();
        let mut pending: Option<(E::Observation, E::Action, u32)> = None;
        let mut length = 0;

        while !env.is_over() {
            let player = env.to_move();
            let (observation, legal) = observe_turn(env, player)?;

            if player == LEARNER_SEAT {
                let points_now = env.points()[seat];
                if let Some((prev_observation, prev_action, prev_points)) = pending.take() {
                    learner.update(&Transition {
                        observation: prev_observation,
                        action: prev_action,
                        reward: points_now as f32 - prev_points as f32,
                        next_observation: observation.clone(),
                        next_legal: legal.clone(),
                        done: false,
                    });
                }
                let action = learner.select_action(&observation, &legal);
                checked_step(env, action, &legal)?;
                pending = Some((observation, action, points_now));
            } else {
                let action = opponent.select_action(&observation, &legal);
                checked_step(env, action, &legal)?;
            }
            length += 1;
        }

        if let Some((prev_observation, prev_action, prev_points)) = pending {
            let final_points = env.points()[seat];
            learner.update(&Transition {
                observation: prev_observation,
                action: prev_action,
                reward: final_points as f32 - prev_points as f32,
                next_observation: env.observe(LEARNER_SEAT),
                next_legal: Vec::new(),
                done: true,
            });
        }

        Ok(EpisodeSummary {
            points: env.points(),
            winner: env.winner(),
            length,
        })
    }
}

/// Default evaluator: alternates the first mover by game index.
#[derive(Debug, Default, Clone, Copy)]
pub struct TurnBasedEvaluator;

impl<E: Environment> Evaluator<E> for TurnBasedEvaluator {
    fn evaluate(
        &mut self,
        env: &mut E,
        agent_a: &mut dyn Agent<E>,
        agent_b: &mut dyn Agent<E>,
        num_games: usize,
    ) -> Result<EvaluationOutcome, TrainingError> {
        let mut outcome = EvaluationOutcome::default();

        for game_idx in 0..num_games {
            env.reset(Player::alternating(game_idx));
            while !env.is_over() {
                let player = env.to_move();
                let (observation, legal) = observe_turn(env, player)?;
                let action = match player {
                    Player::One => agent_a.select_action(&observation, &legal),
                    Player::Two => agent_b.select_action(&observation, &legal),
                };
                checked_step(env, action, &legal)?;
            }
            outcome.record(env.points(), env.winner());
        }

        Ok(outcome)
    }
}

fn observe_turn<E: Environment>(
    env: &E,
    player: Player,
) -> Result<(E::Observation, Vec<E::Action>), TrainingError> {
    let legal = env.legal_actions(player);
    if legal.is_empty() {
        return Err(TrainingError::NoLegalActions {
            player: player.to_string(),
        });
    }
    Ok((env.observe(player), legal))
}

fn checked_step<E: Environment>(
    env: &mut E,
    action: E::Action,
    legal: &[E::Action],
) -> Result<(), TrainingError> {
    if !legal.contains(&action) {
        return Err(illegal(action, legal));
    }
    env.step(action)
        .map_err(|e| TrainingError::Environment(Box::new(e)))
}

fn illegal<A: Debug>(action: A, legal: &[A]) -> TrainingError {
    TrainingError::IllegalAction {
        action: format!("{action:?}"),
        legal: format!("{legal:?}"),
    }
}
