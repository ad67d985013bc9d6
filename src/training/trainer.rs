use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::{Agent, EvalMode, Learner, RandomAgent, SnapshotAgent};
use crate::checkpoint::BestCheckpoint;
use crate::error::{ConfigError, TrainingError};
use crate::game::Environment;
use crate::training::episode::{EpisodeRunner, Evaluator, TurnBasedEvaluator, TurnBasedRunner};
use crate::training::metrics::{MetricHistory, TrainingMetrics};
use crate::training::opponent_pool::OpponentPool;

/// Trainer configuration. Fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_epochs: usize,
    pub evaluate_every: usize,
    /// Games per evaluation track.
    pub num_evaluations: usize,
    pub max_old_agents: usize,
    pub model_dir: PathBuf,
    pub evaluation_dir: PathBuf,
    /// Write `history.json` into `evaluation_dir` after every evaluation.
    pub write_history: bool,
    /// Epochs between progress lines; 0 disables them.
    pub log_interval: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_epochs: 100_000,
            evaluate_every: 1000,
            num_evaluations: 500,
            max_old_agents: 50,
            model_dir: PathBuf::from("saved_model"),
            evaluation_dir: PathBuf::from("evaluation_dir"),
            write_history: true,
            log_interval: 100,
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evaluate_every == 0 {
            return Err(ConfigError::Validation(
                "evaluate_every must be >= 1".into(),
            ));
        }
        if self.num_evaluations == 0 {
            return Err(ConfigError::Validation(
                "num_evaluations must be >= 1".into(),
            ));
        }
        if self.max_old_agents == 0 {
            return Err(ConfigError::Validation(
                "max_old_agents must be >= 1".into(),
            ));
        }
        if self.model_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("model_dir must not be empty".into()));
        }
        Ok(())
    }
}

/// Where the trainer is in its epoch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Evaluating,
    Done,
}

/// Summary returned by [`SelfPlayTrainer::train`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingReport {
    pub epochs: usize,
    pub evaluations: usize,
    /// `None` when no evaluation ever ran, so nothing was persisted.
    pub best_baseline_wins: Option<usize>,
    pub checkpoints_written: usize,
    pub num_evaluations: usize,
}

impl TrainingReport {
    pub fn has_checkpoint(&self) -> bool {
        self.best_baseline_wins.is_some()
    }

    /// Best baseline wins as a fraction of the games per evaluation.
    pub fn best_win_ratio(&self) -> Option<f64> {
        self.best_baseline_wins
            .map(|wins| wins as f64 / self.num_evaluations as f64)
    }
}

/// Trains a learner against frozen copies of its past selves.
///
/// Each epoch samples one opponent from the pool and plays one training
/// game. Every `evaluate_every` epochs the learner is evaluated greedily
/// against that opponent and a fresh random baseline, checkpointed if its
/// baseline wins strictly improve, and frozen into the pool.
pub struct SelfPlayTrainer<E: Environment, L: Learner<E>> {
    config: TrainerConfig,
    env: E,
    learner: L,
    pool: OpponentPool<SnapshotAgent<E, L>>,
    rng: StdRng,
    runner: Box<dyn EpisodeRunner<E>>,
    evaluator: Box<dyn Evaluator<E>>,
    history: MetricHistory,
    metrics: TrainingMetrics,
    checkpoint: BestCheckpoint,
    epoch: usize,
    evaluations: usize,
    phase: Phase,
}

impl<E: Environment, L: Learner<E>> SelfPlayTrainer<E, L> {
    /// Build a trainer and seed the pool with a snapshot of the untrained learner.
    pub fn new(config: TrainerConfig, env: E, learner: L) -> Result<Self, TrainingError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let runner = TurnBasedRunner::seeded(rng.random());

        let mut pool = OpponentPool::with_capacity(config.max_old_agents + 1);
        let initial = SnapshotAgent::freeze(&learner, 0)
            .map_err(|source| TrainingError::Snapshot { epoch: 0, source })?;
        pool.seed(initial)?;

        let checkpoint = BestCheckpoint::new(config.model_dir.clone());
        let metrics = TrainingMetrics::with_capacity(config.log_interval.max(1));

        Ok(SelfPlayTrainer {
            config,
            env,
            learner,
            pool,
            rng,
            runner: Box::new(runner),
            evaluator: Box::new(TurnBasedEvaluator),
            history: MetricHistory::new(),
            metrics,
            checkpoint,
            epoch: 0,
            evaluations: 0,
            phase: Phase::Training,
        })
    }

    pub fn with_runner(mut self, runner: impl EpisodeRunner<E> + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl Evaluator<E> + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Run epochs until `num_epochs` is reached.
    pub fn train(&mut self) -> Result<TrainingReport, TrainingError> {
        log::info!(
            "Starting self-play training for {} epochs (evaluate every {}, {} games per track, pool <= {})",
            self.config.num_epochs,
            self.config.evaluate_every,
            self.config.num_evaluations,
            self.config.max_old_agents,
        );

        while self.step()? != Phase::Done {}

        let report = self.report();
        match report.best_win_ratio() {
            Some(ratio) => log::info!(
                "Training complete after {} epochs. Best winning ratio vs random: {:.3} ({} checkpoint(s) in {})",
                report.epochs,
                ratio,
                report.checkpoints_written,
                self.checkpoint.model_dir().display(),
            ),
            None => log::warn!(
                "Training complete after {} epochs without an evaluation; no model was saved",
                report.epochs
            ),
        }
        Ok(report)
    }

    /// Run a single epoch and return the phase afterwards.
    pub fn step(&mut self) -> Result<Phase, TrainingError> {
        if self.epoch >= self.config.num_epochs {
            self.phase = Phase::Done;
        }
        if self.phase == Phase::Done {
            return Ok(Phase::Done);
        }

        self.epoch += 1;
        let epoch = self.epoch;
        let opponent_idx = self.pool.sample_index(&mut self.rng);

        let summary = self.runner.play_training_episode(
            &mut self.env,
            &mut self.learner,
            &mut self.pool[opponent_idx],
        )?;
        self.metrics.record_episode(summary);
        self.log_progress(epoch);

        if epoch % self.config.evaluate_every == 0 {
            self.phase = Phase::Evaluating;
            let result = self.evaluate(epoch, opponent_idx);
            self.phase = Phase::Training;
            result?;
        }

        if epoch >= self.config.num_epochs {
            self.phase = Phase::Done;
        }
        Ok(self.phase)
    }

    fn evaluate(&mut self, epoch: usize, opponent_idx: usize) -> Result<(), TrainingError> {
        let games = self.config.num_evaluations;
        let mut baseline = RandomAgent::seeded(self.rng.random());

        let (vs_pool, vs_baseline) = {
            let mut learner = EvalMode::<E, L>::enter(&mut self.learner);
            let mut opponent =
                EvalMode::<E, SnapshotAgent<E, L>>::enter(&mut self.pool[opponent_idx]);

            let vs_pool =
                self.evaluator
                    .evaluate(&mut self.env, &mut *learner, &mut *opponent, games)?;
            let vs_baseline =
                self.evaluator
                    .evaluate(&mut self.env, &mut *learner, &mut baseline, games)?;
            (vs_pool, vs_baseline)
        };

        // Persist with the exploration rate restored, not the greedy override.
        let improved = self
            .checkpoint
            .consider::<E, L>(&self.learner, epoch, &vs_baseline)?;

        self.history.record_vs_pool(epoch, &vs_pool);
        self.history.record_vs_baseline(epoch, &vs_baseline);
        self.evaluations += 1;

        log::info!(
            "Epoch {epoch} eval vs {} ({games} games): {}-{} (draws {}), points {}-{}",
            self.pool[opponent_idx].name(),
            vs_pool.wins[0],
            vs_pool.wins[1],
            vs_pool.draws,
            vs_pool.points[0],
            vs_pool.points[1],
        );
        log::info!(
            "Epoch {epoch} eval vs Random ({games} games): {}-{} (draws {}), mean points {:.2} +/- {:.2}",
            vs_baseline.wins[0],
            vs_baseline.wins[1],
            vs_baseline.draws,
            vs_baseline.mean_points(0),
            vs_baseline.points_std(0),
        );
        if improved {
            log::info!(
                "New best model ({} wins) saved to {}",
                vs_baseline.wins[0],
                self.checkpoint.model_dir().display()
            );
        }

        if self.config.write_history {
            self.history.write_json(&self.config.evaluation_dir)?;
        }

        let snapshot = SnapshotAgent::freeze(&self.learner, epoch)
            .map_err(|source| TrainingError::Snapshot { epoch, source })?;
        self.pool.add(snapshot);
        for evicted in self.pool.evict_if_over_capacity(self.config.max_old_agents) {
            log::debug!("Evicted {} from the opponent pool", evicted.name());
        }
        Ok(())
    }

    fn log_progress(&self, epoch: usize) {
        let window = self.config.log_interval;
        if window == 0 || epoch % window != 0 {
            return;
        }
        log::info!(
            "Epoch {}/{} | eps: {:.3} | win_rate({}): {:.1}% | avg_points: {:.2} | avg_len: {:.1} | pool: {}",
            epoch,
            self.config.num_epochs,
            self.learner.epsilon(),
            window,
            self.metrics.win_rate(window) * 100.0,
            self.metrics.average_points(window),
            self.metrics.average_game_length(window),
            self.pool.len(),
        );
    }

    pub fn report(&self) -> TrainingReport {
        TrainingReport {
            epochs: self.epoch,
            evaluations: self.evaluations,
            best_baseline_wins: self.checkpoint.best_wins(),
            checkpoints_written: self.checkpoint.writes(),
            num_evaluations: self.config.num_evaluations,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Hand the trained learner back to the caller.
    pub fn into_learner(self) -> L {
        self.learner
    }

    pub fn pool(&self) -> &OpponentPool<SnapshotAgent<E, L>> {
        &self.pool
    }

    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn best_baseline_wins(&self) -> Option<usize> {
        self.checkpoint.best_wins()
    }
}
