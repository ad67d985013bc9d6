use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TrainingError;
use crate::training::episode::{EpisodeSummary, EvaluationOutcome};

const HISTORY_FILE: &str = "history.json";

/// One evaluation block's result on one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub epoch: usize,
    pub games: usize,
    /// Learner first, opponent second.
    pub wins: [usize; 2],
    pub draws: usize,
    pub points: [u64; 2],
    /// Standard deviation of the learner's per-game points.
    pub dispersion: f64,
}

impl EvaluationRecord {
    pub fn from_outcome(epoch: usize, outcome: &EvaluationOutcome) -> Self {
        EvaluationRecord {
            epoch,
            games: outcome.games,
            wins: outcome.wins,
            draws: outcome.draws,
            points: outcome.points,
            dispersion: outcome.points_std(0),
        }
    }
}

/// Append-only evaluation series for one training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricHistory {
    vs_pool: Vec<EvaluationRecord>,
    vs_baseline: Vec<EvaluationRecord>,
}

impl MetricHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_vs_pool(&mut self, epoch: usize, outcome: &EvaluationOutcome) {
        self.vs_pool.push(EvaluationRecord::from_outcome(epoch, outcome));
    }

    pub fn record_vs_baseline(&mut self, epoch: usize, outcome: &EvaluationOutcome) {
        self.vs_baseline
            .push(EvaluationRecord::from_outcome(epoch, outcome));
    }

    /// Evaluations against the sampled historical opponent.
    pub fn vs_pool(&self) -> &[EvaluationRecord] {
        &self.vs_pool
    }

    /// Evaluations against the random baseline.
    pub fn vs_baseline(&self) -> &[EvaluationRecord] {
        &self.vs_baseline
    }

    /// Number of evaluation blocks recorded.
    pub fn len(&self) -> usize {
        self.vs_baseline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vs_baseline.is_empty() && self.vs_pool.is_empty()
    }

    /// Write both series to `<dir>/history.json` for external plotting.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf, TrainingError> {
        fs::create_dir_all(dir).map_err(|e| TrainingError::MetricsIo {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = dir.join(HISTORY_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| TrainingError::MetricsIo {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    pub fn read_json(dir: &Path) -> Result<Self, TrainingError> {
        let path = dir.join(HISTORY_FILE);
        let json =
            fs::read_to_string(&path).map_err(|e| TrainingError::MetricsIo { path, source: e })?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeSummary>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeSummary) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    fn window(&self, last_n: usize) -> impl Iterator<Item = &EpisodeSummary> {
        self.episode_results.iter().rev().take(last_n)
    }

    fn window_len(&self, last_n: usize) -> usize {
        self.episode_results.len().min(last_n)
    }

    /// Learner win rate in the last N episodes.
    pub fn win_rate(&self, last_n: usize) -> f32 {
        let n = self.window_len(last_n);
        if n == 0 {
            return 0.0;
        }
        let wins = self.window(n).filter(|r| r.learner_won()).count();
        wins as f32 / n as f32
    }

    /// Learner's average points in the last N episodes.
    pub fn average_points(&self, last_n: usize) -> f32 {
        let n = self.window_len(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: u64 = self.window(n).map(|r| u64::from(r.learner_points())).sum();
        total as f32 / n as f32
    }

    /// Average game length over the last N episodes.
    pub fn average_game_length(&self, last_n: usize) -> f32 {
        let n = self.window_len(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.window(n).map(|r| r.length).sum();
        total as f32 / n as f32
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
