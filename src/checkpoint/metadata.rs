use serde::{Deserialize, Serialize};

/// Evaluation numbers that earned the checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub baseline_wins: usize,
    pub games: usize,
    pub win_rate: f64,
    pub mean_points: f64,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub epoch: usize,
    pub timestamp: u64,
    pub agent: String,
    pub metrics: CheckpointMetrics,
}
