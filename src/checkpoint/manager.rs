use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ai::Learner;
use crate::checkpoint::metadata::{CheckpointMetadata, CheckpointMetrics};
use crate::error::CheckpointError;
use crate::game::Environment;
use crate::training::episode::EvaluationOutcome;

pub const METADATA_FILE: &str = "metadata.json";

/// Keeps the single best learner seen so far, judged by baseline wins.
///
/// A checkpoint replaces the current one only when its win count is
/// strictly greater. Writes are staged in a sibling `.tmp` directory. The
/// previous checkpoint is moved aside to `.old` and deleted only once the
/// staged one has been renamed into place; if that rename fails it is
/// moved back.
#[derive(Debug)]
pub struct BestCheckpoint {
    model_dir: PathBuf,
    best_wins: Option<usize>,
    writes: usize,
}

impl BestCheckpoint {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        BestCheckpoint {
            model_dir: model_dir.into(),
            best_wins: None,
            writes: 0,
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Best baseline win count checkpointed so far; `None` before the first.
    pub fn best_wins(&self) -> Option<usize> {
        self.best_wins
    }

    /// Number of checkpoints written.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Checkpoint `learner` if `outcome` beats the best so far.
    ///
    /// Returns whether a checkpoint was written. On error the previous
    /// checkpoint and best count are left untouched.
    pub fn consider<E, L>(
        &mut self,
        learner: &L,
        epoch: usize,
        outcome: &EvaluationOutcome,
    ) -> Result<bool, CheckpointError>
    where
        E: Environment,
        L: Learner<E> + ?Sized,
    {
        let wins = outcome.wins[0];
        if self.best_wins.is_some_and(|best| wins <= best) {
            return Ok(false);
        }

        let metadata = CheckpointMetadata {
            epoch,
            timestamp: unix_timestamp(),
            agent: learner.name().to_string(),
            metrics: CheckpointMetrics {
                baseline_wins: wins,
                games: outcome.games,
                win_rate: outcome.win_rate(0),
                mean_points: outcome.mean_points(0),
            },
        };

        let staging = self.staging_dir();
        if let Err(e) = self.publish(learner, &metadata, &staging) {
            if staging.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&staging) {
                    log::warn!(
                        "failed to remove staging directory {}: {cleanup}",
                        staging.display()
                    );
                }
            }
            return Err(e);
        }

        self.best_wins = Some(wins);
        self.writes += 1;
        Ok(true)
    }

    fn publish<E, L>(
        &self,
        learner: &L,
        metadata: &CheckpointMetadata,
        staging: &Path,
    ) -> Result<(), CheckpointError>
    where
        E: Environment,
        L: Learner<E> + ?Sized,
    {
        if staging.exists() {
            fs::remove_dir_all(staging)?;
        }
        fs::create_dir_all(staging)?;

        learner.save(staging).map_err(CheckpointError::ModelSave)?;

        let meta_json = serde_json::to_string_pretty(metadata)?;
        fs::write(staging.join(METADATA_FILE), meta_json)?;

        let backup = self.sibling_dir(".old");
        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }
        let had_previous = self.model_dir.exists();
        if had_previous {
            fs::rename(&self.model_dir, &backup)?;
        }

        if let Err(e) = fs::rename(staging, &self.model_dir) {
            if had_previous {
                if let Err(restore) = fs::rename(&backup, &self.model_dir) {
                    log::warn!(
                        "failed to restore previous checkpoint from {}: {restore}",
                        backup.display()
                    );
                }
            }
            return Err(e.into());
        }

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&backup) {
                log::warn!(
                    "failed to remove replaced checkpoint {}: {e}",
                    backup.display()
                );
            }
        }
        Ok(())
    }

    fn staging_dir(&self) -> PathBuf {
        self.sibling_dir(".tmp")
    }

    fn sibling_dir(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.model_dir.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// Read the metadata of the checkpoint in `model_dir`.
pub fn read_metadata(model_dir: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    if !model_dir.is_dir() {
        return Err(CheckpointError::NotFound(model_dir.to_path_buf()));
    }
    let meta_path = model_dir.join(METADATA_FILE);
    let meta_json = fs::read_to_string(&meta_path).map_err(|e| CheckpointError::MetadataRead {
        path: meta_path.clone(),
        source: e,
    })?;
    serde_json::from_str(&meta_json).map_err(|e| CheckpointError::MetadataParse {
        path: meta_path,
        source: e,
    })
}

/// Restore `learner` from the checkpoint in `model_dir`.
pub fn load_best<E, L>(model_dir: &Path, learner: &mut L) -> Result<CheckpointMetadata, CheckpointError>
where
    E: Environment,
    L: Learner<E> + ?Sized,
{
    let metadata = read_metadata(model_dir)?;
    learner.load(model_dir).map_err(CheckpointError::ModelLoad)?;
    Ok(metadata)
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
