mod manager;
mod metadata;

pub use manager::{load_best, read_metadata, BestCheckpoint, METADATA_FILE};
pub use metadata::{CheckpointMetadata, CheckpointMetrics};
