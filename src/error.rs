use std::path::PathBuf;

/// Errors raised while saving, loading or copying an agent's parameters.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode agent state from {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("no checkpoint found in {0}")]
    NotFound(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to save model: {0}")]
    ModelSave(#[source] AgentError),

    #[error("failed to load model: {0}")]
    ModelLoad(#[source] AgentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the opponent pool.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("opponent pool already seeded with {0} member(s)")]
    AlreadySeeded(usize),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("agent selected illegal action {action} (legal: {legal})")]
    IllegalAction { action: String, legal: String },

    #[error("no legal actions for {player} in a game that is not over")]
    NoLegalActions { player: String },

    #[error("environment error: {0}")]
    Environment(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to freeze snapshot at epoch {epoch}: {source}")]
    Snapshot { epoch: usize, source: AgentError },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("failed to access metric history at {path}: {source}")]
    MetricsIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid trainer configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
