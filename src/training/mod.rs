//! Training infrastructure: the self-play trainer, its opponent pool,
//! episode and evaluation runners, and metric collection.

pub mod episode;
pub mod metrics;
pub mod opponent_pool;
pub mod trainer;

pub use opponent_pool::OpponentPool;
pub use trainer::{Phase, SelfPlayTrainer, TrainerConfig, TrainingReport};
