//! # Self-Play Trainer
//!
//! Trains a card-game agent by self-play against a bounded pool of frozen
//! snapshots of its own past versions, evaluating it periodically against
//! that pool and a random baseline and keeping the best model on disk.
//!
//! ## Modules
//!
//! - [`game`]: The environment contract a card game implements, player seats
//! - [`ai`]: Agent and learner traits, snapshots, random baseline, tabular Q-learner
//! - [`training`]: Self-play trainer, opponent pool, episode runners, metrics
//! - [`checkpoint`]: Best-model persistence and metadata
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;

#[cfg(test)]
mod testing;
