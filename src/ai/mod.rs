mod agent;
mod q_agent;
mod random;
mod snapshot;

pub use agent::{Agent, EvalMode, EvalState, Learner, Transition};
pub use q_agent::{QAgent, QAgentConfig, TableKey};
pub use random::RandomAgent;
pub use snapshot::SnapshotAgent;
