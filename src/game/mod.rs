//! The game contract. Concrete card games live outside this crate and plug
//! in through [`Environment`].

mod environment;
mod player;

pub use environment::Environment;
pub use player::Player;
