use std::fmt::Debug;

use super::Player;

/// A two-player, turn-based, point-scoring game.
///
/// The trainer never inspects observations or actions; it only threads them
/// between the environment and the agents. Implementations own their own
/// shuffling randomness.
pub trait Environment {
    /// What one player can see of the game when it is their turn.
    type Observation: Clone + Debug;
    /// A move, e.g. a card played from hand.
    type Action: Copy + Eq + Debug;
    /// Error returned when the game rejects a move.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start a new game (new deal) with `first` to move.
    fn reset(&mut self, first: Player);

    /// Whether the current game has finished.
    fn is_over(&self) -> bool;

    /// Player whose turn it is.
    fn to_move(&self) -> Player;

    /// Observation of the current game from `player`'s seat.
    fn observe(&self, player: Player) -> Self::Observation;

    /// Moves available to `player`. Empty once the game is over.
    fn legal_actions(&self, player: Player) -> Vec<Self::Action>;

    /// Apply the move of the player to act.
    fn step(&mut self, action: Self::Action) -> Result<(), Self::Error>;

    /// Points collected so far, indexed by [`Player::index`].
    fn points(&self) -> [u32; 2];

    /// Winner of a finished game; `None` is a draw.
    fn winner(&self) -> Option<Player> {
        let [one, two] = self.points();
        match one.cmp(&two) {
            std::cmp::Ordering::Greater => Some(Player::One),
            std::cmp::Ordering::Less => Some(Player::Two),
            std::cmp::Ordering::Equal => None,
        }
    }
}
