/// Snakefall rule engine: a turn-based gravity snake puzzle.
///
/// `domain` holds the pure rules and value types, `sim` the world state,
/// the step function, level loading and replays. The terminal front-end
/// lives in the binary.

pub mod config;
pub mod domain;
pub mod sim;
