/// Events and outcomes emitted by the step function.
/// The presentation layer consumes events for animation/sound; the outcome
/// is the one-word answer to "what did this input do".

use thiserror::Error;

use crate::domain::entity::{Cell, InvalidDirection};
use crate::domain::rules::{BlockReason, DeathCause};
use super::world::Phase;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    Blocked { head: Cell, target: Cell, reason: BlockReason },
    RockPushed { id: usize, from: Cell, to: Cell },
    /// `segments` is the body after the move, head first.
    Moved { from: Cell, to: Cell, segments: Vec<Cell> },
    PickupEaten { cell: Cell, remaining: usize },
    Grew { length: usize },
    /// One gravity drop of the whole body; `segments` is the body after it.
    Fell { segments: Vec<Cell> },
    RockFell { id: usize, from: Cell, to: Cell },
    Died { cause: DeathCause, segments: Vec<Cell> },
    GoalEntered { goal: Cell },
    /// Remaining body walked one cell toward the goal.
    AbsorbShift { segments: Vec<Cell> },
    SegmentAbsorbed { cell: Cell, remaining: usize },
    Won,
}

/// What one accepted step command did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Blocked(BlockReason),
    Moved { grew: bool },
    Died(DeathCause),
    GoalEntered,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub outcome: StepOutcome,
    pub events: Vec<GameEvent>,
}

/// Result of a single gravity tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cascade {
    Settled,
    Fell,
    /// A drop ended the level (death or goal).
    Interrupted,
}

/// A command the engine refused. State is untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("step rejected: simulation is {0:?}, not Running")]
    NotRunning(Phase),
    #[error("absorption tick rejected: simulation is {0:?}, not Finishing")]
    NotFinishing(Phase),
    #[error("({dx}, {dy}) is not an orthogonal unit step")]
    InvalidDirection { dx: i32, dy: i32 },
}

impl From<InvalidDirection> for CommandError {
    fn from(e: InvalidDirection) -> Self {
        CommandError::InvalidDirection { dx: e.dx, dy: e.dy }
    }
}
