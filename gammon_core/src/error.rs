//! Errors returned by the model crate.

use thiserror::Error;

use crate::Side;

/// A violation of the invariants a [`crate::Position`] must uphold.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PositionError {
    #[error("Point {0} holds {1} checkers")]
    PointOverflow(usize, i8),
    #[error("{0} has {1} checkers on the board instead of 15")]
    ConservationViolated(Side, i16),
    #[error("Cube value {0} is not a power of two")]
    BadCube(u32),
    #[error("Both may-double flags set but cube is not centred")]
    BadCubeOwnership,
    #[error("Die value {0} out of range")]
    BadDie(i8),
    #[error("Resignation value {0} out of range")]
    BadResignation(i8),
}

/// Errors arising while appending to a match log.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MatchError {
    #[error("Action for {0} but {1:?} is on roll")]
    WrongTurn(Side, Option<Side>),
    #[error("Move does not validate against the current position")]
    IllegalMove,
    #[error("Game already has a terminal action")]
    GameOver,
    #[error("Match is already decided")]
    MatchOver,
}
