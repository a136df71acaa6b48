use serde::{Deserialize, Serialize};

/// One of the two sides of a backgammon match.
///
/// White moves in the positive direction (towards point 24 on the FIBS
/// scale), black in the negative direction. Positions that have no side on
/// roll carry `Option<Side>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Index into the `[white, black]` pairs carried by [`crate::Position`].
    pub fn index(&self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    /// Sign of the side's checkers in the points array.
    pub fn sign(&self) -> i8 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }

    /// The side owning checkers of the given signed occupancy, if any.
    pub fn of_occupancy(count: i8) -> Option<Side> {
        match count.signum() {
            1 => Some(Side::White),
            -1 => Some(Side::Black),
            _ => None,
        }
    }
}
