use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::{WHITE_BAR, WHITE_OFF};

/// A single checker movement on the canonical FIBS scale.
///
/// `0` is white's bearoff tray and black's bar entry; `25` is white's bar
/// entry and black's bearoff tray. The textual `bar`/`off` sentinels are
/// canonicalized to these endpoints before a `Movement` is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub from: u8,
    pub to: u8,
}

impl Movement {
    pub fn new(from: u8, to: u8) -> Self {
        Self { from, to }
    }

    /// Pip distance consumed by this movement for a checker of the given
    /// direction sign (+1 white, -1 black). Bearing off with a die larger
    /// than the exact distance still consumes that whole die; the caller
    /// accounts for the waste separately.
    pub fn distance(&self) -> u8 {
        self.from.abs_diff(self.to)
    }

    pub fn is_from_bar(&self) -> bool {
        self.from == WHITE_BAR || self.from == WHITE_OFF
    }

    pub fn is_bear_off(&self) -> bool {
        self.to == WHITE_OFF || self.to == WHITE_BAR
    }
}

/// Validation verdict for a proposed move, set by
/// [`crate::Position::check_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum MoveStatus {
    /// The move is legal and may be applied.
    Legal,
    /// Generic rejection: positions don't match, or a die is consumed that
    /// was never rolled.
    Illegal,
    /// More movements than the dice permit.
    TooManyMoves,
    /// A movement lands on a point held by two or more opposing checkers.
    Blocked,
    /// Both dice are playable in some order but only one was played.
    UseAll,
    /// Only one die can be played and it must be the higher one.
    UseHigher,
    /// Playing the dice in the other order would allow both to be used.
    TrySwap,
    /// Bearing off before all fifteen checkers reached the home board.
    PrematureBearOff,
    /// A larger die was wasted on a bear-off while a higher point was
    /// still occupied.
    IllegalWaste,
    /// Checkers on the bar must enter first; the attempted movements
    /// start elsewhere.
    Dancing,
}

/// An ordered sequence of one to four movements plus its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub movements: ArrayVec<Movement, 4>,
    pub status: MoveStatus,
}

impl Move {
    pub fn new(movements: impl IntoIterator<Item = Movement>, status: MoveStatus) -> Self {
        Self {
            movements: movements.into_iter().collect(),
            status,
        }
    }

    pub fn legal(movements: impl IntoIterator<Item = Movement>) -> Self {
        Self::new(movements, MoveStatus::Legal)
    }

    pub fn is_legal(&self) -> bool {
        self.status == MoveStatus::Legal
    }
}
