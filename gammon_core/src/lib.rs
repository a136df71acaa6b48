//! Backgammon value model for a FIBS client.
//!
//! This crate holds the pure state types: the [`Position`] value with its
//! movement semantics, the [`Move`]/[`Movement`] sum types, the ordered
//! [`Match`] action log, and the [`MatchTracker`] that reconciles
//! server-reported positions with the local log. No I/O happens here.

mod side;
pub use side::*;

mod movement;
pub use movement::*;

mod position;
pub use position::*;

mod match_log;
pub use match_log::*;

mod tracker;
pub use tracker::*;

mod error;
pub use error::*;

/// Number of points on the board.
pub const NUM_POINTS: usize = 24;

/// Checkers per side.
pub const CHECKERS_PER_SIDE: u8 = 15;

/// White's bar entry point / black's bearoff tray on the FIBS scale.
pub const WHITE_BAR: u8 = 25;

/// White's bearoff tray / black's bar entry point on the FIBS scale.
pub const WHITE_OFF: u8 = 0;
