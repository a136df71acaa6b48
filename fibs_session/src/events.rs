use gammon_core::Position;

use crate::registry::{Inviter, Player};

/// Updates the session publishes to its subscriber (normally the UI),
/// delivered over an unbounded channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connecting,
    Connected,
    LoginPrompt,
    LoggedIn(String),
    NetworkError(String),
    Disconnected,
    /// A fresh copy of the current position; never shared mutably.
    PositionChanged(Box<Position>),
    PlayerUpdated(Box<Player>),
    PlayerRemoved(String),
    InviterUpdated(Box<Inviter>),
    InviterRemoved(String),
    SavedListChanged,
    MotdLine(String),
    Info(String),
    Error(String),
    MatchOver { winner: String, loser: String },
}
