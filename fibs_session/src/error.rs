use gammon_core::MoveStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file format: {0}")]
    Format(#[from] serde_json::Error),
    #[error("invalid port number: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive encoding error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Archive(#[from] ArchiveError),
    #[error("registration failed: {0}")]
    Registration(String),
    #[error("not playing a match")]
    NotPlaying,
    #[error("cube and resignation commands are not available while watching")]
    Watching,
    #[error("outbound command queue is full")]
    QueueFull,
    #[error("a saved match with {0} exists; accept as resume instead")]
    SavedMatchConflict(String),
    #[error("no open invitation from {0}")]
    UnknownInviter(String),
    #[error("move rejected: {0}")]
    IllegalMove(MoveStatus),
}
