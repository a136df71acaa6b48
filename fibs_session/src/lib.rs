//! Session layer of the FIBS client: the state machine that interprets
//! classified server events, the player and inviter registries, the
//! dropper set, the outbound command queue with its sync-request pump,
//! the archive trait the session persists through, and the connection
//! task gluing a socket to the wire layer.

pub mod archive;
pub mod command_queue;
pub mod config;
pub mod connection;
pub mod droppers;
pub mod error;
pub mod events;
pub mod paths;
pub mod registry;
pub mod session;
pub mod tracing_config;

pub use archive::{Archive, CountryCache};
pub use command_queue::CommandQueue;
pub use config::ClientConfig;
pub use connection::{ConnectionControl, ConnectionEvent, ConnectionTask};
pub use droppers::DropperSet;
pub use error::{ArchiveError, ConfigError, ConnectionError, SessionError};
pub use events::SessionEvent;
pub use registry::{Inviter, InviterList, Player, PlayerList, Reliability, SavedInfo};
pub use session::{Session, CLIENT_NAME, SYNC_TIMEOUT};
