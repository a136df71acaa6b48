//! On-disk layout for match files.
//!
//! Live matches collect under a per-server, per-login, per-day hierarchy;
//! suspended matches waiting for resumption live in a `%saved` directory
//! named by the player pair. All directories are created owner-only.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use gammon_core::Match;

const DEFAULT_PORT: u16 = 4321;

/// `<servers_dir>/<host>` for the default port, `<host>_<port>` otherwise.
pub fn server_dir(servers_dir: &Path, host: &str, port: u16) -> PathBuf {
    let name = if port == DEFAULT_PORT {
        host.to_string()
    } else {
        format!("{host}_{port}")
    };
    servers_dir.join(name)
}

fn create_private_dir(path: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}

/// Path for a match played in this session, creating the directory chain.
/// The filename starts with `+` for a limited match and `-` for an
/// unlimited one, followed by the start time in hex microseconds and the
/// opposing (black) player.
pub fn live_match_path(
    servers_dir: &Path,
    host: &str,
    port: u16,
    login: &str,
    m: &Match,
) -> io::Result<PathBuf> {
    let start = DateTime::<Utc>::from_timestamp_micros(m.start_time_us).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "match start time out of range")
    })?;
    let dir = server_dir(servers_dir, host, port)
        .join(login)
        .join(format!("{:04}", start.year()))
        .join(format!("{:02}", start.month()))
        .join(format!("{:02}", start.day()));
    create_private_dir(&dir)?;
    let sign = if m.length > 0 { '+' } else { '-' };
    Ok(dir.join(format!("{sign}{:x}-{}.gmd", m.start_time_us, m.players[1])))
}

/// Path for a suspended match pending resume.
pub fn saved_match_path(
    servers_dir: &Path,
    host: &str,
    port: u16,
    white: &str,
    black: &str,
) -> io::Result<PathBuf> {
    let dir = server_dir(servers_dir, host, port).join("%saved");
    create_private_dir(&dir)?;
    Ok(dir.join(format!("{white}%{black}.gmd")))
}
